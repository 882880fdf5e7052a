//! Bus receive task
//!
//! Feeds raw UART bytes through the wire decoder and posts completed
//! records into the single-slot receive mailbox. An unconsumed record is
//! overwritten by the next one; the protocol's timeout behaviour absorbs
//! the loss.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use rondo_protocol::{Decoder, Opcode};

use crate::channels::PACKET_RX;

/// Buffer size for UART reads.
const RX_BUF_SIZE: usize = 32;

/// Serial RX task - decodes bus frames and fills the packet mailbox.
#[embassy_executor::task]
pub async fn serial_rx_task(mut rx: BufferedUartRx) {
    info!("Serial RX task started");

    let mut decoder = Decoder::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                for &byte in &buf[..n] {
                    if let Some(packet) = decoder.feed(byte) {
                        if packet.opcode == Opcode::Panic {
                            warn!("checksum mismatch on frame {}", decoder.last_counter());
                        } else {
                            trace!("RX packet: {:?}", packet);
                        }
                        PACKET_RX.signal(packet);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
