//! Bus transmit task
//!
//! Drains the outbound queue one frame at a time, so a send is never
//! re-entered while a prior frame is still being clocked out. No delivery
//! acknowledgement exists; recovery from loss lives in the coordination
//! layer.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use rondo_protocol::{Encoder, FRAME_LEN};

use crate::channels::PACKET_TX;

/// Serial TX task - encodes and sends queued records.
#[embassy_executor::task]
pub async fn serial_tx_task(mut tx: BufferedUartTx) {
    info!("Serial TX task started");

    let mut encoder = Encoder::new();
    let mut frame = [0u8; FRAME_LEN];

    loop {
        let packet = PACKET_TX.receive().await;
        match encoder.encode(&packet, &mut frame) {
            Ok(()) => {
                if let Err(e) = tx.write_all(&frame).await {
                    warn!("UART write error: {:?}", e);
                    continue;
                }
                let _ = tx.flush().await;
            }
            Err(_) => {
                // Only the receive-side sentinel is refused; nothing in the
                // clock task ever queues one.
                warn!("refused to transmit sentinel opcode");
            }
        }
    }
}
