//! Inter-task communication
//!
//! The receive and button paths follow the single-slot mailbox discipline
//! of the core: a `Signal` overwrites on a second post and `try_take` is
//! the atomic test-and-clear the clock task relies on.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use rondo_core::display::Frame;
use rondo_protocol::Packet;

/// Outbound records waiting for the transmit task. Small: the machine
/// emits at most one record per pass.
const TX_QUEUE_SIZE: usize = 4;

/// Last fully decoded inbound record. Overwrite-on-full by design.
pub static PACKET_RX: Signal<CriticalSectionRawMutex, Packet> = Signal::new();

/// Records to clock out onto the bus, in order.
pub static PACKET_TX: Channel<CriticalSectionRawMutex, Packet, TX_QUEUE_SIZE> = Channel::new();

/// Frame the display scan-out multiplexes from.
pub static FRAME: Mutex<CriticalSectionRawMutex, RefCell<Frame>> =
    Mutex::new(RefCell::new(Frame::blank()));

/// Pending beep request, in 10 ms ticks.
pub static BEEP: Signal<CriticalSectionRawMutex, u8> = Signal::new();
