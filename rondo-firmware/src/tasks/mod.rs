//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod buzzer;
pub mod clock;
pub mod display;
pub mod serial_rx;
pub mod serial_tx;
pub mod tick;

pub use buzzer::buzzer_task;
pub use clock::{clock_task, Switches};
pub use display::{display_task, DisplayPins};
pub use serial_rx::serial_rx_task;
pub use serial_tx::serial_tx_task;
pub use tick::tick_task;
