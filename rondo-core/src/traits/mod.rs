//! Hardware abstraction traits
//!
//! These traits are the seams toward the simple local I/O the core does not
//! own: digit rendering, buzzer timing and raw switch levels. Register
//! level code stays behind them so the coordination core runs unchanged on
//! a host.

pub mod beep;
pub mod display;
pub mod switches;

pub use beep::BeepSink;
pub use display::DisplaySink;
pub use switches::SwitchInput;
