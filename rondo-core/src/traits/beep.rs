//! Beep sink trait

/// Accepts "sound for N ticks" requests. The core writes, never reads back.
pub trait BeepSink {
    /// Sound the buzzer for the given number of 10 ms ticks.
    fn beep_for(&mut self, ticks: u8);
}
