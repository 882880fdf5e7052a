//! Raw switch input trait

use crate::input::NUM_SWITCHES;

/// Supplies raw, undebounced switch levels once per 10 ms scheduler pass.
pub trait SwitchInput {
    /// Current levels, `true` = pressed.
    fn read_switches(&mut self) -> [bool; NUM_SWITCHES];
}
