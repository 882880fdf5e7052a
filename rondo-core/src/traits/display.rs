//! Display sink trait

use crate::display::Glyph;

/// Where rendered frames go. The core writes, never reads back.
///
/// Implementations map glyphs to whatever the hardware needs (7-segment
/// patterns in the reference board's case) and own multiplexing and
/// brightness entirely.
pub trait DisplaySink {
    /// Set the glyph at position 0-3 (left to right).
    fn set_digit(&mut self, pos: usize, glyph: Glyph);

    /// Set the decimal point at position 0-3.
    fn set_dot(&mut self, pos: usize, on: bool);
}
