//! Display scan-out task
//!
//! Multiplexes the shared frame onto a 4-digit common-anode 7-segment
//! display, one digit per slot with a skipped-slot duty cycle for
//! dimming: of every 9 slots only the first 4 light a digit.

use embassy_rp::gpio::Output;
use embassy_time::{Duration, Ticker};

use rondo_core::display::{Glyph, WIDTH};

use crate::channels::FRAME;

/// Segment and digit-select outputs. Segments are a..g plus the decimal
/// point on bit 7; digit selects are active low.
pub struct DisplayPins {
    pub segments: [Output<'static>; 8],
    pub digits: [Output<'static>; WIDTH],
}

/// Scan slots per cycle; slots >= WIDTH stay dark for dimming.
const SCAN_SLOTS: u8 = 9;

/// 7-segment patterns, bit 0 = segment a .. bit 6 = segment g.
fn pattern(glyph: Glyph) -> u8 {
    match glyph {
        Glyph::Blank => 0x00,
        Glyph::Dash => 0x40,
        Glyph::Digit(d) => match d {
            0 => 0x3F,
            1 => 0x06,
            2 => 0x5B,
            3 => 0x4F,
            4 => 0x66,
            5 => 0x6D,
            6 => 0x7D,
            7 => 0x07,
            8 => 0x7F,
            9 => 0x6F,
            _ => 0x00,
        },
        Glyph::Letter(ch) => match ch {
            b'B' => 0x7C,
            b'C' => 0x39,
            b'D' => 0x5E,
            b'F' => 0x71,
            b'N' => 0x54,
            b'P' => 0x73,
            b'S' => 0x6D,
            b'Y' => 0x6E,
            _ => 0x00,
        },
    }
}

/// Display task - cycles one scan slot per millisecond.
#[embassy_executor::task]
pub async fn display_task(mut pins: DisplayPins) {
    let mut ticker = Ticker::every(Duration::from_millis(1));
    let mut slot: u8 = 0;

    loop {
        ticker.next().await;

        // All digits off before switching segments, or ghosting shows.
        for digit in pins.digits.iter_mut() {
            digit.set_high();
        }

        slot = (slot + 1) % SCAN_SLOTS;
        let pos = slot as usize;
        if pos >= WIDTH {
            continue;
        }

        let (glyph, dot) = FRAME.lock(|frame| {
            let frame = frame.borrow();
            (frame.glyphs[pos], frame.dots[pos])
        });

        let mut bits = pattern(glyph);
        if dot {
            bits |= 0x80;
        }
        for (bit, segment) in pins.segments.iter_mut().enumerate() {
            if bits & (1 << bit) != 0 {
                segment.set_high();
            } else {
                segment.set_low();
            }
        }

        pins.digits[pos].set_low();
    }
}
