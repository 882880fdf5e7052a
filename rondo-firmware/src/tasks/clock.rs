//! Main clock task
//!
//! The 10 ms scheduler pass of the cooperative core: read switches, drain
//! the packet mailbox, step the coordinator through the clock driver, fan
//! its outputs out to the display frame, the buzzer and the transmit
//! queue.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};

use rondo_core::display::Glyph;
use rondo_core::driver::ClockDriver;
use rondo_core::input::NUM_SWITCHES;
use rondo_core::traits::{BeepSink, DisplaySink, SwitchInput};

use crate::channels::{BEEP, FRAME, PACKET_RX, PACKET_TX};
use crate::tasks::tick;

/// The three front-panel switches, active low with pull-ups.
pub struct Switches {
    pins: [Input<'static>; NUM_SWITCHES],
}

impl Switches {
    pub fn new(pins: [Input<'static>; NUM_SWITCHES]) -> Self {
        Self { pins }
    }
}

impl SwitchInput for Switches {
    fn read_switches(&mut self) -> [bool; NUM_SWITCHES] {
        let mut raw = [false; NUM_SWITCHES];
        for (level, pin) in raw.iter_mut().zip(self.pins.iter()) {
            *level = pin.is_low();
        }
        raw
    }
}

/// Display sink writing into the shared scan-out frame.
struct SharedFrame;

impl DisplaySink for SharedFrame {
    fn set_digit(&mut self, pos: usize, glyph: Glyph) {
        FRAME.lock(|frame| frame.borrow_mut().glyphs[pos] = glyph);
    }

    fn set_dot(&mut self, pos: usize, on: bool) {
        FRAME.lock(|frame| frame.borrow_mut().dots[pos] = on);
    }
}

/// Beep sink forwarding requests to the buzzer task.
struct SharedBeeper;

impl BeepSink for SharedBeeper {
    fn beep_for(&mut self, ticks: u8) {
        BEEP.signal(ticks);
    }
}

/// Clock task - one driver poll per 10 ms tick.
#[embassy_executor::task]
pub async fn clock_task(mut switches: Switches) {
    info!("Clock task started");

    let mut driver = ClockDriver::new();
    let mut display = SharedFrame;
    let mut beeper = SharedBeeper;
    let mut ticker = Ticker::every(Duration::from_millis(10));

    loop {
        ticker.next().await;
        let now = tick::now();

        if let Some(packet) = PACKET_RX.try_take() {
            driver.deliver(packet);
        }

        let raw = switches.read_switches();
        if let Some(outbound) = driver.poll(now, raw, &mut display, &mut beeper) {
            debug!("TX packet: {:?}", outbound);
            if PACKET_TX.try_send(outbound).is_err() {
                warn!("tx queue full, dropping frame");
            }
        }
    }
}
