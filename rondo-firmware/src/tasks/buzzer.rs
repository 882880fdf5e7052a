//! Buzzer task
//!
//! Turns "sound for N ticks" requests into a level on the buzzer pin.
//! The enable option is applied upstream, in the clock driver; a request
//! that arrives here is meant to be heard.

use embassy_rp::gpio::Output;
use embassy_time::{Duration, Ticker};

use rondo_core::beep::Beeper;

use crate::channels::BEEP;
use crate::tasks::tick;

/// Buzzer task - follows beep deadlines at the 10 ms cadence.
#[embassy_executor::task]
pub async fn buzzer_task(mut pin: Output<'static>) {
    let mut beeper = Beeper::new();
    let mut ticker = Ticker::every(Duration::from_millis(10));

    loop {
        ticker.next().await;
        let now = tick::now();

        if let Some(ticks) = BEEP.try_take() {
            beeper.request(now, ticks);
        }

        if beeper.level(now) {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }
}
