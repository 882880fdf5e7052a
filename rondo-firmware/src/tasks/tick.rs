//! The 10 ms tick counter
//!
//! One free-running 8-bit counter times everything: deadlines, debouncing,
//! display blink. Written only here, read everywhere.

use embassy_time::{Duration, Ticker};
use portable_atomic::{AtomicU8, Ordering};

use rondo_core::time::Ticks;

static TICKS: AtomicU8 = AtomicU8::new(0);

/// Current tick counter value.
pub fn now() -> Ticks {
    TICKS.load(Ordering::Relaxed)
}

/// Tick task - advances the counter every 10 ms, wrapping at 256.
#[embassy_executor::task]
pub async fn tick_task() {
    let mut ticker = Ticker::every(Duration::from_millis(10));
    loop {
        ticker.next().await;
        TICKS.fetch_add(1, Ordering::Relaxed);
    }
}
