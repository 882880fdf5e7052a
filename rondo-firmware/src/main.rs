//! Rondo - Multi-player game clock firmware
//!
//! One RP2040 unit per player on a shared half-duplex serial bus. Units
//! discover each other at power-on, then pass the active turn around the
//! ring; each unit counts its own remaining time down.
//!
//! Named after the musical rondo form: a recurring theme that keeps
//! coming back around - like each player's turn.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::watchdog::Watchdog;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::tasks::{DisplayPins, Switches};

mod channels;
mod tasks;

/// Bus speed. Slow on purpose: long unshielded daisy chains between units.
const BUS_BAUD: u32 = 9600;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Rondo firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Bus UART: TX feeds the next unit, RX hears the previous one.
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = BUS_BAUD;

    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 64]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("Bus UART initialized at {} baud", BUS_BAUD);

    // Front panel: S1/S2 adjust, S3 passes the turn. Active low.
    let switches = Switches::new([
        Input::new(p.PIN_2, Pull::Up),
        Input::new(p.PIN_3, Pull::Up),
        Input::new(p.PIN_4, Pull::Up),
    ]);

    let buzzer = Output::new(p.PIN_5, Level::Low);

    // 4-digit 7-segment display: 8 segment lines, 4 digit selects.
    let display_pins = DisplayPins {
        segments: [
            Output::new(p.PIN_6, Level::Low),
            Output::new(p.PIN_7, Level::Low),
            Output::new(p.PIN_8, Level::Low),
            Output::new(p.PIN_9, Level::Low),
            Output::new(p.PIN_10, Level::Low),
            Output::new(p.PIN_11, Level::Low),
            Output::new(p.PIN_12, Level::Low),
            Output::new(p.PIN_13, Level::Low),
        ],
        digits: [
            Output::new(p.PIN_14, Level::High),
            Output::new(p.PIN_15, Level::High),
            Output::new(p.PIN_16, Level::High),
            Output::new(p.PIN_17, Level::High),
        ],
    };

    // Spawn tasks
    spawner.spawn(tasks::tick_task()).unwrap();
    spawner.spawn(tasks::serial_rx_task(rx)).unwrap();
    spawner.spawn(tasks::serial_tx_task(tx)).unwrap();
    spawner.spawn(tasks::display_task(display_pins)).unwrap();
    spawner.spawn(tasks::buzzer_task(buzzer)).unwrap();
    spawner.spawn(tasks::clock_task(switches)).unwrap();

    info!("All tasks spawned, firmware running");

    // The only terminal recovery from a wedged unit is the hardware reset:
    // feed the watchdog from the lowest-priority spot so any lockup above
    // starves it.
    let mut watchdog = Watchdog::new(p.WATCHDOG);
    watchdog.start(Duration::from_millis(800));
    loop {
        Timer::after_millis(100).await;
        watchdog.feed();
    }
}
