//! Cooperative clock driver
//!
//! Owns the coordinator and every per-pass chore around it: switch
//! debouncing, the suppressing button-event slot, the inbound packet
//! mailbox, and fanning the coordinator's outputs out to the display and
//! beep sinks. One [`ClockDriver::poll`] is one scheduler pass.

use rondo_protocol::Packet;

use crate::display::{Frame, WIDTH};
use crate::input::{Debouncer, EventSlot, NUM_SWITCHES};
use crate::mailbox::Mailbox;
use crate::session::Session;
use crate::state::{Coordinator, State};
use crate::time::Ticks;
use crate::traits::{BeepSink, DisplaySink};

/// Driver for one game clock unit.
#[derive(Debug, Default)]
pub struct ClockDriver {
    coordinator: Coordinator,
    debouncer: Debouncer,
    events: EventSlot,
    rx: Mailbox<Packet>,
    frame: Frame,
}

impl ClockDriver {
    pub fn new() -> Self {
        Self {
            coordinator: Coordinator::new(),
            debouncer: Debouncer::new(),
            events: EventSlot::new(),
            rx: Mailbox::new(),
            frame: Frame::blank(),
        }
    }

    /// Deliver a received packet, overwriting any unconsumed one.
    pub fn deliver(&mut self, packet: Packet) {
        self.rx.post(packet);
    }

    pub fn state(&self) -> State {
        self.coordinator.state()
    }

    pub fn session(&self) -> &Session {
        self.coordinator.session()
    }

    /// Frame currently on the display.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Run one 10 ms scheduler pass.
    ///
    /// Switches are always scanned so debouncing keeps its cadence, but
    /// while the coordinator's bus-silence deadline runs the pending event
    /// and packet are left for a later pass.
    pub fn poll<D, B>(
        &mut self,
        now: Ticks,
        switches: [bool; NUM_SWITCHES],
        display: &mut D,
        beeper: &mut B,
    ) -> Option<Packet>
    where
        D: DisplaySink,
        B: BeepSink,
    {
        if let Some(event) = self.debouncer.scan(switches) {
            self.events.post(event);
        }

        if self.coordinator.is_held(now) {
            return None;
        }

        let out = self
            .coordinator
            .step(now, self.events.take(), self.rx.take());

        if let Some(ticks) = out.beep {
            if self.coordinator.session().options.buzzer {
                beeper.beep_for(ticks);
            }
        }

        if let Some(frame) = out.display {
            if frame != self.frame {
                for pos in 0..WIDTH {
                    display.set_digit(pos, frame.glyphs[pos]);
                    display.set_dot(pos, frame.dots[pos]);
                }
                self.frame = frame;
            }
        }

        out.tx
    }
}
