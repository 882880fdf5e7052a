//! Button events and switch debouncing
//!
//! Three momentary switches feed the state machine: S1/S2 adjust settings,
//! S3 drives the turn protocol. Raw levels are sampled once per 10 ms tick
//! into a sliding 8-bit window per switch, so a switch must read pressed
//! for 8 consecutive scans before it counts as down. A short press is
//! reported on release; holding past [`LONG_PRESS_SCANS`] scans reports a
//! long press instead (and suppresses the release event).

/// Number of physical switches.
pub const NUM_SWITCHES: usize = 3;

/// Scans (at 10 ms) a switch must stay down to count as a long press.
pub const LONG_PRESS_SCANS: u8 = 80;

/// A debounced button event.
///
/// At most one unread event exists at a time (see [`EventSlot`]); a rapid
/// double-press loses its second event, which the UI accepts in exchange
/// for not queueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    S1Short,
    S1Long,
    S2Short,
    S2Long,
    /// S1 and S2 held long together.
    S1S2Long,
    S3Short,
    S3Long,
}

/// Single-slot button event register: a new event is suppressed while one
/// is unread.
#[derive(Debug, Default)]
pub struct EventSlot(Option<ButtonEvent>);

impl EventSlot {
    pub const fn new() -> Self {
        EventSlot(None)
    }

    /// Store an event unless one is already pending.
    pub fn post(&mut self, event: ButtonEvent) {
        if self.0.is_none() {
            self.0 = Some(event);
        }
    }

    /// Consume the pending event.
    pub fn take(&mut self) -> Option<ButtonEvent> {
        self.0.take()
    }
}

const SHORT_EVENTS: [ButtonEvent; NUM_SWITCHES] = [
    ButtonEvent::S1Short,
    ButtonEvent::S2Short,
    ButtonEvent::S3Short,
];
const LONG_EVENTS: [ButtonEvent; NUM_SWITCHES] = [
    ButtonEvent::S1Long,
    ButtonEvent::S2Long,
    ButtonEvent::S3Long,
];

/// Per-switch debounce state, applied uniformly across the switch array.
#[derive(Debug)]
pub struct Debouncer {
    /// Sliding window of raw samples, one bit per scan (0 = down).
    window: [u8; NUM_SWITCHES],
    /// Scans the switch has been held down, up to the long-press threshold.
    held: [u8; NUM_SWITCHES],
    pressed: [bool; NUM_SWITCHES],
    long: [bool; NUM_SWITCHES],
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            window: [0xFF; NUM_SWITCHES],
            held: [0; NUM_SWITCHES],
            pressed: [false; NUM_SWITCHES],
            long: [false; NUM_SWITCHES],
        }
    }

    /// Feed one 10 ms scan of raw switch levels (`true` = pressed).
    ///
    /// Returns the event this scan produced, if any. S1 and S2 reaching a
    /// long press while the other is already down fuse into
    /// [`ButtonEvent::S1S2Long`].
    pub fn scan(&mut self, raw: [bool; NUM_SWITCHES]) -> Option<ButtonEvent> {
        let mut event = None;

        for s in 0..NUM_SWITCHES {
            self.window[s] = (self.window[s] << 1) | u8::from(!raw[s]);

            if self.window[s] == 0 {
                // Down for at least 8 scans.
                self.pressed[s] = true;
                if !self.long[s] {
                    self.held[s] += 1;
                }
            } else if self.pressed[s] {
                // Released (or bounced out of the window).
                if !self.long[s] {
                    event = Some(SHORT_EVENTS[s]);
                }
                self.pressed[s] = false;
                self.long[s] = false;
                self.held[s] = 0;
            }

            if self.held[s] > LONG_PRESS_SCANS {
                self.long[s] = true;
                self.held[s] = 0;
                event = Some(LONG_EVENTS[s]);
            }
        }

        // S1+S2 held together: whichever crosses the threshold first drags
        // the other along.
        match event {
            Some(ButtonEvent::S1Long) if self.pressed[1] => {
                self.long[1] = true;
                self.held[1] = 0;
                event = Some(ButtonEvent::S1S2Long);
            }
            Some(ButtonEvent::S2Long) if self.pressed[0] => {
                self.long[0] = true;
                self.held[0] = 0;
                event = Some(ButtonEvent::S1S2Long);
            }
            _ => {}
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: [bool; NUM_SWITCHES] = [false; NUM_SWITCHES];

    fn down(s: usize) -> [bool; NUM_SWITCHES] {
        let mut raw = UP;
        raw[s] = true;
        raw
    }

    fn scan_n(d: &mut Debouncer, raw: [bool; NUM_SWITCHES], n: usize) -> Option<ButtonEvent> {
        let mut last = None;
        for _ in 0..n {
            if let Some(ev) = d.scan(raw) {
                last = Some(ev);
            }
        }
        last
    }

    #[test]
    fn test_short_press_on_release() {
        let mut d = Debouncer::new();
        assert_eq!(scan_n(&mut d, down(2), 12), None);
        assert_eq!(d.scan(UP), Some(ButtonEvent::S3Short));
    }

    #[test]
    fn test_bounce_is_ignored() {
        let mut d = Debouncer::new();
        // Never 8 consecutive down scans.
        for _ in 0..20 {
            assert_eq!(d.scan(down(0)), None);
            assert_eq!(d.scan(UP), None);
        }
    }

    #[test]
    fn test_long_press_fires_while_held() {
        let mut d = Debouncer::new();
        let ev = scan_n(&mut d, down(2), 8 + LONG_PRESS_SCANS as usize + 1);
        assert_eq!(ev, Some(ButtonEvent::S3Long));
        // Release produces no trailing short event.
        assert_eq!(d.scan(UP), None);
    }

    #[test]
    fn test_combo_long_press() {
        let mut d = Debouncer::new();
        let both = [true, true, false];
        let ev = scan_n(&mut d, both, 8 + LONG_PRESS_SCANS as usize + 1);
        assert_eq!(ev, Some(ButtonEvent::S1S2Long));
        // Neither switch emits a short on release afterwards.
        assert_eq!(d.scan(UP), None);
    }

    #[test]
    fn test_event_slot_suppresses_until_taken() {
        let mut slot = EventSlot::new();
        slot.post(ButtonEvent::S1Short);
        slot.post(ButtonEvent::S2Short);
        assert_eq!(slot.take(), Some(ButtonEvent::S1Short));
        assert_eq!(slot.take(), None);
        slot.post(ButtonEvent::S2Short);
        assert_eq!(slot.take(), Some(ButtonEvent::S2Short));
    }
}
