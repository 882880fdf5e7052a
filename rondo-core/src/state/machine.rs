//! Coordinator state machine
//!
//! N independently-booted, unaddressed units sit on a shared bus wired as a
//! ring: each unit's outgoing frame is the next unit's incoming frame. The
//! coordinator establishes a consistent ring size and id assignment, grants
//! turns round-robin, and recovers from any single unit missing a message.
//!
//! Nothing here blocks. Every cross-unit exchange is "send, stay in the
//! waiting state across passes, react to the packet or to a timeout". The
//! recovery paths are user-triggered long presses rather than retry timers:
//! the user is standing right next to a stalled unit.

use rondo_protocol::{Opcode, Packet, NO_ACTIVE};

use crate::display::Frame;
use crate::input::ButtonEvent;
use crate::session::{Session, MIN_TURN_SECONDS, NO_PLAYER};
use crate::time::{Deadline, Ticks, TICK_320MS, TMO_100MS, TMO_10MS, TMO_SECOND};

/// Hop budget for the discovery pass. Any value comfortably above the ring
/// size works; the remainder modulo the ring size picks who opens the game.
pub const DISCOVERY_TTL: u8 = 42;

/// Short feedback beep, one tick.
const BEEP_SHORT: u8 = TMO_10MS;
/// Longer confirmation beep when a turn is claimed.
const BEEP_CLAIM: u8 = 3 * TMO_100MS;

/// Protocol states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Reinitialize the session, then wait for a clean keyboard.
    Start,
    /// Game setup screen; no ring traffic heard yet.
    BtnInit,
    /// Initiator waiting for its own assign to circle the ring.
    MsgMaster,
    /// Dispatching a packet that arrived while unconfigured.
    MsgSlave,
    /// Game running, not our turn.
    Msg,
    /// Waiting for our own claim to circle back.
    MsgClaim,
    /// Our turn; counting down.
    Btn,
    /// Terminal diagnostic state. Physical reset only.
    Fault,
}

impl State {
    /// Numeric code shown on the fault and debug screens.
    pub fn code(self) -> u8 {
        match self {
            State::Start => 0,
            State::BtnInit => 1,
            State::MsgMaster => 2,
            State::MsgSlave => 3,
            State::Msg => 4,
            State::MsgClaim => 5,
            State::Btn => 6,
            State::Fault => 7,
        }
    }
}

/// Which setting the setup screen is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupFocus {
    #[default]
    Duration,
    Buzzer,
    Debug,
}

impl SetupFocus {
    fn next(self) -> Self {
        match self {
            SetupFocus::Duration => SetupFocus::Buzzer,
            SetupFocus::Buzzer => SetupFocus::Debug,
            SetupFocus::Debug => SetupFocus::Duration,
        }
    }
}

/// Everything one scheduler pass asks of the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Output {
    /// Record to put on the bus.
    pub tx: Option<Packet>,
    /// Beep request, in ticks.
    pub beep: Option<u8>,
    /// Render request. Always set; the driver may skip unchanged frames.
    pub display: Option<Frame>,
}

impl Output {
    fn screen(frame: Frame) -> Self {
        Output {
            tx: None,
            beep: None,
            display: Some(frame),
        }
    }
}

/// The turn-coordination state machine plus the session it owns.
///
/// [`Coordinator::step`] runs the whole state switch once. The caller (the
/// clock driver) is expected to check [`Coordinator::is_held`] first and
/// skip the pass - inputs included - while the bus-silence deadline runs.
#[derive(Debug)]
pub struct Coordinator {
    state: State,
    /// Last state before a fault, for the diagnostic screen.
    fault_origin: State,
    session: Session,
    focus: SetupFocus,
    /// Bus-silence gate armed after forwarding a discovery pass.
    hold: Deadline,
    /// One-second cadence for countdowns and elapsed display.
    second: Deadline,
    /// Seconds since the turn last left this unit.
    elapsed_display: u16,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            fault_origin: State::Start,
            session: Session::default(),
            focus: SetupFocus::Duration,
            hold: Deadline::new(),
            second: Deadline::new(),
            elapsed_display: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True while the post-forward silence deadline is still running; the
    /// driver leaves pending inputs untouched for the next pass.
    pub fn is_held(&mut self, now: Ticks) -> bool {
        !self.hold.elapsed(now)
    }

    /// Run the state switch once.
    pub fn step(
        &mut self,
        now: Ticks,
        event: Option<ButtonEvent>,
        packet: Option<Packet>,
    ) -> Output {
        // Remember where we were so the fault screen can show it.
        if self.state != State::Fault {
            self.fault_origin = self.state;
        }

        let mut out = match self.state {
            State::Start => self.on_start(event),
            State::BtnInit => self.on_btn_init(now, event, packet),
            State::MsgMaster => self.on_msg_master(now, packet),
            State::MsgSlave => match packet {
                Some(pkt) => self.dispatch_slave(now, pkt),
                None => {
                    self.state = State::BtnInit;
                    Output::screen(Frame::blank())
                }
            },
            State::Msg => self.on_msg(now, event, packet),
            State::MsgClaim => self.on_msg_claim(now, event, packet),
            State::Btn => self.on_btn(now, event, packet),
            State::Fault => self.fault_screen(),
        };

        // Debugging aid: an otherwise blank screen shows the state number.
        if self.session.options.debug {
            if let Some(frame) = out.display {
                if frame.is_blank() {
                    out.display = Some(Frame::value(self.state.code()));
                }
            }
        }

        out
    }

    fn on_start(&mut self, event: Option<ButtonEvent>) -> Output {
        self.session = Session::default();
        self.focus = SetupFocus::Duration;
        self.hold = Deadline::new();
        self.second = Deadline::new();
        self.elapsed_display = 0;
        // Swallow any press still latched across the reset.
        if event.is_none() {
            self.state = State::BtnInit;
        }
        Output::screen(Frame::blank())
    }

    fn on_btn_init(
        &mut self,
        now: Ticks,
        event: Option<ButtonEvent>,
        packet: Option<Packet>,
    ) -> Output {
        // A peer's activity always takes priority over local setup.
        if let Some(pkt) = packet {
            self.state = State::MsgSlave;
            return self.dispatch_slave(now, pkt);
        }

        match event {
            Some(ButtonEvent::S1Short) => match self.focus {
                SetupFocus::Duration => self.session.duration_up(),
                SetupFocus::Buzzer => self.session.options.buzzer = !self.session.options.buzzer,
                SetupFocus::Debug => self.session.options.debug = !self.session.options.debug,
            },
            Some(ButtonEvent::S2Short) => match self.focus {
                SetupFocus::Duration => self.session.duration_down(),
                SetupFocus::Buzzer => self.session.options.buzzer = !self.session.options.buzzer,
                SetupFocus::Debug => self.session.options.debug = !self.session.options.debug,
            },
            Some(ButtonEvent::S1S2Long) => self.focus = self.focus.next(),
            Some(ButtonEvent::S3Short) => {
                // We are the initiator: take id 0 and start numbering the ring.
                let seconds = self.session.duration_seconds();
                self.session.id = 0;
                self.session.seconds_left = seconds;
                self.session.table.seed_all(seconds);
                self.state = State::MsgMaster;
                return Output {
                    tx: Some(Packet::assign(1, NO_ACTIVE, 0, seconds)),
                    beep: Some(BEEP_SHORT),
                    display: Some(Frame::text(b"SYNC")),
                };
            }
            _ => {}
        }

        // The setup screen blinks on the 320 ms tick bit.
        let frame = if now & TICK_320MS != 0 {
            match self.focus {
                SetupFocus::Duration => {
                    Frame::minutes_seconds(u16::from(self.session.duration_min))
                }
                SetupFocus::Buzzer => Frame::option(b'B', self.session.options.buzzer),
                SetupFocus::Debug => Frame::option(b'D', self.session.options.debug),
            }
        } else {
            Frame::blank()
        };
        Output::screen(frame)
    }

    fn on_msg_master(&mut self, now: Ticks, packet: Option<Packet>) -> Output {
        let Some(pkt) = packet else {
            return Output::screen(Frame::text(b"SYNC"));
        };

        // Only our own assign may come back here.
        if pkt.opcode != Opcode::Assign {
            return self.fault();
        }

        if pkt.active() == NO_ACTIVE {
            // Untouched discovery pass returned: fresh ring. The next-id
            // field was bumped once per unit, so it now reads the ring size.
            if pkt.seconds != self.session.duration_seconds() {
                return self.fault();
            }
            self.session.players = pkt.id;
            self.session.active = NO_PLAYER;
            self.second.arm(now, TMO_SECOND);
            self.state = State::Msg;
            return Output {
                tx: Some(Packet::pass_on(
                    1,
                    self.session.players,
                    DISCOVERY_TTL,
                    pkt.seconds,
                )),
                beep: None,
                display: Some(Frame::text(b"SYNC")),
            };
        }

        // Active player already set: a game is running on this ring.
        // Rejoin as a late unit.
        self.state = State::MsgSlave;
        self.dispatch_slave(now, pkt)
    }

    /// Handle a packet that arrived while this unit is unconfigured (from
    /// BtnInit, or rejoining through MsgMaster).
    fn dispatch_slave(&mut self, now: Ticks, pkt: Packet) -> Output {
        match pkt.opcode {
            Opcode::Assign => {
                self.session.id = pkt.id;
                if pkt.players != 0 {
                    self.session.players = pkt.players;
                }
                self.session.duration_min = (pkt.seconds / 60).min(255) as u8;

                if pkt.active() == NO_ACTIVE {
                    // Initial discovery pass: adopt the game and keep the
                    // assign circulating with the next id.
                    self.session.seconds_left = pkt.seconds;
                    self.session.table.seed_all(pkt.seconds);
                    self.second.arm(now, TMO_SECOND);
                    self.elapsed_display = 0;
                    self.state = State::Msg;
                    Output {
                        tx: Some(Packet::assign(
                            pkt.id.wrapping_add(1),
                            NO_ACTIVE,
                            0,
                            pkt.seconds,
                        )),
                        beep: None,
                        display: Some(Frame::blank()),
                    }
                } else {
                    // A game is already active somewhere on the ring.
                    self.session.active = pkt.active();
                    self.session.table.record(pkt.active(), pkt.seconds);
                    if pkt.active() == self.session.id {
                        self.claim_turn(Some(pkt.seconds))
                    } else {
                        self.second.arm(now, TMO_SECOND);
                        self.elapsed_display = 0;
                        self.state = State::Msg;
                        Output::screen(Frame::blank())
                    }
                }
            }
            Opcode::PassOn => {
                // Covers rebooting mid-game: the pass tells us who we are.
                self.session.id = pkt.id;
                if pkt.players != 0 {
                    self.session.players = pkt.players;
                }
                if pkt.ttl == 0 {
                    // The turn lands right here. Our own clock is gone, so
                    // the sender's copy of our time is the best there is.
                    self.session
                        .table
                        .record_if_unknown(self.session.next_id(), pkt.seconds);
                    self.claim_turn(Some(pkt.seconds))
                } else {
                    self.forward_pass(now, pkt)
                }
            }
            Opcode::Claim => {
                // Ring not formed for us yet: note the time, echo the claim
                // onward and keep listening from setup.
                self.session.table.record(pkt.id, pkt.seconds);
                self.state = State::BtnInit;
                Output {
                    tx: Some(Packet::claim(pkt.id, pkt.players, pkt.seconds)),
                    beep: None,
                    display: Some(Frame::blank()),
                }
            }
            Opcode::Panic => {
                // Corrupt frame: same as hearing nothing.
                self.state = State::BtnInit;
                Output::screen(Frame::blank())
            }
        }
    }

    fn on_msg(
        &mut self,
        now: Ticks,
        event: Option<ButtonEvent>,
        packet: Option<Packet>,
    ) -> Output {
        if let Some(pkt) = packet {
            return self.dispatch_msg(now, pkt);
        }

        // Idle: count seconds since the turn left us and keep the active
        // player's entry ticking down in parallel with their own clock.
        if self.second.elapsed(now) {
            self.second.arm(now, TMO_SECOND);
            self.elapsed_display = self.elapsed_display.saturating_add(1);
            if self.session.active != NO_PLAYER {
                self.session.table.decrement(self.session.active);
            }
        }

        if event == Some(ButtonEvent::S3Long) {
            // Recovery: nudge the presumed next player, who may have missed
            // the pass, with its last-known time.
            let next = self.session.next_id();
            let seconds = self
                .session
                .table
                .get(next)
                .unwrap_or(self.session.duration_seconds());
            return Output {
                tx: Some(Packet::assign(next, next, self.session.players, seconds)),
                beep: Some(BEEP_SHORT),
                display: Some(Frame::minutes_seconds(self.elapsed_display)),
            };
        }

        Output::screen(Frame::minutes_seconds(self.elapsed_display))
    }

    fn dispatch_msg(&mut self, now: Ticks, pkt: Packet) -> Output {
        match pkt.opcode {
            Opcode::Claim => {
                self.session.table.record(pkt.id, pkt.seconds);
                self.second.arm(now, TMO_SECOND);
                self.elapsed_display = 0;
                if pkt.id != self.session.id {
                    self.session.active = pkt.id;
                    Output {
                        tx: Some(Packet::claim(pkt.id, pkt.players, pkt.seconds)),
                        beep: None,
                        display: Some(Frame::minutes_seconds(0)),
                    }
                } else {
                    // Our own stale claim drained off the ring; relaying it
                    // again would circulate it forever.
                    Output::screen(Frame::minutes_seconds(0))
                }
            }
            Opcode::PassOn => {
                if pkt.players != 0 {
                    self.session.players = pkt.players;
                }
                if pkt.ttl == 0 {
                    // The turn has arrived. Our own clock kept counting, so
                    // prefer it over the sender's possibly stale copy.
                    self.claim_turn(None)
                } else {
                    self.forward_pass(now, pkt)
                }
            }
            Opcode::Assign => {
                // Recovery assign: either meant for us or on its way past.
                if pkt.id == self.session.id {
                    if pkt.players != 0 {
                        self.session.players = pkt.players;
                    }
                    self.claim_turn(Some(pkt.seconds))
                } else {
                    self.session.table.record(pkt.id, pkt.seconds);
                    Output {
                        tx: Some(Packet::assign(pkt.id, pkt.active(), pkt.players, pkt.seconds)),
                        beep: None,
                        display: Some(Frame::minutes_seconds(self.elapsed_display)),
                    }
                }
            }
            Opcode::Panic => {
                // Corrupt frame: treat as silence.
                Output::screen(Frame::minutes_seconds(self.elapsed_display))
            }
        }
    }

    fn on_msg_claim(
        &mut self,
        now: Ticks,
        event: Option<ButtonEvent>,
        packet: Option<Packet>,
    ) -> Output {
        if let Some(pkt) = packet {
            match pkt.opcode {
                Opcode::Claim if pkt.id == self.session.id => {
                    // Our claim circled the ring: the turn is confirmed ours.
                    // Never start a zero-length turn.
                    self.second.arm(now, TMO_SECOND);
                    if self.session.seconds_left < MIN_TURN_SECONDS {
                        self.session.seconds_left = MIN_TURN_SECONDS;
                        self.session
                            .table
                            .record(self.session.id, MIN_TURN_SECONDS);
                    }
                    self.elapsed_display = 0;
                    self.state = State::Btn;
                    return Output::screen(Frame::minutes_seconds(self.session.seconds_left));
                }
                Opcode::Claim => {
                    // Someone else's claim still draining; note it and keep
                    // waiting for ours.
                    self.session.table.record(pkt.id, pkt.seconds);
                }
                _ => {}
            }
        }

        if event == Some(ButtonEvent::S3Long) {
            // The first claim may have been lost; say it again.
            return Output {
                tx: Some(Packet::claim(
                    self.session.id,
                    self.session.players,
                    self.session.seconds_left,
                )),
                beep: Some(BEEP_SHORT),
                display: Some(Frame::blank()),
            };
        }

        Output::screen(Frame::blank())
    }

    fn on_btn(
        &mut self,
        now: Ticks,
        event: Option<ButtonEvent>,
        packet: Option<Packet>,
    ) -> Output {
        // Claims relayed past us still update the table.
        if let Some(pkt) = packet {
            if pkt.opcode == Opcode::Claim {
                self.session.table.record(pkt.id, pkt.seconds);
            }
        }

        if event == Some(ButtonEvent::S3Short) {
            // Turn over: hand it to the next player with their own time,
            // not ours.
            let next = self.session.next_id();
            let seconds = self
                .session
                .table
                .get(next)
                .unwrap_or(self.session.duration_seconds());
            self.session.active = next;
            self.second.arm(now, TMO_SECOND);
            self.elapsed_display = 0;
            self.state = State::Msg;
            return Output {
                tx: Some(Packet::pass_on(next, self.session.players, 0, seconds)),
                beep: Some(BEEP_SHORT),
                display: Some(Frame::minutes_seconds(0)),
            };
        }

        let mut beep = None;
        if self.second.elapsed(now) {
            self.second.arm(now, TMO_SECOND);
            if self.session.seconds_left > 0 {
                self.session.seconds_left -= 1;
                self.session
                    .table
                    .record(self.session.id, self.session.seconds_left);
                if self.session.seconds_left == 0 {
                    beep = Some(BEEP_SHORT);
                }
            } else {
                // Flag every further second spent at zero.
                beep = Some(BEEP_SHORT);
            }
        }

        Output {
            tx: None,
            beep,
            display: Some(Frame::minutes_seconds(self.session.seconds_left)),
        }
    }

    /// Assert the turn: broadcast a claim and wait for it to circle back.
    fn claim_turn(&mut self, adopt_seconds: Option<u16>) -> Output {
        if let Some(seconds) = adopt_seconds {
            self.session.seconds_left = seconds;
        }
        self.session.active = self.session.id;
        self.session
            .table
            .record(self.session.id, self.session.seconds_left);
        self.state = State::MsgClaim;
        Output {
            tx: Some(Packet::claim(
                self.session.id,
                self.session.players,
                self.session.seconds_left,
            )),
            beep: Some(BEEP_CLAIM),
            display: Some(Frame::blank()),
        }
    }

    /// Relay a still-travelling pass, with the audible discovery progress
    /// beep and a stretch of bus silence before the next step.
    fn forward_pass(&mut self, now: Ticks, pkt: Packet) -> Output {
        let beep_ticks = (255 - pkt.ttl) / 10;
        self.hold.arm(now, beep_ticks + 2 * TMO_10MS);
        self.state = State::Msg;
        Output {
            tx: Some(Packet::pass_on(
                self.session.next_id(),
                self.session.players,
                pkt.ttl - 1,
                pkt.seconds,
            )),
            beep: Some(beep_ticks),
            display: Some(Frame::player_of(self.session.id, self.session.players)),
        }
    }

    fn fault(&mut self) -> Output {
        self.state = State::Fault;
        self.fault_screen()
    }

    fn fault_screen(&self) -> Output {
        Output {
            tx: None,
            beep: Some(BEEP_SHORT),
            display: Some(Frame::fault(self.fault_origin.code())),
        }
    }
}
