//! Per-game session state
//!
//! Everything here is volatile: it is rebuilt from defaults whenever the
//! state machine passes through its start state and mutated only by the
//! state machine. There is no non-volatile storage.

use rondo_protocol::NO_ACTIVE;

/// Fixed upper bound on ring size.
pub const MAX_PLAYERS: usize = 8;

/// Id sentinel: this unit has not been assigned a ring position yet.
/// Matches the wire-level "no active player" flags value.
pub const NO_PLAYER: u8 = NO_ACTIVE;

/// Remaining-time sentinel for players we have not heard from.
pub const TIME_UNKNOWN: u16 = u16::MAX;

/// Game duration bounds and step, in minutes.
pub const MIN_DURATION_MIN: u8 = 5;
pub const MAX_DURATION_MIN: u8 = 90;
pub const DURATION_STEP_MIN: u8 = 5;
pub const DEFAULT_DURATION_MIN: u8 = 30;

/// A confirmed turn always grants at least this much time.
pub const MIN_TURN_SECONDS: u16 = 60;

/// Last-known remaining seconds per player id.
///
/// Entries are updated opportunistically from any `Claim` passing through;
/// only the locally counting node ever decrements one, and only for the
/// active player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemainingTable {
    entries: [u16; MAX_PLAYERS],
}

impl Default for RemainingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RemainingTable {
    /// A table with every entry unknown.
    pub const fn new() -> Self {
        Self {
            entries: [TIME_UNKNOWN; MAX_PLAYERS],
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries = [TIME_UNKNOWN; MAX_PLAYERS];
    }

    /// Set every entry, e.g. at game setup when all players start equal.
    pub fn seed_all(&mut self, seconds: u16) {
        self.entries = [seconds; MAX_PLAYERS];
    }

    /// Record a player's reported remaining time. Out-of-range ids are
    /// ignored rather than wrapped.
    pub fn record(&mut self, id: u8, seconds: u16) {
        if let Some(entry) = self.entries.get_mut(id as usize) {
            *entry = seconds;
        }
    }

    /// Record only if we know nothing better yet.
    pub fn record_if_unknown(&mut self, id: u8, seconds: u16) {
        if let Some(entry) = self.entries.get_mut(id as usize) {
            if *entry == TIME_UNKNOWN {
                *entry = seconds;
            }
        }
    }

    /// A player's last-known remaining time, if we have one.
    pub fn get(&self, id: u8) -> Option<u16> {
        self.entries
            .get(id as usize)
            .copied()
            .filter(|&t| t != TIME_UNKNOWN)
    }

    /// Count one second off a player's entry, flooring at zero. Unknown
    /// entries stay unknown.
    pub fn decrement(&mut self, id: u8) {
        if let Some(entry) = self.entries.get_mut(id as usize) {
            if *entry != TIME_UNKNOWN && *entry > 0 {
                *entry -= 1;
            }
        }
    }
}

/// Runtime options, session-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GameOptions {
    /// Sound the buzzer on beeps.
    pub buzzer: bool,
    /// Show the state number on an otherwise blank display.
    pub debug: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            buzzer: true,
            debug: false,
        }
    }
}

/// The whole per-session state owned by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
    /// Our ring position, [`NO_PLAYER`] until the first assign.
    pub id: u8,
    /// Ring size, 0 until discovery completes.
    pub players: u8,
    /// Whose turn it is, [`NO_PLAYER`] while no turn exists.
    pub active: u8,
    /// Configured game duration in minutes.
    pub duration_min: u8,
    /// Our own remaining seconds.
    pub seconds_left: u16,
    pub options: GameOptions,
    pub table: RemainingTable,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: NO_PLAYER,
            players: 0,
            active: NO_PLAYER,
            duration_min: DEFAULT_DURATION_MIN,
            seconds_left: 0,
            options: GameOptions::default(),
            table: RemainingTable::new(),
        }
    }
}

impl Session {
    /// Configured duration in seconds.
    pub fn duration_seconds(&self) -> u16 {
        u16::from(self.duration_min) * 60
    }

    /// The id after ours in ring order.
    ///
    /// Guarded against the transient window where the ring size is still
    /// zero: the modulus falls back to the table capacity so the result
    /// stays a valid index.
    pub fn next_id(&self) -> u8 {
        let n = if self.players != 0 {
            self.players
        } else {
            MAX_PLAYERS as u8
        };
        self.id.wrapping_add(1) % n
    }

    /// Bump the configured duration one step up, saturating at the bound.
    pub fn duration_up(&mut self) {
        if self.duration_min < MAX_DURATION_MIN {
            self.duration_min += DURATION_STEP_MIN;
        }
    }

    /// Bump the configured duration one step down, saturating at the bound.
    pub fn duration_down(&mut self) {
        if self.duration_min > MIN_DURATION_MIN {
            self.duration_min -= DURATION_STEP_MIN;
        }
    }
}
