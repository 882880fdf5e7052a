//! Command records exchanged between game clock units
//!
//! Three opcodes travel on the wire; `Panic` exists only on the receive side
//! to report a corrupted frame to the coordination layer.

/// Sentinel for the active-player flags byte: no player holds the turn yet.
///
/// An `Assign` record circulating with this value is still on its initial
/// discovery pass around the ring.
pub const NO_ACTIVE: u8 = 0xFF;

/// Record opcodes.
///
/// The wire values are printable so a bus tap with a plain terminal stays
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Hand a unit its ring position. Circulates once at power-on to number
    /// the ring; re-sent later as a recovery aid for a unit that missed its
    /// turn notification.
    Assign = b'A',
    /// Pass the turn toward the unit `ttl` hops away; at `ttl == 0` the
    /// receiver is the addressee.
    PassOn = b'P',
    /// Assert (or relay the assertion) that a unit holds the active turn,
    /// carrying its remaining time.
    Claim = b'C',
    /// Local-only sentinel: a frame arrived but failed its checksum.
    /// Never transmitted.
    Panic = 0x00,
}

impl Opcode {
    /// Parse a wire byte; `None` for anything that is not a transmittable
    /// opcode (including the `Panic` value itself).
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(Opcode::Assign),
            b'P' => Some(Opcode::PassOn),
            b'C' => Some(Opcode::Claim),
            _ => None,
        }
    }

    /// Wire value of this opcode.
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

/// One decoded (or to-be-encoded) command record.
///
/// Field meaning varies by opcode:
///
/// | field     | `Assign`                    | `PassOn`              | `Claim`          |
/// |-----------|-----------------------------|-----------------------|------------------|
/// | `id`      | id the receiver adopts      | addressee id          | claimant id      |
/// | `players` | known ring size (0 = none)  | known ring size       | known ring size  |
/// | `ttl`     | active player / `NO_ACTIVE` | hops left to addressee| unused (0)       |
/// | `seconds` | that player's time          | addressee's time      | claimant's time  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    pub opcode: Opcode,
    pub id: u8,
    pub players: u8,
    pub ttl: u8,
    pub seconds: u16,
}

impl Packet {
    /// Build an `Assign` record.
    ///
    /// `active` is the id of the player currently holding the turn, or
    /// [`NO_ACTIVE`] while the initial discovery pass is still circulating.
    pub fn assign(id: u8, active: u8, players: u8, seconds: u16) -> Self {
        Self {
            opcode: Opcode::Assign,
            id,
            players,
            ttl: active,
            seconds,
        }
    }

    /// Build a `PassOn` record addressed `ttl` hops downstream.
    pub fn pass_on(id: u8, players: u8, ttl: u8, seconds: u16) -> Self {
        Self {
            opcode: Opcode::PassOn,
            id,
            players,
            ttl,
            seconds,
        }
    }

    /// Build a `Claim` record for the given player.
    pub fn claim(id: u8, players: u8, seconds: u16) -> Self {
        Self {
            opcode: Opcode::Claim,
            id,
            players,
            ttl: 0,
            seconds,
        }
    }

    /// The active-player flags byte of an `Assign` record.
    pub fn active(&self) -> u8 {
        self.ttl
    }

    /// Data bytes in wire order: `[id, players, ttl, time-hi, time-lo]`.
    pub fn data(&self) -> [u8; crate::wire::DATA_LEN] {
        let [hi, lo] = self.seconds.to_be_bytes();
        [self.id, self.players, self.ttl, hi, lo]
    }

    /// Rebuild a record from an opcode and wire-order data bytes.
    pub fn from_parts(opcode: Opcode, data: &[u8; crate::wire::DATA_LEN]) -> Self {
        Self {
            opcode,
            id: data[0],
            players: data[1],
            ttl: data[2],
            seconds: u16::from_be_bytes([data[3], data[4]]),
        }
    }
}
