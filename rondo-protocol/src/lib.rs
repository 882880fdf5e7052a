//! Turn-passing wire protocol for the Rondo game clock
//!
//! This crate defines the serial protocol spoken between game clock units on
//! the shared half-duplex bus. Each unit's transmit line feeds the next
//! unit's receive line, so the bus behaves as a logical ring: a record sent
//! by one unit is seen by its neighbour, which may relay it onward.
//!
//! # Record format
//!
//! All records are a fixed 9 bytes:
//!
//! ```text
//! ┌──────┬─────────┬────────┬──────────────────────┬──────────┐
//! │ SYNC │ COUNTER │ OPCODE │ DATA0..DATA4         │ CHECKSUM │
//! │ 1B   │ 1B      │ 1B     │ 5B                   │ 1B       │
//! └──────┴─────────┴────────┴──────────────────────┴──────────┘
//! ```
//!
//! `CHECKSUM` is the byte sum of SYNC, OPCODE and the data bytes. `COUNTER`
//! is a free-running per-send sequence number used only for bus diagnostics
//! and is deliberately not covered by the checksum.
//!
//! Delivery is unacknowledged and best-effort: a corrupted record is
//! surfaced to the coordination layer as the [`Opcode::Panic`] sentinel
//! rather than dropped, and a silently lost record is recovered by the
//! coordination layer's timeout-and-retransmit behaviour, never here.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod packet;
pub mod wire;

pub use packet::{Opcode, Packet, NO_ACTIVE};
pub use wire::{Decoder, Encoder, WireError, DATA_LEN, FRAME_LEN, SYNC};
