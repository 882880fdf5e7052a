//! Turn-coordination state machine
//!
//! All protocol behavior - ring discovery, turn hand-off, loss recovery -
//! is a function of the current state, the pending button event and the
//! pending packet, evaluated once per 10 ms scheduler pass.

mod machine;

pub use machine::{Coordinator, Output, SetupFocus, State, DISCOVERY_TTL};
