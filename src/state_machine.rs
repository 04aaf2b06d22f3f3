//! Turn state machine
//!
//! Folds the routed events of one request/response turn into the visible
//! session state. Everything here is synchronous and free of I/O; the
//! runtime decides when events are fed in.

mod policy;
pub mod state;
pub mod turn;

#[cfg(test)]
mod proptests;

pub use policy::{EndOfStream, ReplySource};
pub use state::{SessionPhase, SessionState};
pub use turn::{TurnAccumulator, TurnStatus};
