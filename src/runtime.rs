//! Runtime for assistant sessions and progress streams
//!
//! Connects the transport to the pure turn state machine and owns the
//! long-lived pieces: the session controller, the progress monitor and the
//! invalidation bus they share.

pub mod invalidation;
pub mod progress;
mod requests;
pub mod session;

#[cfg(test)]
pub mod testing;

pub use invalidation::InvalidationBus;
pub use progress::{ProgressMonitor, ProgressState};
pub use session::{SessionController, SessionError};
