//! Wire protocol of the Trainy assistant endpoints
//!
//! Typed payloads for the coaching and planning turn streams, the import and
//! recalculation progress streams, and the routing table that maps a decoded
//! frame onto them.

pub mod event;
pub mod progress;
pub mod types;

pub use event::{route, ProtocolVariant, StreamEvent};
pub use progress::{route_progress, ItemOutcome, ProgressEvent, ProgressKind};
pub use types::*;
