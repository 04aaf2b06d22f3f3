//! Server-Sent Events framing
//!
//! Turns the raw `text/event-stream` bytes produced by the Trainy backend
//! into discrete `(event, data)` frames, independent of how the transport
//! happens to chunk them.

mod decoder;
mod error;

#[cfg(test)]
mod proptests;

pub use decoder::{Frame, FrameDecoder};
pub use error::DecodeError;
