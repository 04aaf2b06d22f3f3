//! Per-variant turn finalization policy
//!
//! The two protocol variants run through the same accumulator; they differ
//! only in where the assistant's reply comes from and in what a stream that
//! ends without a terminal event means.

use crate::protocol::ProtocolVariant;

/// Where the assistant entry of a proposal-finalized turn gets its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// The last `text` event plus the tool calls/results seen in the turn
    Accumulated,
    /// The `assistant_message` carried by the `proposal` payload
    ProposalMessage,
}

/// How a stream that closes without `proposal`/`question`/`error` is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfStream {
    /// Transport end is the completion signal; finalize with what we have
    Finalize,
    /// A terminal event was required; the turn failed
    Fail,
}

impl ProtocolVariant {
    pub fn reply_source(self) -> ReplySource {
        match self {
            ProtocolVariant::Coaching => ReplySource::Accumulated,
            ProtocolVariant::Planning => ReplySource::ProposalMessage,
        }
    }

    pub fn end_of_stream(self) -> EndOfStream {
        match self {
            ProtocolVariant::Coaching => EndOfStream::Finalize,
            ProtocolVariant::Planning => EndOfStream::Fail,
        }
    }
}
