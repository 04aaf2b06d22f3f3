//! Frame decoding errors

use thiserror::Error;

/// A single frame that could not be turned into a typed event.
///
/// Never fatal for the stream: the offending frame is logged and dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON in `{event}` frame: {source}")]
    InvalidJson {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{event}` payload has an unexpected shape: {source}")]
    Schema {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn invalid_json(event: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidJson {
            event: event.into(),
            source,
        }
    }

    pub fn schema(event: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Schema {
            event: event.into(),
            source,
        }
    }

    /// Name of the event whose frame was dropped
    pub fn event(&self) -> &str {
        match self {
            Self::InvalidJson { event, .. } | Self::Schema { event, .. } => event,
        }
    }
}
