//! Transport error types

use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Network, message)
    }

    pub fn status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self::new(ClientErrorKind::Status(status), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Decode, message)
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::InvalidUrl, message)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            ClientError::network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            ClientError::decode(format!("Failed to decode response: {e}"))
        } else if let Some(status) = e.status() {
            ClientError::status(status.as_u16(), &e.to_string())
        } else {
            ClientError::network(format!("Request failed: {e}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// Connection refused, dropped, timed out
    Network,
    /// Non-success HTTP status
    Status(u16),
    /// Response body was not what we expected
    Decode,
    /// Base URL and path do not form a valid URL
    InvalidUrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = ClientError::status(400, r#"{"detail":"OpenRouter API key not configured"}"#);
        assert_eq!(err.kind, ClientErrorKind::Status(400));
        assert_eq!(
            err.to_string(),
            r#"HTTP 400: {"detail":"OpenRouter API key not configured"}"#
        );

        assert_eq!(ClientError::status(502, "  ").to_string(), "HTTP 502");
        assert_eq!(ClientError::network("reset").kind, ClientErrorKind::Network);
    }
}
