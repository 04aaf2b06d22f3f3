//! Client configuration

use crate::protocol::ProtocolVariant;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for reaching the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,
    /// Which assistant the session talks to
    pub mode: ProtocolVariant,
    /// Applied to non-streaming requests only; streams may run for minutes
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            mode: ProtocolVariant::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let mode = match lookup("TRAINY_MODE").map(|m| m.parse::<ProtocolVariant>()) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring TRAINY_MODE, using coaching");
                defaults.mode
            }
            None => defaults.mode,
        };

        let secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        Self {
            base_url: lookup("TRAINY_API_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.base_url),
            mode,
            request_timeout: secs("TRAINY_REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),
            connect_timeout: secs("TRAINY_CONNECT_TIMEOUT_SECS").unwrap_or(defaults.connect_timeout),
        }
    }
}
