//! Transport to the Trainy backend
//!
//! Provides a common interface for opening event streams and posting JSON,
//! so the runtime can be driven by the real HTTP client or by a scripted
//! mock.

mod config;
pub mod error;
mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;

/// Raw chunks of an event stream as the transport delivers them
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Backend endpoints used by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CoachingChat,
    CoachingAccept,
    PlanningGenerate,
    PlanningRefine,
    PlanningAccept,
    ImportProgress,
    RecalculateProgress,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CoachingChat => "/api/v1/coaching/chat/stream",
            Endpoint::CoachingAccept => "/api/v1/coaching/accept-proposal",
            Endpoint::PlanningGenerate => "/api/v1/planned-workouts/generate/stream",
            Endpoint::PlanningRefine => "/api/v1/planned-workouts/refine/stream",
            Endpoint::PlanningAccept => "/api/v1/planned-workouts/accept",
            Endpoint::ImportProgress => "/api/v1/import/stream",
            Endpoint::RecalculateProgress => "/api/v1/metrics/recalculate/stream",
        }
    }
}

/// Request that opens an event stream.
///
/// Sent as `POST` with a JSON body when `body` is set, `GET` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub endpoint: Endpoint,
    pub body: Option<Value>,
    pub query: Vec<(&'static str, String)>,
}

impl StreamRequest {
    pub fn post(endpoint: Endpoint, body: Value) -> Self {
        Self {
            endpoint,
            body: Some(body),
            query: vec![],
        }
    }

    pub fn get(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            body: None,
            query: vec![],
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}

/// Common interface for reaching the backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open an event stream; resolves once the response headers arrived
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError>;

    /// Non-streaming JSON request
    async fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<Value, ClientError>;
}
