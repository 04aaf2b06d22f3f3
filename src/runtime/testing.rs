//! Mock implementations for testing
//!
//! These mocks replay scripted event streams without real I/O.

use crate::client::{ByteStream, ClientError, Endpoint, StreamRequest, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Transport
// ============================================================================

enum ScriptedStream {
    /// Chunks delivered in order, then the stream closes
    Chunks(Vec<Result<Bytes, ClientError>>),
    /// Chunks delivered in order, then the stream never yields again
    Hanging(Vec<Bytes>),
    /// Opening the stream fails
    Refused(ClientError),
}

/// Decrements the open-stream count when the stream is dropped
struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Transport that replays queued streams and responses
#[derive(Default)]
pub struct MockTransport {
    streams: Mutex<VecDeque<ScriptedStream>>,
    posts: Mutex<VecDeque<Result<Value, ClientError>>>,
    open: Arc<AtomicUsize>,
    /// Record of every stream request
    pub stream_log: Mutex<Vec<StreamRequest>>,
    /// Record of every JSON post
    pub post_log: Mutex<Vec<(Endpoint, Value)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream that delivers `chunks` and closes
    pub fn queue_stream_chunks<S: AsRef<str>>(&self, chunks: &[S]) {
        self.queue_stream(chunks.iter().map(|c| Ok(c.as_ref().to_string())).collect());
    }

    /// Queue a stream with explicit chunk results, e.g. a mid-stream failure
    pub fn queue_stream(&self, chunks: Vec<Result<String, ClientError>>) {
        let chunks = chunks.into_iter().map(|c| c.map(Bytes::from)).collect();
        self.streams.lock().unwrap().push_back(ScriptedStream::Chunks(chunks));
    }

    /// Queue a stream that delivers `chunks` and then stays open
    pub fn queue_hanging_stream<S: AsRef<str>>(&self, chunks: &[S]) {
        let chunks = chunks.iter().map(|c| Bytes::from(c.as_ref().to_string())).collect();
        self.streams.lock().unwrap().push_back(ScriptedStream::Hanging(chunks));
    }

    /// Queue a failure to open the next stream
    pub fn queue_stream_error(&self, error: ClientError) {
        self.streams.lock().unwrap().push_back(ScriptedStream::Refused(error));
    }

    pub fn queue_post(&self, response: Result<Value, ClientError>) {
        self.posts.lock().unwrap().push_back(response);
    }

    pub fn stream_requests(&self) -> Vec<StreamRequest> {
        self.stream_log.lock().unwrap().clone()
    }

    pub fn post_requests(&self) -> Vec<(Endpoint, Value)> {
        self.post_log.lock().unwrap().clone()
    }

    /// Streams handed out and not yet dropped
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn track(&self, stream: ByteStream) -> ByteStream {
        self.open.fetch_add(1, Ordering::SeqCst);
        let guard = OpenGuard(self.open.clone());
        stream
            .map(move |chunk| {
                let _ = &guard;
                chunk
            })
            .boxed()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError> {
        self.stream_log.lock().unwrap().push(request.clone());
        let scripted = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedStream::Refused(ClientError::network("No mock stream queued")));

        match scripted {
            ScriptedStream::Chunks(chunks) => Ok(self.track(stream::iter(chunks).boxed())),
            ScriptedStream::Hanging(chunks) => Ok(self.track(
                stream::iter(chunks.into_iter().map(Ok))
                    .chain(stream::pending())
                    .boxed(),
            )),
            ScriptedStream::Refused(error) => Err(error),
        }
    }

    async fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<Value, ClientError> {
        self.post_log.lock().unwrap().push((endpoint, body.clone()));
        self.posts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::network("No mock response queued")))
    }
}
