//! Progress streams for long-running backend jobs
//!
//! FIT imports and metric recalculation report per-item progress over the
//! same event-stream framing as the assistant turns. A [`ProgressMonitor`]
//! keeps at most one such stream open, reads it on a background task and
//! folds the events into a [`ProgressState`] for display.

use super::invalidation::{Invalidation, InvalidationBus};
use crate::client::{Endpoint, StreamRequest, Transport};
use crate::protocol::{route_progress, ItemOutcome, ProgressEvent, ProgressKind};
use crate::sse::FrameDecoder;
use chrono::NaiveDate;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const PROGRESS_CANCELLED: &str = "Cancelled";
pub const PROGRESS_ENDED_EARLY: &str = "Progress stream ended before completion";

/// Folded view of one progress stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressState {
    pub running: bool,
    pub total: Option<u64>,
    pub processed: u64,
    pub imported: u64,
    pub skipped: u64,
    pub errors: u64,
    pub last_item: Option<String>,
    pub summary: Option<Value>,
    pub error: Option<String>,
}

impl ProgressState {
    fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => self.total = Some(total),
            ProgressEvent::Advanced {
                phase,
                label,
                progress,
                total,
                outcome,
            } => {
                self.processed += 1;
                match outcome {
                    ItemOutcome::Imported { activity_type } => {
                        tracing::debug!(item = %label, %activity_type, progress, total, "Imported");
                        self.imported += 1;
                    }
                    ItemOutcome::Skipped { reason } => {
                        tracing::debug!(item = %label, %reason, progress, total, "Skipped");
                        self.skipped += 1;
                    }
                    ItemOutcome::Processed => tracing::trace!(%phase, item = %label, progress, total, "Processed"),
                }
                self.last_item = Some(label);
            }
            ProgressEvent::ItemFailed { label, error } => {
                tracing::warn!(item = %label, %error, "Progress item failed");
                self.processed += 1;
                self.errors += 1;
                self.last_item = Some(label);
            }
            ProgressEvent::Completed { summary } => {
                self.running = false;
                self.summary = Some(summary);
            }
        }
    }
}

#[derive(Debug)]
enum ProgressMessage {
    Event(ProgressEvent),
    Failed(String),
    Ended,
}

type Tagged = (u64, ProgressMessage);

pub struct ProgressMonitor<T: Transport + 'static> {
    transport: Arc<T>,
    invalidations: InvalidationBus,
    generation: u64,
    kind: Option<ProgressKind>,
    cancel: Option<CancellationToken>,
    state: ProgressState,
    tx: mpsc::Sender<Tagged>,
    rx: mpsc::Receiver<Tagged>,
}

impl<T: Transport + 'static> ProgressMonitor<T> {
    pub fn new(transport: Arc<T>, invalidations: InvalidationBus) -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            transport,
            invalidations,
            generation: 0,
            kind: None,
            cancel: None,
            state: ProgressState::default(),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Open a progress stream, closing any stream that is still open
    pub fn start(&mut self, kind: ProgressKind, from_date: Option<NaiveDate>) {
        self.close();
        self.generation += 1;
        self.kind = Some(kind);
        self.state = ProgressState {
            running: true,
            ..ProgressState::default()
        };

        let request = match (kind, from_date) {
            (ProgressKind::Import, Some(date)) => {
                StreamRequest::get(Endpoint::ImportProgress).with_query("from_date", date.to_string())
            }
            (ProgressKind::Import, None) => StreamRequest::get(Endpoint::ImportProgress),
            (ProgressKind::Recalculate, _) => StreamRequest::get(Endpoint::RecalculateProgress),
        };

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        let generation = self.generation;
        let transport = self.transport.clone();
        let tx = self.tx.clone();

        tracing::info!(generation, kind = kind.as_str(), "Progress stream started");
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::debug!(generation, "Progress stream cancelled");
                }
                () = read_progress(transport, request, kind, generation, tx) => {}
            }
        });
    }

    /// Stop the open stream. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.close() {
            // Late messages from the closed stream are discarded by generation
            self.generation += 1;
            self.state.running = false;
            self.state.error = Some(PROGRESS_CANCELLED.to_string());
            tracing::info!(generation = self.generation, "Progress stream cancelled");
        }
    }

    /// Wait for the next change of the open stream.
    ///
    /// `None` once the stream is no longer running.
    pub async fn next_update(&mut self) -> Option<ProgressState> {
        while self.state.running {
            let (generation, message) = self.rx.recv().await?;
            if generation != self.generation {
                tracing::debug!(generation, current = self.generation, "Discarding stale progress message");
                continue;
            }
            self.apply(message);
            return Some(self.state.clone());
        }
        None
    }

    fn apply(&mut self, message: ProgressMessage) {
        match message {
            ProgressMessage::Event(event) => {
                let completed = matches!(event, ProgressEvent::Completed { .. });
                self.state.apply(event);
                if completed {
                    self.close();
                    tracing::info!(
                        generation = self.generation,
                        processed = self.state.processed,
                        errors = self.state.errors,
                        "Progress stream complete"
                    );
                    let stale: &[Invalidation] = match self.kind {
                        Some(ProgressKind::Import) => &[Invalidation::Activities, Invalidation::Metrics],
                        _ => &[Invalidation::Metrics],
                    };
                    self.invalidations.publish(stale);
                }
            }
            ProgressMessage::Failed(message) => {
                self.close();
                self.state.running = false;
                self.state.error = Some(message);
            }
            ProgressMessage::Ended => {
                self.close();
                if self.state.running {
                    self.state.running = false;
                    self.state.error = Some(PROGRESS_ENDED_EARLY.to_string());
                }
            }
        }
    }

    /// Returns whether a stream was open
    fn close(&mut self) -> bool {
        match self.cancel.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl<T: Transport + 'static> Drop for ProgressMonitor<T> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_progress<T: Transport>(
    transport: Arc<T>,
    request: StreamRequest,
    kind: ProgressKind,
    generation: u64,
    tx: mpsc::Sender<Tagged>,
) {
    let send = |message| {
        let tx = tx.clone();
        async move { tx.send((generation, message)).await.is_ok() }
    };

    let mut stream = match transport.open_stream(&request).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(generation, kind = ?e.kind, error = %e, "Failed to open progress stream");
            send(ProgressMessage::Failed(e.to_string())).await;
            return;
        }
    };

    let mut decoder = FrameDecoder::new();
    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(generation, error = %e, "Progress stream failed");
                send(ProgressMessage::Failed(e.to_string())).await;
                return;
            }
        };
        for frame in decoder.feed(&bytes) {
            match route_progress(kind, &frame) {
                Ok(Some(event)) => {
                    if !send(ProgressMessage::Event(event)).await {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(generation, error = %e, "Dropping progress frame"),
            }
        }
    }

    for frame in decoder.finish() {
        if let Ok(Some(event)) = route_progress(kind, &frame) {
            send(ProgressMessage::Event(event)).await;
        }
    }
    send(ProgressMessage::Ended).await;
}
