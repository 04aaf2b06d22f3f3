//! Trainy coach - terminal client for the Trainy training assistant
//!
//! Streams coaching chats and workout-planning turns from the Trainy
//! backend, folds the server-sent events into session state and lets the
//! athlete accept, refine or reject the proposed workouts.

mod client;
mod console;
mod protocol;
mod runtime;
mod sse;
mod state_machine;

use client::{ClientConfig, HttpTransport};
use console::Console;
use runtime::{InvalidationBus, ProgressMonitor, SessionController};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the console
    let json_logs = std::env::var("TRAINY_LOG_JSON").is_ok_and(|v| v == "1");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trainy_coach=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    // Configuration
    let config = ClientConfig::from_env();
    tracing::info!(base_url = %config.base_url, mode = %config.mode, "Starting Trainy client");

    let transport = Arc::new(HttpTransport::new(&config)?);
    let invalidations = InvalidationBus::new();
    let session = SessionController::new(transport.clone(), config.mode, invalidations.clone());
    let progress = ProgressMonitor::new(transport, invalidations);

    // Front-end views would refetch here; the console only records it
    let mut stale = session.subscribe_invalidations();
    tokio::spawn(async move {
        loop {
            match stale.recv().await {
                Ok(key) => tracing::info!(?key, "Backend data changed"),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "Invalidation listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    Console::new(session, progress).run().await?;
    Ok(())
}
