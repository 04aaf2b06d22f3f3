//! Progress-stream events for FIT import and metric recalculation

use crate::sse::{DecodeError, Frame};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Which long-running backend job a progress stream reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressKind {
    Import,
    Recalculate,
}

impl ProgressKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressKind::Import => "import",
            ProgressKind::Recalculate => "recalculate",
        }
    }
}

/// What happened to one processed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A FIT file was imported as a new activity
    Imported { activity_type: String },
    /// A FIT file was skipped (already imported, before the filter date)
    Skipped { reason: String },
    /// An activity or day had its metrics recomputed
    Processed,
}

/// A routed progress event
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started {
        total: u64,
    },
    Advanced {
        /// `activities` or `daily` for recalculation, `files` for imports
        phase: String,
        label: String,
        progress: u64,
        total: u64,
        outcome: ItemOutcome,
    },
    /// A single item failed; the job carries on
    ItemFailed {
        label: String,
        error: String,
    },
    Completed {
        summary: Value,
    },
}

#[derive(Debug, Deserialize)]
struct ImportStart {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RecalculateStart {
    #[serde(default)]
    total_activities: u64,
    #[serde(default)]
    total_days: u64,
}

#[derive(Debug, Deserialize)]
struct ImportSkip {
    file: String,
    #[serde(default)]
    reason: String,
    progress: u64,
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ImportItem {
    file: String,
    #[serde(default)]
    activity_type: String,
    progress: u64,
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ImportFailure {
    #[serde(default)]
    file: String,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct ActivityItem {
    activity_id: i64,
    #[serde(default)]
    activity_type: String,
    progress: u64,
    total: u64,
    #[serde(default)]
    phase: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyItem {
    date: String,
    progress: u64,
    total: u64,
    #[serde(default)]
    phase: Option<String>,
}

/// Map a progress-stream frame onto a typed event.
///
/// Unknown event names yield `Ok(None)`.
pub fn route_progress(kind: ProgressKind, frame: &Frame) -> Result<Option<ProgressEvent>, DecodeError> {
    let event = match (kind, frame.event_name.as_str()) {
        (ProgressKind::Import, "start") => {
            let p: ImportStart = parse(frame)?;
            ProgressEvent::Started { total: p.total }
        }
        (ProgressKind::Recalculate, "start") => {
            let p: RecalculateStart = parse(frame)?;
            ProgressEvent::Started {
                total: p.total_activities + p.total_days,
            }
        }
        (ProgressKind::Import, "skip") => {
            let p: ImportSkip = parse(frame)?;
            ProgressEvent::Advanced {
                phase: "files".to_string(),
                label: p.file,
                progress: p.progress,
                total: p.total,
                outcome: ItemOutcome::Skipped { reason: p.reason },
            }
        }
        (ProgressKind::Import, "import") => {
            let p: ImportItem = parse(frame)?;
            ProgressEvent::Advanced {
                phase: "files".to_string(),
                label: p.file,
                progress: p.progress,
                total: p.total,
                outcome: ItemOutcome::Imported {
                    activity_type: p.activity_type,
                },
            }
        }
        (ProgressKind::Import, "error") => {
            let p: ImportFailure = parse(frame)?;
            ProgressEvent::ItemFailed {
                label: p.file,
                error: p.error,
            }
        }
        (ProgressKind::Recalculate, "activity") => {
            let p: ActivityItem = parse(frame)?;
            ProgressEvent::Advanced {
                phase: p.phase.unwrap_or_else(|| "activities".to_string()),
                label: format!("{} #{}", p.activity_type, p.activity_id),
                progress: p.progress,
                total: p.total,
                outcome: ItemOutcome::Processed,
            }
        }
        (ProgressKind::Recalculate, "daily") => {
            let p: DailyItem = parse(frame)?;
            ProgressEvent::Advanced {
                phase: p.phase.unwrap_or_else(|| "daily".to_string()),
                label: p.date,
                progress: p.progress,
                total: p.total,
                outcome: ItemOutcome::Processed,
            }
        }
        (_, "complete") => ProgressEvent::Completed {
            summary: frame.json()?,
        },
        (kind, other) => {
            tracing::debug!(kind = kind.as_str(), event = %other, "Ignoring unknown progress event");
            return Ok(None);
        }
    };

    Ok(Some(event))
}

fn parse<T: DeserializeOwned>(frame: &Frame) -> Result<T, DecodeError> {
    let value = frame.json()?;
    serde_json::from_value(value).map_err(|e| DecodeError::schema(&frame.event_name, e))
}
