//! Conversation and proposal types shared by both protocol variants
//!
//! Field names follow the backend's snake_case JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Tool activity
// ============================================================================

/// A tool the assistant invoked during a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Output of a tool invocation.
///
/// Paired with its [`ToolCallRecord`] by position only; the backend sends no
/// correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub tool_name: String,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub summary: String,
}

// ============================================================================
// Conversation
// ============================================================================

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A finalized conversation entry. Never modified once in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultRecord>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_results: vec![],
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: vec![],
            tool_results: vec![],
        }
    }
}

/// The `{role, content}` pair sent upstream as conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// Strip tool activity from the history before sending it to the backend
pub fn history_payload(conversation: &[ConversationTurn]) -> Vec<HistoryMessage> {
    conversation
        .iter()
        .map(|turn| HistoryMessage {
            role: turn.role,
            content: turn.content.clone(),
        })
        .collect()
}

// ============================================================================
// Proposals
// ============================================================================

/// Calendar day of a proposal date as the model wrote it.
///
/// Dates are kept verbatim on the wire since the backend passes the model's
/// string through unchecked; `2026-03-17T06:00:00` reads as 2026-03-17.
pub fn calendar_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// A workout the assistant proposes to create, or to edit when
/// `existing_workout_id` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalItem {
    pub date: String,
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_type: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target_duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tss: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_workout_id: Option<i64>,
}

/// A planned workout the assistant proposes to delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionItem {
    pub workout_id: i64,
    pub title: String,
    pub date: String,
}

/// A batch of proposed creations, edits and deletions awaiting acceptance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<String>,
    pub items: Vec<ProposalItem>,
    #[serde(default)]
    pub deletions: Vec<DeletionItem>,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.deletions.is_empty()
    }
}

/// A clarifying question asked instead of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Server response to an accepted proposal.
///
/// The coaching endpoint reports the affected workout ids; the planning
/// endpoint's body is only kept verbatim in `raw`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AcceptOutcome {
    #[serde(default)]
    pub created_ids: Vec<i64>,
    #[serde(default)]
    pub updated_ids: Vec<i64>,
    #[serde(default)]
    pub deleted_ids: Vec<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(skip)]
    pub raw: Value,
}

impl AcceptOutcome {
    pub fn from_response(raw: Value) -> Self {
        let mut outcome: Self = serde_json::from_value(raw.clone()).unwrap_or_default();
        outcome.raw = raw;
        outcome
    }
}
