//! Turn-stream events and the routing table for both protocol variants
//!
//! Both variants share framing but not vocabulary. Each has a table mapping
//! event names to a payload schema. Names missing from a variant's table
//! are ignored, so the server can add events without breaking older clients.

use super::types::{DeletionItem, PendingQuestion, Proposal, ProposalItem, ToolCallRecord, ToolResultRecord};
use crate::sse::{DecodeError, Frame};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which assistant endpoint family a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVariant {
    /// Tool-calling coaching chat
    #[default]
    Coaching,
    /// Conversational workout planning
    Planning,
}

impl ProtocolVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVariant::Coaching => "coaching",
            ProtocolVariant::Planning => "planning",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coaching" | "coach" => Ok(ProtocolVariant::Coaching),
            "planning" | "plan" => Ok(ProtocolVariant::Planning),
            other => Err(format!("unknown session mode: {other}")),
        }
    }
}

/// A routed, typed event from a turn stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Thinking {
        /// Planning only
        phase: Option<String>,
        message: String,
    },
    ToolCall(ToolCallRecord),
    ToolResult(ToolResultRecord),
    /// Full current reply text; replaces any earlier `Text`
    Text { content: String },
    Proposal {
        proposal: Proposal,
        /// Planning only: the assistant's reply accompanying the proposal
        assistant_message: Option<String>,
    },
    Question(PendingQuestion),
    Error { message: String },
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Thinking { .. } => "thinking",
            StreamEvent::ToolCall(_) => "tool_call",
            StreamEvent::ToolResult(_) => "tool_result",
            StreamEvent::Text { .. } => "text",
            StreamEvent::Proposal { .. } => "proposal",
            StreamEvent::Question(_) => "question",
            StreamEvent::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Payload schemas
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadSchema {
    Thinking,
    ToolCall,
    ToolResult,
    Text,
    CoachingProposal,
    PlanningProposal,
    Question,
    Error,
}

const COACHING_EVENTS: &[(&str, PayloadSchema)] = &[
    ("thinking", PayloadSchema::Thinking),
    ("tool_call", PayloadSchema::ToolCall),
    ("tool_result", PayloadSchema::ToolResult),
    ("text", PayloadSchema::Text),
    ("proposal", PayloadSchema::CoachingProposal),
    ("error", PayloadSchema::Error),
];

const PLANNING_EVENTS: &[(&str, PayloadSchema)] = &[
    ("thinking", PayloadSchema::Thinking),
    ("proposal", PayloadSchema::PlanningProposal),
    ("question", PayloadSchema::Question),
    ("error", PayloadSchema::Error),
];

fn vocabulary(variant: ProtocolVariant) -> &'static [(&'static str, PayloadSchema)] {
    match variant {
        ProtocolVariant::Coaching => COACHING_EVENTS,
        ProtocolVariant::Planning => PLANNING_EVENTS,
    }
}

#[derive(Debug, Deserialize)]
struct ThinkingPayload {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TextPayload {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct CoachingProposalPayload {
    #[serde(default)]
    proposal_id: Option<String>,
    #[serde(default)]
    workouts: Vec<ProposalItem>,
    #[serde(default)]
    deletions: Vec<DeletionItem>,
}

#[derive(Debug, Deserialize)]
struct PlanningProposalPayload {
    #[serde(default)]
    workouts: Vec<ProposalItem>,
    #[serde(default)]
    assistant_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

// ============================================================================
// Routing
// ============================================================================

/// Map a frame onto a typed event for the given variant.
///
/// `Ok(None)` for event names the variant does not know; `Err` when the
/// payload is not JSON or does not match the event's schema.
pub fn route(variant: ProtocolVariant, frame: &Frame) -> Result<Option<StreamEvent>, DecodeError> {
    let Some(&(_, schema)) = vocabulary(variant)
        .iter()
        .find(|(name, _)| *name == frame.event_name)
    else {
        tracing::debug!(%variant, event = %frame.event_name, "Ignoring unknown event");
        return Ok(None);
    };

    let event = match schema {
        PayloadSchema::Thinking => {
            let p: ThinkingPayload = parse(frame)?;
            StreamEvent::Thinking {
                phase: p.phase,
                message: p.message,
            }
        }
        PayloadSchema::ToolCall => StreamEvent::ToolCall(parse(frame)?),
        PayloadSchema::ToolResult => StreamEvent::ToolResult(parse(frame)?),
        PayloadSchema::Text => {
            let p: TextPayload = parse(frame)?;
            StreamEvent::Text { content: p.content }
        }
        PayloadSchema::CoachingProposal => {
            let p: CoachingProposalPayload = parse(frame)?;
            StreamEvent::Proposal {
                proposal: Proposal {
                    proposal_id: p.proposal_id,
                    items: p.workouts,
                    deletions: p.deletions,
                },
                assistant_message: None,
            }
        }
        PayloadSchema::PlanningProposal => {
            let p: PlanningProposalPayload = parse(frame)?;
            StreamEvent::Proposal {
                proposal: Proposal {
                    proposal_id: None,
                    items: p.workouts,
                    deletions: vec![],
                },
                assistant_message: p.assistant_message,
            }
        }
        PayloadSchema::Question => StreamEvent::Question(parse(frame)?),
        PayloadSchema::Error => {
            let p: ErrorPayload = parse(frame)?;
            StreamEvent::Error { message: p.message }
        }
    };

    Ok(Some(event))
}

fn parse<T: DeserializeOwned>(frame: &Frame) -> Result<T, DecodeError> {
    let value = frame.json()?;
    serde_json::from_value(value).map_err(|e| DecodeError::schema(&frame.event_name, e))
}
