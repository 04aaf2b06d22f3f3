//! Session state types

use crate::protocol::{ConversationTurn, PendingQuestion, Proposal, ToolCallRecord};
use serde::Serialize;

/// Narration shown as soon as a turn starts, before the server says anything
pub const THINKING_PLACEHOLDER: &str = "Thinking...";

/// Everything a front-end renders for one assistant session.
///
/// Only the session controller mutates this; callers get shared references.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub is_processing: bool,
    pub thinking_message: Option<String>,
    pub active_tool_call: Option<ToolCallRecord>,
    pub conversation: Vec<ConversationTurn>,
    pub proposal: Option<Proposal>,
    pub pending_question: Option<PendingQuestion>,
    pub error: Option<String>,
}

/// Coarse session phase derived from [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Sending,
    Errored,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        if self.is_processing {
            SessionPhase::Sending
        } else if self.error.is_some() {
            SessionPhase::Errored
        } else {
            SessionPhase::Idle
        }
    }

    /// Reset the per-turn fields at the start of a new turn
    pub(crate) fn begin_turn(&mut self) {
        self.is_processing = true;
        self.thinking_message = Some(THINKING_PLACEHOLDER.to_string());
        self.active_tool_call = None;
        self.proposal = None;
        self.pending_question = None;
        self.error = None;
    }

    /// Clear the transient narration once a turn has stopped
    pub(crate) fn end_turn(&mut self) {
        self.is_processing = false;
        self.thinking_message = None;
        self.active_tool_call = None;
    }
}
