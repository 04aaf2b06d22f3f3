//! Turn accumulator
//!
//! Collects tool activity and reply text while a turn streams in, mirrors
//! the live parts (narration, active tool) into [`SessionState`], and on a
//! terminal event either appends `[user, assistant]` to the conversation or
//! discards the turn.

use super::{EndOfStream, ReplySource, SessionState};
use crate::protocol::{ConversationTurn, ProtocolVariant, StreamEvent, ToolCallRecord, ToolResultRecord};

/// Visible error for a planning stream that closed without an answer
pub const STREAM_ENDED_EARLY: &str = "Stream ended before a response was received";

/// Lifecycle of one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// Still accepting events
    Open,
    /// Appended to the conversation
    Finalized,
    /// Discarded; conversation untouched
    Aborted,
}

/// Per-turn transient state
#[derive(Debug, Clone)]
pub struct TurnAccumulator {
    variant: ProtocolVariant,
    user_input: String,
    tool_calls: Vec<ToolCallRecord>,
    tool_results: Vec<ToolResultRecord>,
    text_content: String,
    status: TurnStatus,
}

impl TurnAccumulator {
    pub fn new(variant: ProtocolVariant, user_input: impl Into<String>) -> Self {
        Self {
            variant,
            user_input: user_input.into(),
            tool_calls: vec![],
            tool_results: vec![],
            text_content: String::new(),
            status: TurnStatus::Open,
        }
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == TurnStatus::Open
    }

    /// Apply one routed event. Events after the turn closed are ignored.
    pub fn apply(&mut self, state: &mut SessionState, event: StreamEvent) -> TurnStatus {
        if !self.is_open() {
            tracing::debug!(event = event.name(), status = ?self.status, "Ignoring event for closed turn");
            return self.status;
        }

        match event {
            StreamEvent::Thinking { message, .. } => {
                state.thinking_message = Some(message);
                state.active_tool_call = None;
            }
            StreamEvent::ToolCall(call) => {
                state.active_tool_call = Some(call.clone());
                state.thinking_message = None;
                self.tool_calls.push(call);
            }
            StreamEvent::ToolResult(result) => {
                self.tool_results.push(result);
                state.active_tool_call = None;
            }
            StreamEvent::Text { content } => {
                // Each `text` carries the full reply so far, not a delta
                self.text_content = content;
            }
            StreamEvent::Proposal {
                proposal,
                assistant_message,
            } => {
                let reply = match self.variant.reply_source() {
                    ReplySource::Accumulated => self.accumulated_reply(),
                    ReplySource::ProposalMessage => {
                        ConversationTurn::assistant(assistant_message.unwrap_or_default())
                    }
                };
                state.proposal = Some(proposal);
                self.finalize(state, reply);
            }
            StreamEvent::Question(question) => {
                let reply = ConversationTurn::assistant(question.message.clone());
                state.proposal = None;
                state.pending_question = Some(question);
                self.finalize(state, reply);
            }
            StreamEvent::Error { message } => {
                self.abort(state, message);
            }
        }

        self.status
    }

    /// The transport closed normally
    pub fn finish_stream(&mut self, state: &mut SessionState) -> TurnStatus {
        if !self.is_open() {
            return self.status;
        }

        match self.variant.end_of_stream() {
            EndOfStream::Finalize => {
                let reply = self.accumulated_reply();
                self.finalize(state, reply);
            }
            EndOfStream::Fail => {
                tracing::warn!(variant = %self.variant, "Turn stream ended without a terminal event");
                self.abort(state, STREAM_ENDED_EARLY.to_string());
            }
        }
        self.status
    }

    /// The transport failed; `message` is what the user gets to see
    pub fn fail(&mut self, state: &mut SessionState, message: impl Into<String>) -> TurnStatus {
        if self.is_open() {
            self.abort(state, message.into());
        }
        self.status
    }

    fn accumulated_reply(&mut self) -> ConversationTurn {
        ConversationTurn {
            tool_calls: std::mem::take(&mut self.tool_calls),
            tool_results: std::mem::take(&mut self.tool_results),
            ..ConversationTurn::assistant(std::mem::take(&mut self.text_content))
        }
    }

    fn finalize(&mut self, state: &mut SessionState, reply: ConversationTurn) {
        state
            .conversation
            .push(ConversationTurn::user(std::mem::take(&mut self.user_input)));
        state.conversation.push(reply);
        state.end_turn();
        self.status = TurnStatus::Finalized;
    }

    fn abort(&mut self, state: &mut SessionState, message: String) {
        state.error = Some(message);
        state.end_turn();
        self.status = TurnStatus::Aborted;
    }
}
