//! Property-based tests for turn accumulation
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::protocol::{
    ConversationTurn, PendingQuestion, Proposal, ProtocolVariant, Role, StreamEvent, ToolCallRecord,
    ToolResultRecord,
};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_variant() -> impl Strategy<Value = ProtocolVariant> {
    prop_oneof![Just(ProtocolVariant::Coaching), Just(ProtocolVariant::Planning)]
}

fn arb_tool_call() -> impl Strategy<Value = StreamEvent> {
    "[a-z_]{3,20}".prop_map(|tool_name| {
        StreamEvent::ToolCall(ToolCallRecord {
            tool_name,
            arguments: json!({}),
        })
    })
}

fn arb_non_terminal() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        "[a-zA-Z .]{0,30}".prop_map(|message| StreamEvent::Thinking { phase: None, message }),
        arb_tool_call(),
        "[a-z_]{3,20}".prop_map(|tool_name| StreamEvent::ToolResult(ToolResultRecord {
            tool_name,
            result: json!({}),
            summary: String::new(),
        })),
        "[a-zA-Z .]{0,30}".prop_map(|content| StreamEvent::Text { content }),
    ]
}

fn arb_success_terminal() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        "[a-zA-Z ]{0,30}".prop_map(|message| StreamEvent::Proposal {
            proposal: Proposal::default(),
            assistant_message: Some(message),
        }),
        "[a-zA-Z ?]{1,30}".prop_map(|message| StreamEvent::Question(PendingQuestion {
            message,
            options: None,
        })),
    ]
}

fn arb_history() -> impl Strategy<Value = Vec<ConversationTurn>> {
    proptest::collection::vec("[a-z ]{1,20}", 0..4).prop_map(|pairs| {
        pairs
            .into_iter()
            .flat_map(|text| [ConversationTurn::user(text.clone()), ConversationTurn::assistant(text)])
            .collect()
    })
}

fn started(conversation: Vec<ConversationTurn>) -> SessionState {
    let mut state = SessionState {
        conversation,
        ..SessionState::default()
    };
    state.begin_turn();
    state
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_tool_calls_are_append_only(
        names in proptest::collection::vec("[a-z_]{3,20}", 0..12),
        history in arb_history(),
    ) {
        let mut state = started(history.clone());
        let mut turn = TurnAccumulator::new(ProtocolVariant::Coaching, "go");

        for name in &names {
            turn.apply(&mut state, StreamEvent::ToolCall(ToolCallRecord {
                tool_name: name.clone(),
                arguments: json!({}),
            }));
        }
        turn.finish_stream(&mut state);

        let reply = state.conversation.last().unwrap();
        let recorded: Vec<&str> = reply.tool_calls.iter().map(|c| c.tool_name.as_str()).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        prop_assert_eq!(recorded, expected);
    }

    #[test]
    fn prop_last_text_wins(
        texts in proptest::collection::vec("[a-zA-Z ]{0,20}", 1..8),
    ) {
        let mut state = started(vec![]);
        let mut turn = TurnAccumulator::new(ProtocolVariant::Coaching, "go");

        for content in &texts {
            turn.apply(&mut state, StreamEvent::Text { content: content.clone() });
        }
        turn.finish_stream(&mut state);

        prop_assert_eq!(&state.conversation[1].content, texts.last().unwrap());
    }

    #[test]
    fn prop_successful_turn_appends_user_then_assistant(
        variant in arb_variant(),
        history in arb_history(),
        prefix in proptest::collection::vec(arb_non_terminal(), 0..10),
        terminal in arb_success_terminal(),
    ) {
        let k = history.len();
        let mut state = started(history.clone());
        let mut turn = TurnAccumulator::new(variant, "next");

        for event in prefix {
            turn.apply(&mut state, event);
        }
        let status = turn.apply(&mut state, terminal);

        prop_assert_eq!(status, TurnStatus::Finalized);
        prop_assert_eq!(state.conversation.len(), k + 2);
        prop_assert_eq!(&state.conversation[..k], &history[..]);
        prop_assert_eq!(state.conversation[k].role, Role::User);
        prop_assert_eq!(&state.conversation[k].content, "next");
        prop_assert_eq!(state.conversation[k + 1].role, Role::Assistant);
        prop_assert!(!state.is_processing);
        prop_assert!(state.thinking_message.is_none());
        prop_assert!(state.active_tool_call.is_none());
        prop_assert!(state.proposal.is_some() != state.pending_question.is_some());
    }

    #[test]
    fn prop_error_leaves_history_untouched(
        variant in arb_variant(),
        history in arb_history(),
        prefix in proptest::collection::vec(arb_non_terminal(), 0..10),
        message in "[a-zA-Z ]{1,30}",
    ) {
        let mut state = started(history.clone());
        let mut turn = TurnAccumulator::new(variant, "next");

        for event in prefix {
            turn.apply(&mut state, event);
        }
        turn.apply(&mut state, StreamEvent::Error { message: message.clone() });

        prop_assert_eq!(&state.conversation, &history);
        prop_assert_eq!(state.error, Some(message));
        prop_assert!(!state.is_processing);
        prop_assert!(state.thinking_message.is_none());
        prop_assert!(state.active_tool_call.is_none());
    }

    #[test]
    fn prop_nothing_applies_after_terminal(
        variant in arb_variant(),
        terminal in prop_oneof![
            arb_success_terminal(),
            "[a-z]{1,10}".prop_map(|message| StreamEvent::Error { message }),
        ],
        late in proptest::collection::vec(
            prop_oneof![arb_non_terminal(), arb_success_terminal()],
            1..6,
        ),
    ) {
        let mut state = started(vec![]);
        let mut turn = TurnAccumulator::new(variant, "x");

        let status = turn.apply(&mut state, terminal);
        let snapshot = state.clone();

        for event in late {
            prop_assert_eq!(turn.apply(&mut state, event), status);
        }
        prop_assert_eq!(turn.finish_stream(&mut state), status);
        prop_assert_eq!(state, snapshot);
    }
}
