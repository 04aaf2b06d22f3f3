//! Request bodies for each assistant variant

use crate::client::{Endpoint, StreamRequest};
use crate::protocol::{history_payload, ConversationTurn, Proposal, ProtocolVariant};
use serde_json::{json, Value};

/// Stream request that starts a new turn
pub(crate) fn turn_request(
    variant: ProtocolVariant,
    input: &str,
    conversation: &[ConversationTurn],
) -> StreamRequest {
    let history = history_payload(conversation);
    match variant {
        ProtocolVariant::Coaching => StreamRequest::post(
            Endpoint::CoachingChat,
            json!({ "message": input, "conversation_history": history }),
        ),
        ProtocolVariant::Planning => StreamRequest::post(
            Endpoint::PlanningGenerate,
            json!({ "prompt": input, "conversation_history": history }),
        ),
    }
}

/// Stream request that refines the current proposal; `None` if the variant
/// has no refine endpoint
pub(crate) fn refine_request(
    variant: ProtocolVariant,
    refinement: &str,
    proposal: &Proposal,
    conversation: &[ConversationTurn],
) -> Option<StreamRequest> {
    match variant {
        ProtocolVariant::Coaching => None,
        ProtocolVariant::Planning => Some(StreamRequest::post(
            Endpoint::PlanningRefine,
            json!({
                "refinement": refinement,
                "current_proposal": proposal.items,
                "conversation_history": history_payload(conversation),
            }),
        )),
    }
}

/// Endpoint and body that persist a proposal
pub(crate) fn accept_request(variant: ProtocolVariant, proposal: &Proposal) -> (Endpoint, Value) {
    match variant {
        ProtocolVariant::Coaching => (
            Endpoint::CoachingAccept,
            json!({
                "proposal_id": proposal.proposal_id.clone().unwrap_or_default(),
                "workouts": proposal.items,
                "deletions": proposal.deletions,
            }),
        ),
        ProtocolVariant::Planning => (Endpoint::PlanningAccept, json!({ "workouts": proposal.items })),
    }
}
