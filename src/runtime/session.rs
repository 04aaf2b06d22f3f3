//! Session controller
//!
//! Owns the visible [`SessionState`] of one assistant session and drives
//! each turn: issues the stream request, feeds the bytes through the frame
//! decoder and event router into a [`TurnAccumulator`], and settles the turn.
//!
//! Every turn is stamped with a generation. `reset()` bumps it, so bytes or
//! errors that belong to an abandoned turn are dropped instead of leaking
//! into the fresh session.

use super::invalidation::{Invalidation, InvalidationBus};
use super::requests::{accept_request, refine_request, turn_request};
use crate::client::{ClientError, StreamRequest, Transport};
use crate::protocol::{route, AcceptOutcome, ProtocolVariant};
use crate::sse::FrameDecoder;
use crate::state_machine::{SessionState, TurnAccumulator, TurnStatus};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;

/// Shown for any transport failure; the detail only goes to the log
pub const TRANSPORT_FAILED: &str = "Connection to the planning service failed";
pub const NO_PROPOSAL: &str = "No proposal to act on";
pub const REFINE_UNSUPPORTED: &str = "Refining a proposal is only supported by the planning assistant";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A turn is already in progress")]
    Busy,
    #[error("{0}")]
    Validation(String),
    #[error("Transport failed: {0}")]
    Transport(#[from] ClientError),
    #[error("{0}")]
    Protocol(String),
}

/// Identifies the turn a transport callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTicket {
    generation: u64,
}

struct ActiveTurn {
    generation: u64,
    decoder: FrameDecoder,
    accumulator: TurnAccumulator,
}

pub struct SessionController<T: Transport> {
    transport: Arc<T>,
    variant: ProtocolVariant,
    state: SessionState,
    generation: u64,
    active: Option<ActiveTurn>,
    invalidations: InvalidationBus,
}

impl<T: Transport> SessionController<T> {
    pub fn new(transport: Arc<T>, variant: ProtocolVariant, invalidations: InvalidationBus) -> Self {
        Self {
            transport,
            variant,
            state: SessionState::default(),
            generation: 0,
            active: None,
            invalidations,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn subscribe_invalidations(&self) -> tokio::sync::broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// Send a user message and stream the reply to completion.
    ///
    /// `observe` sees the state once the turn starts and after every change
    /// while it streams.
    pub async fn send(
        &mut self,
        text: impl Into<String>,
        mut observe: impl FnMut(&SessionState),
    ) -> Result<(), SessionError> {
        let (ticket, request) = self.begin_send(text)?;
        self.drive(ticket, request, &mut observe).await
    }

    /// Ask the planning assistant to revise the current proposal
    pub async fn refine(
        &mut self,
        text: impl Into<String>,
        mut observe: impl FnMut(&SessionState),
    ) -> Result<(), SessionError> {
        let (ticket, request) = self.begin_refine(text)?;
        self.drive(ticket, request, &mut observe).await
    }

    /// Start a turn without driving it. The caller opens `StreamRequest`
    /// and reports back through the `on_*` callbacks with the ticket.
    pub fn begin_send(&mut self, text: impl Into<String>) -> Result<(TurnTicket, StreamRequest), SessionError> {
        self.ensure_idle()?;
        let text = text.into();
        let request = turn_request(self.variant, &text, &self.state.conversation);

        self.state.begin_turn();
        Ok((self.open_turn(text), request))
    }

    pub fn begin_refine(&mut self, text: impl Into<String>) -> Result<(TurnTicket, StreamRequest), SessionError> {
        self.ensure_idle()?;
        let Some(proposal) = self.state.proposal.clone() else {
            return Err(self.reject_locally(NO_PROPOSAL));
        };
        let text = text.into();
        let Some(request) = refine_request(self.variant, &text, &proposal, &self.state.conversation) else {
            return Err(self.reject_locally(REFINE_UNSUPPORTED));
        };

        self.state.begin_turn();
        // The proposal under revision stays visible until a new one replaces it
        self.state.proposal = Some(proposal);
        Ok((self.open_turn(text), request))
    }

    /// Feed transport bytes for a turn.
    ///
    /// Returns the turn status after the bytes were applied, or `None` when
    /// the ticket is stale or the turn already closed.
    pub fn on_chunk(&mut self, ticket: &TurnTicket, bytes: &[u8]) -> Option<TurnStatus> {
        if !self.is_current(ticket, "chunk") {
            return None;
        }
        let variant = self.variant;
        let turn = self.active.as_mut()?;

        let frames = turn.decoder.feed(bytes);
        let mut status = turn.accumulator.status();
        for frame in frames {
            let event = match route(variant, &frame) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(generation = ticket.generation, event = e.event(), error = %e, "Dropping frame");
                    continue;
                }
            };
            tracing::debug!(generation = ticket.generation, event = event.name(), "Applying event");
            status = turn.accumulator.apply(&mut self.state, event);
            if status != TurnStatus::Open {
                break;
            }
        }

        if status != TurnStatus::Open {
            self.close_turn(status);
        }
        Some(status)
    }

    /// The transport closed cleanly
    pub fn on_stream_end(&mut self, ticket: &TurnTicket) -> Option<TurnStatus> {
        if !self.is_current(ticket, "stream end") {
            return None;
        }
        let variant = self.variant;
        let turn = self.active.as_mut()?;

        // A final frame without its trailing blank line still counts
        let mut status = turn.accumulator.status();
        for frame in turn.decoder.finish() {
            match route(variant, &frame) {
                Ok(Some(event)) => status = turn.accumulator.apply(&mut self.state, event),
                Ok(None) => {}
                Err(e) => tracing::warn!(generation = ticket.generation, error = %e, "Dropping final frame"),
            }
        }
        if status == TurnStatus::Open {
            status = turn.accumulator.finish_stream(&mut self.state);
        }

        self.close_turn(status);
        Some(status)
    }

    /// The transport failed before or while streaming
    pub fn on_transport_error(&mut self, ticket: &TurnTicket, error: &ClientError) -> Option<TurnStatus> {
        if !self.is_current(ticket, "transport error") {
            return None;
        }
        let turn = self.active.as_mut()?;
        tracing::error!(generation = ticket.generation, kind = ?error.kind, error = %error, "Turn transport failed");

        let status = turn.accumulator.fail(&mut self.state, TRANSPORT_FAILED);
        self.close_turn(status);
        Some(status)
    }

    /// Drop all session state. Callbacks for an in-flight turn become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.active = None;
        self.state = SessionState::default();
        tracing::info!(generation = self.generation, "Session reset");
    }

    async fn drive(
        &mut self,
        ticket: TurnTicket,
        request: StreamRequest,
        observe: &mut impl FnMut(&SessionState),
    ) -> Result<(), SessionError> {
        observe(&self.state);
        let mut stream = match self.transport.open_stream(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.on_transport_error(&ticket, &e);
                observe(&self.state);
                return Err(e.into());
            }
        };

        let mut status = TurnStatus::Open;
        while let Some(chunk) = stream.next().await {
            let applied = match chunk {
                Ok(bytes) => self.on_chunk(&ticket, &bytes),
                Err(e) => {
                    self.on_transport_error(&ticket, &e);
                    observe(&self.state);
                    return Err(e.into());
                }
            };
            observe(&self.state);
            match applied {
                Some(TurnStatus::Open) => {}
                Some(closed) => {
                    status = closed;
                    break;
                }
                None => break,
            }
        }
        if status == TurnStatus::Open {
            if let Some(closed) = self.on_stream_end(&ticket) {
                status = closed;
                observe(&self.state);
            }
        }

        match status {
            TurnStatus::Aborted => Err(SessionError::Protocol(self.state.error.clone().unwrap_or_default())),
            _ => Ok(()),
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.state.is_processing {
            tracing::debug!(generation = self.generation, "Rejecting request while a turn is in progress");
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    fn reject_locally(&mut self, message: &str) -> SessionError {
        self.state.error = Some(message.to_string());
        SessionError::Validation(message.to_string())
    }

    fn open_turn(&mut self, input: String) -> TurnTicket {
        self.generation += 1;
        tracing::info!(generation = self.generation, variant = %self.variant, "Turn started");
        self.active = Some(ActiveTurn {
            generation: self.generation,
            decoder: FrameDecoder::new(),
            accumulator: TurnAccumulator::new(self.variant, input),
        });
        TurnTicket {
            generation: self.generation,
        }
    }

    fn is_current(&self, ticket: &TurnTicket, what: &'static str) -> bool {
        let current = self
            .active
            .as_ref()
            .is_some_and(|turn| turn.generation == ticket.generation && turn.accumulator.is_open());
        if !current {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                what,
                "Ignoring callback for stale turn"
            );
        }
        current
    }

    fn close_turn(&mut self, status: TurnStatus) {
        if let Some(turn) = self.active.take() {
            tracing::info!(
                generation = turn.generation,
                ?status,
                dropped_frames = turn.decoder.dropped(),
                history = self.state.conversation.len(),
                "Turn finished"
            );
        }
    }

    // ========================================================================
    // Proposal lifecycle
    // ========================================================================

    /// Persist the current proposal
    pub async fn accept(&mut self) -> Result<AcceptOutcome, SessionError> {
        let Some(proposal) = self.state.proposal.as_ref() else {
            return Err(self.reject_locally(NO_PROPOSAL));
        };
        self.ensure_idle()?;
        let (endpoint, body) = accept_request(self.variant, proposal);

        tracing::info!(
            endpoint = endpoint.path(),
            workouts = proposal.items.len(),
            deletions = proposal.deletions.len(),
            "Accepting proposal"
        );
        match self.transport.post_json(endpoint, &body).await {
            Ok(response) => {
                self.state.proposal = None;
                self.state.error = None;
                self.invalidations
                    .publish(&[Invalidation::PlannedWorkouts, Invalidation::Calendar]);
                Ok(AcceptOutcome::from_response(response))
            }
            Err(e) => {
                tracing::error!(kind = ?e.kind, error = %e, "Accepting proposal failed");
                self.state.error = Some(format!("Failed to accept proposal: {e}"));
                Err(e.into())
            }
        }
    }

    /// Discard the current proposal or question without telling the server
    pub fn reject(&mut self) {
        self.state.proposal = None;
        self.state.pending_question = None;
    }
}
