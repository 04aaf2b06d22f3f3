//! Line-oriented terminal front-end
//!
//! Reads commands from stdin and renders the session as plain text.
//! Narration and tool activity are printed while the reply streams in.

use crate::client::Transport;
use crate::protocol::{calendar_day, AcceptOutcome, ConversationTurn, ProgressKind, Proposal, Role};
use crate::runtime::{ProgressMonitor, ProgressState, SessionController, SessionError};
use crate::state_machine::{SessionPhase, SessionState};
use chrono::NaiveDate;
use std::borrow::Cow;
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Type a message to talk to the assistant.
  /refine <text>        revise the current proposal (planning)
  /accept               save the current proposal
  /reject               discard the current proposal or question
  /reset                start a new session
  /history              show the conversation so far
  /import [YYYY-MM-DD]  import FIT files, optionally from a date
  /recalculate          recompute fitness metrics
  /quit                 exit
Ctrl-C stops a running import or recalculation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Refine(String),
    Accept,
    Reject,
    Reset,
    History,
    Import(Option<NaiveDate>),
    Recalculate,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(if line.is_empty() {
            Command::Empty
        } else {
            Command::Send(line.to_string())
        });
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg) {
        ("refine", "") => Err("Usage: /refine <what to change>".to_string()),
        ("refine", text) => Ok(Command::Refine(text.to_string())),
        ("accept", "") => Ok(Command::Accept),
        ("reject", "") => Ok(Command::Reject),
        ("reset", "") => Ok(Command::Reset),
        ("history", "") => Ok(Command::History),
        ("import", "") => Ok(Command::Import(None)),
        ("import", date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|d| Command::Import(Some(d)))
            .map_err(|_| format!("Not a date: {date} (expected YYYY-MM-DD)")),
        ("recalculate", "") => Ok(Command::Recalculate),
        ("help", "") => Ok(Command::Help),
        ("quit" | "exit", "") => Ok(Command::Quit),
        _ => Err(format!("Unknown command: /{rest} (try /help)")),
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Proposal dates normalized to the calendar day, or verbatim when the
/// model wrote something else
fn day_label(raw: &str) -> Cow<'_, str> {
    match calendar_day(raw) {
        Some(day) => Cow::Owned(day.to_string()),
        None => Cow::Borrowed(raw),
    }
}

pub fn render_proposal(proposal: &Proposal) -> String {
    if proposal.is_empty() {
        return "The proposal has no changes. /reject to dismiss it".to_string();
    }
    let mut out = String::from("Proposed changes:\n");
    for item in &proposal.items {
        let marker = match item.existing_workout_id {
            Some(id) => format!("~ #{id}"),
            None => "+".to_string(),
        };
        let _ = write!(
            out,
            "  {marker} {} {}: {} ({} min",
            day_label(&item.date),
            item.activity_type,
            item.title,
            item.target_duration_minutes
        );
        if let Some(tss) = item.target_tss {
            let _ = write!(out, ", TSS {tss}");
        }
        out.push_str(")\n");
    }
    for deletion in &proposal.deletions {
        let _ = writeln!(
            out,
            "  - #{} {} {}",
            deletion.workout_id,
            day_label(&deletion.date),
            deletion.title
        );
    }
    out.push_str("/accept to save, /reject to discard");
    out
}

pub fn render_accept(outcome: &AcceptOutcome) -> String {
    if let Some(message) = &outcome.message {
        return message.clone();
    }
    let counts = [
        ("created", outcome.created_ids.len()),
        ("updated", outcome.updated_ids.len()),
        ("deleted", outcome.deleted_ids.len()),
    ];
    let mut parts: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(what, n)| format!("{n} {what}"))
        .collect();
    if parts.is_empty() {
        // The planning endpoint answers with the saved workouts
        if let Some(saved) = outcome.raw.as_array() {
            parts.push(format!("{} workouts", saved.len()));
        }
    }
    if parts.is_empty() {
        "Proposal saved.".to_string()
    } else {
        format!("Proposal saved: {}.", parts.join(", "))
    }
}

pub fn render_history(conversation: &[ConversationTurn]) -> String {
    if conversation.is_empty() {
        return "(no messages yet)".to_string();
    }
    let mut out = String::new();
    for turn in conversation {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "coach",
        };
        let _ = writeln!(out, "{who}> {}", turn.content);
        for call in &turn.tool_calls {
            let _ = writeln!(out, "      used {}", call.tool_name);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn render_progress(kind: ProgressKind, state: &ProgressState) -> String {
    let mut out = match state.total {
        Some(total) => format!("[{}/{total}] {}", state.processed, kind.as_str()),
        None => format!("[{}] {}", state.processed, kind.as_str()),
    };
    if kind == ProgressKind::Import {
        let _ = write!(
            out,
            ": imported {}, skipped {}, errors {}",
            state.imported, state.skipped, state.errors
        );
    }
    if let Some(item) = &state.last_item {
        let _ = write!(out, " ({item})");
    }
    if let Some(error) = &state.error {
        let _ = write!(out, " - {error}");
    } else if state.summary.is_some() {
        out.push_str(" - done");
    }
    out
}

/// Narration line to print when it changed since `previous`
fn live_line(previous: &SessionState, current: &SessionState) -> Option<String> {
    if current.active_tool_call != previous.active_tool_call {
        if let Some(call) = &current.active_tool_call {
            return Some(format!("  ... {}", call.tool_name));
        }
    }
    if current.thinking_message != previous.thinking_message {
        if let Some(message) = &current.thinking_message {
            return Some(format!("  ... {message}"));
        }
    }
    None
}

// ============================================================================
// Console
// ============================================================================

pub struct Console<T: Transport + 'static> {
    session: SessionController<T>,
    progress: ProgressMonitor<T>,
}

impl<T: Transport + 'static> Console<T> {
    pub fn new(session: SessionController<T>, progress: ProgressMonitor<T>) -> Self {
        Self { session, progress }
    }

    pub async fn run(mut self) -> std::io::Result<()> {
        println!("Trainy {} assistant. /help for commands.", self.session.variant());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            };

            match command {
                Command::Empty => {}
                Command::Help => println!("{HELP}"),
                Command::Quit => break,
                Command::Send(text) => self.run_turn(text, false).await,
                Command::Refine(text) => self.run_turn(text, true).await,
                Command::Accept => match self.session.accept().await {
                    Ok(outcome) => println!("{}", render_accept(&outcome)),
                    Err(e) => println!("error: {e}"),
                },
                Command::Reject => {
                    self.session.reject();
                    println!("Discarded.");
                }
                Command::Reset => {
                    self.session.reset();
                    println!("New session.");
                }
                Command::History => println!("{}", render_history(&self.session.state().conversation)),
                Command::Import(from_date) => self.run_progress(ProgressKind::Import, from_date).await,
                Command::Recalculate => self.run_progress(ProgressKind::Recalculate, None).await,
            }
        }
        Ok(())
    }

    async fn run_turn(&mut self, text: String, refine: bool) {
        let mut last = SessionState::default();
        let narrate = |state: &SessionState| {
            if let Some(line) = live_line(&last, state) {
                println!("{line}");
            }
            last = state.clone();
        };
        let result = if refine {
            self.session.refine(text, narrate).await
        } else {
            self.session.send(text, narrate).await
        };

        match result {
            Err(e @ SessionError::Busy) => {
                println!("error: {e}");
                return;
            }
            Err(e) => tracing::debug!(error = %e, "Turn did not complete"),
            Ok(()) => {}
        }

        let state = self.session.state();
        match state.phase() {
            SessionPhase::Errored => println!("error: {}", state.error.as_deref().unwrap_or_default()),
            SessionPhase::Sending => {}
            SessionPhase::Idle => {
                if let Some(reply) = state.conversation.last() {
                    println!("coach> {}", reply.content);
                }
                if let Some(question) = &state.pending_question {
                    if let Some(options) = &question.options {
                        println!("  options: {}", options.join(" | "));
                    }
                }
                if let Some(proposal) = &state.proposal {
                    println!("{}", render_proposal(proposal));
                }
            }
        }
    }

    async fn run_progress(&mut self, kind: ProgressKind, from_date: Option<NaiveDate>) {
        self.progress.start(kind, from_date);
        loop {
            tokio::select! {
                update = self.progress.next_update() => match update {
                    Some(state) => println!("{}", render_progress(kind, &state)),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    self.progress.cancel();
                    println!("{}", render_progress(kind, self.progress.state()));
                    break;
                }
            }
        }
    }
}
