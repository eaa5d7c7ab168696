//! Drives one conversation: validates input, records each turn in the
//! transcript, sends the history to the chat backend and settles the
//! pending reply when the backend answers.
//!
//! A turn moves `Idle -> Submitted -> AwaitingReply -> Resolved | Failed`.
//! `Submitted` only exists inside [`Coordinator::submit`]; `Resolved` and
//! `Failed` show up as the final [`Message`] of the turn.
//!
//! Only one turn is in flight at a time. A submit while a reply is
//! outstanding is refused and leaves the input buffer alone.
//!
//! Whether a reply gets narrated is fixed when its turn is submitted;
//! toggling voice mid-request only affects later turns.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::ai::ChatBackend;
use crate::error::ChatError;
use crate::narrator::Narrator;
use crate::state::{Message, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingReply,
}

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    Resolved {
        reply: String,
        /// Present when voice was on. Dropping it leaves narration running.
        narration: Option<JoinHandle<()>>,
    },
    Failed {
        reason: String,
    },
}

/// The request behind the current `AwaitingReply` turn.
struct InFlight {
    turn: u64,
    task: JoinHandle<Result<String, ChatError>>,
    narrate: bool,
}

pub struct Coordinator {
    transcript: Transcript,
    backend: Arc<dyn ChatBackend>,
    narrator: Narrator,
    voice_enabled: bool,
    in_flight: Option<InFlight>,
    next_turn: u64,
    reply_signal: Option<mpsc::UnboundedSender<u64>>,
}

impl Coordinator {
    pub fn new(backend: Arc<dyn ChatBackend>, narrator: Narrator, voice_enabled: bool) -> Self {
        Self {
            transcript: Transcript::new(),
            backend,
            narrator,
            voice_enabled,
            in_flight: None,
            next_turn: 1,
            reply_signal: None,
        }
    }

    /// Receives the id of each turn whose request has finished, so the UI
    /// can settle it with [`Coordinator::settle_turn`] right away. Replaces
    /// any earlier subscription.
    pub fn subscribe_replies(&mut self) -> mpsc::UnboundedReceiver<u64> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.reply_signal = Some(tx);
        rx
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> TurnState {
        if self.in_flight.is_some() {
            TurnState::AwaitingReply
        } else {
            TurnState::Idle
        }
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.voice_enabled = enabled;
    }

    /// Flip narration on or off, returning the new setting.
    pub fn toggle_voice(&mut self) -> bool {
        self.voice_enabled = !self.voice_enabled;
        info!(voice = self.voice_enabled, "voice toggled");
        self.voice_enabled
    }

    /// Start a turn with the contents of `input`.
    ///
    /// Returns `false` (and changes nothing) for blank input or while a
    /// previous reply is still outstanding. On success `input` is cleared.
    pub fn submit(&mut self, input: &mut String) -> bool {
        if input.trim().is_empty() {
            return false;
        }
        if self.in_flight.is_some() {
            debug!("submit ignored: a reply is still outstanding");
            return false;
        }

        let text = std::mem::take(input);
        let history = self.transcript.history_with(&text);

        if let Err(e) = self
            .transcript
            .append(Message::User(text.clone()))
            .and_then(|_| self.transcript.append(Message::Pending))
        {
            warn!(error = %e, "could not record turn");
            *input = text;
            return false;
        }

        debug!(turns = history.len(), "dispatching chat request");
        let turn = self.next_turn;
        self.next_turn += 1;
        let backend = Arc::clone(&self.backend);
        let reply_signal = self.reply_signal.clone();
        let task = tokio::spawn(async move {
            let result = backend.complete(&history).await;
            if let Some(tx) = reply_signal {
                let _ = tx.send(turn);
            }
            result
        });
        self.in_flight = Some(InFlight {
            turn,
            task,
            narrate: self.voice_enabled,
        });
        true
    }

    /// Settle the outstanding turn if its request has finished. Never waits.
    pub async fn poll_reply(&mut self) -> Option<TurnOutcome> {
        if !self.in_flight.as_ref()?.task.is_finished() {
            return None;
        }
        self.wait_for_reply().await
    }

    /// Settle `turn` after its request reported back. A signal for a turn
    /// that was already settled by polling is ignored.
    pub async fn settle_turn(&mut self, turn: u64) -> Option<TurnOutcome> {
        if self.in_flight.as_ref()?.turn != turn {
            debug!(turn, "stale reply signal");
            return None;
        }
        self.wait_for_reply().await
    }

    /// Wait for the outstanding request and settle the turn. `None` when
    /// nothing is in flight.
    pub async fn wait_for_reply(&mut self) -> Option<TurnOutcome> {
        let InFlight { task, narrate, .. } = self.in_flight.take()?;
        Some(self.finish_turn(task.await, narrate))
    }

    fn finish_turn(
        &mut self,
        joined: Result<Result<String, ChatError>, JoinError>,
        narrate: bool,
    ) -> TurnOutcome {
        let result = joined.map_err(ChatError::from).and_then(|reply| reply);

        let (message, outcome) = match result {
            Ok(reply) => {
                info!(chars = reply.chars().count(), "reply received");
                let narration = if narrate {
                    Some(self.narrator.narrate(reply.clone()))
                } else {
                    None
                };
                (Message::Reply(reply.clone()), TurnOutcome::Resolved { reply, narration })
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                let reason = e.to_string();
                (Message::Failed(reason.clone()), TurnOutcome::Failed { reason })
            }
        };

        if !self.transcript.has_pending() {
            warn!("settling a turn without a pending placeholder");
        }
        if let Err(e) = self.transcript.replace_last(message) {
            warn!(error = %e, "could not settle turn");
        }
        outcome
    }
}
