//! Session controller: transcript ownership and the request lifecycle.
//!
//! # Turns
//!
//! Every accepted `submit` starts a *turn*: append the user message, send
//! one request, append the reply (or a synthesized failure reply), reveal it.
//! A turn runs as one spawned task and moves the session through
//! `Idle → Requesting → Revealing → Idle`.
//!
//! # Single flight
//!
//! Only one turn is live at a time. A new `submit` (or `reset`) cancels the
//! live turn before anything else happens:
//!
//! - the turn's [`CancellationToken`] fires, which drops the in-flight HTTP
//!   future or the pending reveal timer inside the task's `select!`;
//! - the session generation is bumped, so anything the old task still tries
//!   to apply is discarded;
//! - a turn cancelled while `Requesting` withdraws its unanswered user
//!   message, so every user message in the transcript is followed by exactly
//!   one assistant message;
//! - a turn cancelled while `Revealing` has its reply snapped to the full
//!   text, so at most one message is ever revealing.
//!
//! Session state lives behind a `std::sync::Mutex` that is never held across
//! an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lexa_core::models::failure::FailureKind;
use lexa_core::models::message::{Message, MessageId};
use lexa_core::validation::{QueryLimits, ValidationError};
use lexa_storage::SessionStore;
use lexa_storage::error::StorageError;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::client::{ConsultClient, ConsultRequest};
use crate::error::ConsultError;
use crate::reveal::{Reveal, RevealPacing};

/// Default bound on a single consultation request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub request_timeout: Duration,
    pub limits: QueryLimits,
    pub pacing: RevealPacing,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            limits: QueryLimits::default(),
            pacing: RevealPacing::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Phase {
    Idle,
    Requesting,
    Revealing,
}

/// Everything a front end needs to render the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub transcript: Vec<Message>,
    pub phase: Phase,
    pub error: Option<FailureKind>,
}

struct ActiveTurn {
    generation: u64,
    cancel: CancellationToken,
    user_message: MessageId,
}

struct SessionState {
    transcript: Vec<Message>,
    phase: Phase,
    error: Option<FailureKind>,
    generation: u64,
    active: Option<ActiveTurn>,
}

impl SessionState {
    /// End the live turn, if any, cancelling whatever it still has pending
    /// and leaving the transcript consistent.
    fn end_turn(&mut self) -> bool {
        let Some(turn) = self.active.take() else {
            return false;
        };
        turn.cancel.cancel();

        match self.phase {
            Phase::Requesting => {
                if self
                    .transcript
                    .last()
                    .is_some_and(|m| m.id == turn.user_message)
                {
                    self.transcript.pop();
                }
            }
            Phase::Revealing => {
                for message in self.transcript.iter_mut().filter(|m| m.is_revealing()) {
                    message.finish_reveal();
                }
            }
            Phase::Idle => {}
        }

        self.phase = Phase::Idle;
        debug!(generation = turn.generation, "turn ended");
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|turn| turn.generation == generation)
    }
}

struct Shared<C> {
    client: C,
    config: SessionConfig,
    user_id: String,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

impl<C> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id.clone(),
            transcript: state.transcript.clone(),
            phase: state.phase,
            error: state.error.clone(),
        }
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(self.snapshot_of(state));
    }
}

/// Releases the turn on every exit path of its task, including abort.
struct TurnGuard<C> {
    shared: Arc<Shared<C>>,
    generation: u64,
}

impl<C> Drop for TurnGuard<C> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.is_current(self.generation) {
            state.end_turn();
            self.shared.publish(&state);
        }
    }
}

/// Owns one conversation and its single in-flight consultation.
///
/// Cheap to clone; clones share the same session. `submit` spawns onto the
/// ambient tokio runtime and must be called from within one.
pub struct SessionController<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for SessionController<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ConsultClient> SessionController<C> {
    pub fn new(client: C, user_id: impl Into<String>, config: SessionConfig) -> Self {
        let user_id = user_id.into();
        let (updates, _) = watch::channel(SessionSnapshot {
            user_id: user_id.clone(),
            transcript: Vec::new(),
            phase: Phase::Idle,
            error: None,
        });

        Self {
            shared: Arc::new(Shared {
                client,
                config,
                user_id,
                state: Mutex::new(SessionState {
                    transcript: Vec::new(),
                    phase: Phase::Idle,
                    error: None,
                    generation: 0,
                    active: None,
                }),
                updates,
            }),
        }
    }

    /// Build a controller whose session identifier is read from (or created
    /// in) `store`.
    pub fn with_store(
        client: C,
        store: &dyn SessionStore,
        config: SessionConfig,
    ) -> Result<Self, StorageError> {
        let user_id = lexa_storage::session::session_id(store)?;
        Ok(Self::new(client, user_id, config))
    }

    pub fn user_id(&self) -> &str {
        &self.shared.user_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Start a consultation turn for `query`.
    ///
    /// Empty input is rejected without touching the session. Oversized input
    /// is rejected and recorded as the session error. Either way nothing is
    /// sent. An accepted query cancels and replaces whatever turn is live.
    pub fn submit(&self, query: &str) -> Result<(), ValidationError> {
        let query = match self.shared.config.limits.validate(query) {
            Ok(query) => query.to_string(),
            Err(ValidationError::Empty) => return Err(ValidationError::Empty),
            Err(err) => {
                let mut state = self.shared.lock();
                state.error = Some(FailureKind::Validation {
                    reason: err.to_string(),
                });
                self.shared.publish(&state);
                warn!(error = %err, "query rejected");
                return Err(err);
            }
        };

        let mut state = self.shared.lock();
        if state.end_turn() {
            info!("superseding live consultation turn");
        }

        state.generation += 1;
        let generation = state.generation;
        let user_message = Message::user(query.clone());
        let cancel = CancellationToken::new();

        state.active = Some(ActiveTurn {
            generation,
            cancel: cancel.clone(),
            user_message: user_message.id,
        });
        state.transcript.push(user_message);
        state.error = None;
        state.phase = Phase::Requesting;
        self.shared.publish(&state);
        drop(state);

        info!(generation, query_len = query.len(), "consultation submitted");

        let request = ConsultRequest {
            query,
            user_id: self.shared.user_id.clone(),
        };
        tokio::spawn(run_turn(Arc::clone(&self.shared), generation, cancel, request));
        Ok(())
    }

    /// Cancel any live turn and clear the transcript and error state.
    ///
    /// Safe to call repeatedly. The session identifier is kept.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        let halted = state.end_turn();
        state.generation += 1;
        state.transcript.clear();
        state.error = None;
        state.phase = Phase::Idle;
        self.shared.publish(&state);
        info!(halted, "session reset");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.lock();
        self.shared.snapshot_of(&state)
    }

    /// Receiver that sees a fresh snapshot after every session mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until no turn is live, returning the snapshot at that point.
    pub async fn wait_idle(&self) -> SessionSnapshot {
        let mut updates = self.subscribe();
        match updates.wait_for(|s| s.phase == Phase::Idle).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

async fn run_turn<C: ConsultClient>(
    shared: Arc<Shared<C>>,
    generation: u64,
    cancel: CancellationToken,
    request: ConsultRequest,
) {
    let _guard = TurnGuard {
        shared: Arc::clone(&shared),
        generation,
    };
    let timeout = shared.config.request_timeout;

    let outcome = tokio::select! {
        _ = cancel.cancelled() => return,
        result = tokio::time::timeout(timeout, shared.client.consult(&request)) => {
            result.unwrap_or(Err(ConsultError::Timeout(timeout)))
        }
    };

    let (text, failure) = match outcome {
        Ok(text) => (text, None),
        Err(err) => match err.failure_kind() {
            Some(kind) => {
                warn!(generation, error = %err, "consultation failed");
                (kind.user_message(), Some(kind))
            }
            None => {
                debug!(generation, "consultation cancelled by client");
                return;
            }
        },
    };

    let message_id = {
        let mut state = shared.lock();
        if !state.is_current(generation) || cancel.is_cancelled() {
            return;
        }
        let message = Message::assistant(text.clone());
        let id = message.id;
        state.transcript.push(message);
        // A success keeps any error recorded while the request was in flight.
        if let Some(kind) = failure {
            state.error = Some(kind);
        }
        state.phase = Phase::Revealing;
        shared.publish(&state);
        id
    };

    reveal_message(&shared, generation, &cancel, message_id, &text).await;
}

async fn reveal_message<C>(
    shared: &Shared<C>,
    generation: u64,
    cancel: &CancellationToken,
    message_id: MessageId,
    text: &str,
) {
    let pacing = shared.config.pacing;
    let mut reveal = Reveal::new(text, pacing.batch_tokens);
    debug!(generation, steps = reveal.remaining_steps(), "reveal started");

    while let Some(len) = reveal.advance() {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(pacing.delay) => {}
        }

        let mut state = shared.lock();
        if !state.is_current(generation) {
            return;
        }
        if let Some(message) = state.transcript.iter_mut().rev().find(|m| m.id == message_id) {
            message.reveal_to(len);
        }
        shared.publish(&state);
    }

    debug!(generation, "reveal complete");
}
