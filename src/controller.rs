//! Conversational session controller
//!
//! [`ChatController`] owns the live chat state of one user: the active
//! session, its transcript, the composer buffer, the dispatch and dictation
//! states and the queue of user-facing notices. It composes the session
//! building blocks and coordinates session creation, switching and deletion.
//!
//! State lives behind a mutex that is never held across an `.await`, so a
//! send waiting on the backend does not block a concurrent session switch.
//! Every backend result is checked against the session epoch it was issued
//! under before it touches the live state.

use crate::backend::Backend;
use crate::config::ChatConfig;
use crate::dictation::{
    merge_dictated, CaptureEvents, DictationController, DictationState, DictationUpdate,
    SpeechCapability, SpeechEvent,
};
use crate::error::{MedchatError, Result};
use crate::session::dispatch::Exchange;
use crate::session::identity::create_session;
use crate::session::{
    validate_input, BusyTracker, DispatchPipeline, DispatchState, DispatchTicket, HistoryLoader,
    Message, Notice, PointerStore, SendOutcome, SessionIdentityManager, SessionSummary,
    StartupSession, User,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

struct ControllerState {
    identity: SessionIdentityManager,
    /// Incremented on every active-session change
    epoch: u64,
    transcript: Vec<Message>,
    busy: BusyTracker,
    dictation: DictationController,
    composer: String,
    notices: VecDeque<Notice>,
}

impl ControllerState {
    fn is_current(&self, ticket: &DispatchTicket) -> bool {
        self.epoch == ticket.epoch && self.identity.active() == Some(ticket.session_id.as_str())
    }

    /// Make `session_id` active and reset everything scoped to the old one
    ///
    /// The pointer write is synchronous and happens under the state lock, so
    /// pointer order always matches activation order. With a SQLite store it
    /// blocks the calling task for one small upsert.
    fn activate(&mut self, session_id: &str) -> u64 {
        self.identity.on_session_changed(session_id);
        self.epoch += 1;
        self.transcript.clear();
        self.busy.reset();
        self.dictation.reset();
        self.composer.clear();
        self.epoch
    }
}

/// Effect of a session deletion on the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRemoval {
    /// Another session was deleted; nothing changed
    Unaffected,
    /// The active session was deleted and this new session replaced it
    Replaced(String),
    /// The active session was deleted but no new session could be created;
    /// an error notice was queued
    ReplacementFailed,
}

/// Releases the dispatch state when a send ends, however it ends
struct DispatchRelease<'a> {
    state: &'a Mutex<ControllerState>,
    ticket: DispatchTicket,
}

impl Drop for DispatchRelease<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.busy.release(&self.ticket);
    }
}

fn lock(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session controller for one signed-in user
pub struct ChatController {
    user: User,
    backend: Arc<dyn Backend>,
    loader: HistoryLoader,
    pipeline: DispatchPipeline,
    state: Mutex<ControllerState>,
}

impl ChatController {
    /// Establish the active session and build the controller
    ///
    /// Resumes the session named by the durable pointer (loading its
    /// history) or asks the backend for a new one.
    ///
    /// # Errors
    ///
    /// Returns `MedchatError::SessionCreation` if no pointer exists and the
    /// backend cannot create a session; no conversation can start then.
    pub async fn start(
        user: User,
        backend: Arc<dyn Backend>,
        pointers: Arc<dyn PointerStore>,
        speech: SpeechCapability,
        replies: ChatConfig,
    ) -> Result<Self> {
        let mut identity = SessionIdentityManager::new(user.id.clone(), pointers);
        let startup = identity.initialize(backend.as_ref()).await?;

        let loader = HistoryLoader::new(Arc::clone(&backend));
        let mut notices = VecDeque::new();
        let transcript = match &startup {
            StartupSession::Resumed(id) => {
                let loaded = loader.load(id).await;
                notices.extend(loaded.notice);
                loaded.messages
            }
            StartupSession::Created(_) => Vec::new(),
        };

        let pipeline = DispatchPipeline::new(Arc::clone(&backend), user.id.clone(), replies);

        Ok(Self {
            user,
            backend,
            loader,
            pipeline,
            state: Mutex::new(ControllerState {
                identity,
                epoch: 1,
                transcript,
                busy: BusyTracker::new(),
                dictation: DictationController::new(speech),
                composer: String::new(),
                notices,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        lock(&self.state)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Id of the active session
    pub fn active_session(&self) -> Option<String> {
        self.state().identity.active().map(str::to_string)
    }

    /// Snapshot of the live transcript
    pub fn transcript(&self) -> Vec<Message> {
        self.state().transcript.clone()
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.state().busy.state()
    }

    /// True while a send is in flight; disables the composer
    pub fn is_busy(&self) -> bool {
        self.state().busy.is_busy()
    }

    pub fn dictation_state(&self) -> DictationState {
        self.state().dictation.state()
    }

    pub fn composer(&self) -> String {
        self.state().composer.clone()
    }

    pub fn set_composer(&self, text: impl Into<String>) {
        self.state().composer = text.into();
    }

    /// Drain queued notices, oldest first
    pub fn take_notices(&self) -> Vec<Notice> {
        self.state().notices.drain(..).collect()
    }

    /// Send one message in the active session
    ///
    /// Appends the user message immediately, queries the backend and appends
    /// exactly one reply (real, fallback or synthetic failure). If the active
    /// session changed while the query was in flight the reply is dropped
    /// from the live view; it is still saved under its own session.
    ///
    /// # Errors
    ///
    /// - `MedchatError::Validation` for blank input (nothing is sent)
    /// - `MedchatError::NoActiveSession` if no session is active
    pub async fn send(&self, raw: &str) -> Result<SendOutcome> {
        let text = validate_input(raw)?;

        let ticket = {
            let mut state = self.state();
            let session_id = state
                .identity
                .active()
                .ok_or(MedchatError::NoActiveSession)?
                .to_string();
            let ticket = DispatchTicket {
                session_id,
                epoch: state.epoch,
            };
            if !state.busy.try_begin(&ticket) {
                tracing::debug!("Send ignored: a message is already in flight");
                return Ok(SendOutcome::Busy);
            }
            state.transcript.push(Message::user(text.clone()));
            ticket
        };
        let _release = DispatchRelease {
            state: &self.state,
            ticket: ticket.clone(),
        };

        let exchange = self.pipeline.exchange(&ticket, &text).await;

        let mut state = self.state();
        if !state.is_current(&ticket) {
            tracing::info!(
                "Discarding reply for session {}: no longer active",
                ticket.session_id
            );
            return Ok(SendOutcome::Discarded);
        }

        let outcome = match exchange {
            Exchange::Answered(reply) => {
                state.transcript.push(reply.clone());
                SendOutcome::Delivered(reply)
            }
            Exchange::Unreachable(reply) => {
                state.transcript.push(reply.clone());
                SendOutcome::Failed(reply)
            }
        };
        drop(state);
        Ok(outcome)
    }

    /// Send the composer contents, clearing the composer
    pub async fn submit_composer(&self) -> Result<SendOutcome> {
        let text = {
            let mut state = self.state();
            if state.busy.is_busy() {
                return Ok(SendOutcome::Busy);
            }
            std::mem::take(&mut state.composer)
        };
        self.send(&text).await
    }

    /// Start a fresh session and make it active
    ///
    /// # Errors
    ///
    /// Returns `MedchatError::SessionCreation` if the backend cannot create
    /// a session; the current session stays active.
    pub async fn new_session(&self) -> Result<String> {
        let session_id = match create_session(self.backend.as_ref(), &self.user.id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to create session: {:#}", e);
                self.state()
                    .notices
                    .push_back(Notice::error("Could not start a new chat", e.to_string()));
                return Err(e);
            }
        };

        let mut state = self.state();
        state.activate(&session_id);
        state.notices.push_back(Notice::info(
            "New chat started",
            "You can now start a fresh conversation.",
        ));
        tracing::info!("Switched to new session {}", session_id);
        Ok(session_id)
    }

    /// Make an existing session active and load its transcript
    pub async fn switch_session(&self, session_id: &str) -> Result<()> {
        let epoch = self.state().activate(session_id);
        tracing::info!("Switched to session {}", session_id);

        let loaded = self.loader.load(session_id).await;

        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!("Dropping history of {}: session changed again", session_id);
            return Ok(());
        }
        // Messages sent while the history was loading follow it.
        let sent_meanwhile = std::mem::replace(&mut state.transcript, loaded.messages);
        state.transcript.extend(sent_meanwhile);
        state.notices.extend(loaded.notice);
        Ok(())
    }

    /// React to a session being deleted elsewhere
    ///
    /// Deleting the active session starts a new one; any other deletion has
    /// no effect.
    pub async fn on_session_deleted(&self, session_id: &str) -> SessionRemoval {
        let is_active = self.state().identity.active() == Some(session_id);
        if !is_active {
            return SessionRemoval::Unaffected;
        }
        match self.new_session().await {
            Ok(id) => SessionRemoval::Replaced(id),
            Err(_) => SessionRemoval::ReplacementFailed,
        }
    }

    /// Delete a session on the backend, then apply the deletion locally
    ///
    /// # Errors
    ///
    /// Fails only when the backend refuses the deletion. A deleted active
    /// session that could not be replaced is reported as
    /// [`SessionRemoval::ReplacementFailed`].
    pub async fn delete_session(&self, session_id: &str) -> Result<SessionRemoval> {
        self.backend.delete_session(session_id).await?;
        tracing::info!("Deleted session {}", session_id);
        Ok(self.on_session_deleted(session_id).await)
    }

    /// Sessions of the current user, newest first
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.backend.list_sessions(&self.user.id).await
    }

    /// Clear the live transcript; stored history is untouched
    pub fn clear_view(&self) {
        let mut state = self.state();
        state.transcript.clear();
        state.notices.push_back(Notice::info(
            "Chat cleared",
            "All messages have been removed from view.",
        ));
    }

    /// Begin voice dictation
    ///
    /// Returns the capture's event stream, or `None` if already listening.
    /// Pump its events into [`ChatController::handle_dictation_event`].
    ///
    /// # Errors
    ///
    /// `MedchatError::DictationUnsupported` or `MedchatError::DictationCapture`;
    /// a notice is queued for either.
    pub fn start_dictation(&self) -> Result<Option<CaptureEvents>> {
        let mut state = self.state();
        match state.dictation.start() {
            Ok(Some(events)) => {
                state.notices.push_back(Notice::info(
                    "Listening...",
                    "Speak your medical query now.",
                ));
                Ok(Some(events))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                let notice = match e.downcast_ref::<MedchatError>() {
                    Some(MedchatError::DictationUnsupported) => Notice::error(
                        "Voice input not supported",
                        "No speech recognizer is configured on this system.",
                    ),
                    _ => Notice::error("Voice input failed", e.to_string()),
                };
                state.notices.push_back(notice);
                Err(e)
            }
        }
    }

    /// Cancel dictation without merging anything
    pub fn stop_dictation(&self) -> bool {
        self.state().dictation.stop()
    }

    /// Apply one event of capture `capture_id`
    pub fn handle_dictation_event(&self, capture_id: u64, event: SpeechEvent) -> DictationUpdate {
        let mut state = self.state();
        let update = state.dictation.handle_event(capture_id, event);
        match &update {
            DictationUpdate::Recognized(text) => {
                state.composer = merge_dictated(&state.composer, text);
                state
                    .notices
                    .push_back(Notice::info("Voice input captured", text.clone()));
            }
            DictationUpdate::Failed(_) => {
                state.notices.push_back(Notice::error(
                    "Voice input failed",
                    "Please try again or check microphone permissions.",
                ));
                state.dictation.recover();
            }
            DictationUpdate::Ended | DictationUpdate::Ignored => {}
        }
        update
    }
}
