//! Test utilities for Medchat
//!
//! In-process fakes for the answer backend and the speech recognizer, so
//! controller logic can be driven without a network or a microphone.

use crate::backend::{Backend, HistoryRecord, PersistRequest, QueryRequest, QueryResponse};
use crate::dictation::{SpeechEvent, SpeechRecognizer};
use crate::error::{MedchatError, Result};
use crate::session::SessionSummary;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

#[derive(Default)]
struct FakeState {
    session_ids: VecDeque<String>,
    create_calls: usize,
    fail_create: bool,
    histories: HashMap<String, Vec<HistoryRecord>>,
    history_calls: Vec<String>,
    fail_history: bool,
    persisted: Vec<PersistRequest>,
    fail_persist: bool,
    queries: Vec<QueryRequest>,
    answer: Option<String>,
    fail_query: bool,
    deleted: Vec<String>,
    sessions: Vec<SessionSummary>,
}

/// Scriptable in-memory [`Backend`]
///
/// Queries can be held in flight with [`FakeBackend::hold_queries`] and let
/// through one at a time with [`FakeBackend::release_query`].
pub struct FakeBackend {
    state: Mutex<FakeState>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    history_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                answer: Some("fake answer".to_string()),
                ..FakeState::default()
            }),
            gate: Mutex::new(None),
            history_gate: Mutex::new(None),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend lock poisoned")
    }

    /// History row with a fixed timestamp
    pub fn record(role: &str, message: &str) -> HistoryRecord {
        HistoryRecord {
            role: role.to_string(),
            message: message.to_string(),
            created_at: Some("2025-10-21T10:00:00Z".to_string()),
        }
    }

    pub fn push_session_id(&self, id: &str) {
        self.state().session_ids.push_back(id.to_string());
    }

    pub fn fail_session_creation(&self, fail: bool) {
        self.state().fail_create = fail;
    }

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn set_history(&self, session_id: &str, records: Vec<HistoryRecord>) {
        self.state()
            .histories
            .insert(session_id.to_string(), records);
    }

    pub fn fail_history(&self, fail: bool) {
        self.state().fail_history = fail;
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.state().history_calls.clone()
    }

    pub fn fail_persistence(&self, fail: bool) {
        self.state().fail_persist = fail;
    }

    pub fn persisted(&self) -> Vec<PersistRequest> {
        self.state().persisted.clone()
    }

    /// Wait (up to two seconds) until at least `count` messages were saved
    pub async fn wait_for_persisted(&self, count: usize) -> Vec<PersistRequest> {
        for _ in 0..200 {
            let saved = self.persisted();
            if saved.len() >= count {
                return saved;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} persisted messages, got {:?}",
            count,
            self.persisted()
        );
    }

    pub fn set_answer(&self, answer: Option<&str>) {
        self.state().answer = answer.map(str::to_string);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state().fail_query = fail;
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.state().queries.clone()
    }

    /// Make every following query wait for [`FakeBackend::release_query`]
    pub fn hold_queries(&self) {
        *self.gate.lock().expect("gate lock poisoned") = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held query complete
    pub fn release_query(&self) {
        if let Some(gate) = self.gate.lock().expect("gate lock poisoned").as_ref() {
            gate.add_permits(1);
        }
    }

    /// Make every following history load wait for [`FakeBackend::release_history`]
    pub fn hold_history(&self) {
        *self.history_gate.lock().expect("gate lock poisoned") =
            Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held history load complete
    pub fn release_history(&self) {
        if let Some(gate) = self.history_gate.lock().expect("gate lock poisoned").as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn set_sessions(&self, sessions: Vec<SessionSummary>) {
        self.state().sessions = sessions;
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn create_session(&self, _user_id: &str) -> Result<String> {
        let mut state = self.state();
        state.create_calls += 1;
        if state.fail_create {
            return Err(MedchatError::SessionCreation("backend down".to_string()).into());
        }
        let next = state.create_calls;
        Ok(state
            .session_ids
            .pop_front()
            .unwrap_or_else(|| format!("session_fake_{}", next)))
    }

    async fn load_history(&self, session_id: &str) -> Result<Vec<HistoryRecord>> {
        self.state().history_calls.push(session_id.to_string());

        let gate = self.history_gate.lock().expect("gate lock poisoned").clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| MedchatError::HistoryLoad(e.to_string()))?
                .forget();
        }

        let state = self.state();
        if state.fail_history {
            return Err(MedchatError::HistoryLoad("backend down".to_string()).into());
        }
        Ok(state.histories.get(session_id).cloned().unwrap_or_default())
    }

    async fn persist_message(&self, request: &PersistRequest) -> Result<()> {
        let mut state = self.state();
        if state.fail_persist {
            return Err(MedchatError::Persistence("backend down".to_string()).into());
        }
        state.persisted.push(request.clone());
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        self.state().queries.push(request.clone());

        let gate = self.gate.lock().expect("gate lock poisoned").clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| MedchatError::Query(e.to_string()))?
                .forget();
        }

        let state = self.state();
        if state.fail_query {
            return Err(MedchatError::Query("connection refused".to_string()).into());
        }
        Ok(QueryResponse {
            answer: state.answer.clone(),
            ..QueryResponse::default()
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.state().deleted.push(session_id.to_string());
        Ok(())
    }

    async fn list_sessions(&self, _user_id: &str) -> Result<Vec<SessionSummary>> {
        Ok(self.state().sessions.clone())
    }
}

/// Recognizer that hands its event sender to the test
#[derive(Default)]
pub struct FakeRecognizer {
    sender: Mutex<Option<mpsc::UnboundedSender<SpeechEvent>>>,
    starts: Mutex<usize>,
    stops: Mutex<usize>,
    fail_start: Mutex<bool>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_start(&self, fail: bool) {
        *self.fail_start.lock().expect("lock poisoned") = fail;
    }

    pub fn start_calls(&self) -> usize {
        *self.starts.lock().expect("lock poisoned")
    }

    pub fn stop_calls(&self) -> usize {
        *self.stops.lock().expect("lock poisoned")
    }

    /// Emit an event on the running capture
    pub fn emit(&self, event: SpeechEvent) {
        if let Some(sender) = self.sender.lock().expect("lock poisoned").as_ref() {
            let _ = sender.send(event);
        }
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<()> {
        if *self.fail_start.lock().expect("lock poisoned") {
            return Err(MedchatError::DictationCapture("microphone busy".to_string()).into());
        }
        *self.starts.lock().expect("lock poisoned") += 1;
        *self.sender.lock().expect("lock poisoned") = Some(events);
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock().expect("lock poisoned") += 1;
        self.sender.lock().expect("lock poisoned").take();
    }
}
