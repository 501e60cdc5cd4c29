//! Session identity management
//!
//! Decides which session is active when the client starts and keeps the
//! durable pointer in step with every later change. While a controller runs,
//! the manager is the only writer of the pointer.

use crate::backend::Backend;
use crate::error::{MedchatError, Result};
use crate::session::pointer::{pointer_key, PointerStore};
use std::sync::Arc;

/// How the startup session was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupSession {
    /// The durable pointer named an existing session
    Resumed(String),
    /// No pointer was stored; the backend created a fresh session
    Created(String),
}

impl StartupSession {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Resumed(id) | Self::Created(id) => id,
        }
    }
}

/// Resolves the active session and owns the durable pointer
pub struct SessionIdentityManager {
    user_id: String,
    pointers: Arc<dyn PointerStore>,
    active: Option<String>,
}

impl SessionIdentityManager {
    pub fn new(user_id: impl Into<String>, pointers: Arc<dyn PointerStore>) -> Self {
        Self {
            user_id: user_id.into(),
            pointers,
            active: None,
        }
    }

    /// Id of the active session, if one is set
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Read the stored pointer for this user
    ///
    /// An unreadable store is treated as "no pointer".
    pub fn stored_pointer(&self) -> Option<String> {
        match self.pointers.get(&pointer_key(&self.user_id)) {
            Ok(value) => value.filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read session pointer: {:#}", e);
                None
            }
        }
    }

    /// Resolve the startup session
    ///
    /// Resumes the stored pointer when present; otherwise asks the backend
    /// for a new session, makes it active and stores it. Loading history for
    /// a resumed session is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `MedchatError::SessionCreation` when no pointer exists and the
    /// backend cannot create a session. No session is active in that case.
    pub async fn initialize(&mut self, backend: &dyn Backend) -> Result<StartupSession> {
        if let Some(existing) = self.stored_pointer() {
            tracing::info!("Resuming session {}", existing);
            self.active = Some(existing.clone());
            return Ok(StartupSession::Resumed(existing));
        }

        let created = create_session(backend, &self.user_id).await?;
        tracing::info!("Created session {}", created);
        self.on_session_changed(&created);
        Ok(StartupSession::Created(created))
    }

    /// Record `session_id` as active and persist the pointer
    ///
    /// A pointer write failure is logged; the in-memory switch still happens.
    pub fn on_session_changed(&mut self, session_id: &str) {
        self.active = Some(session_id.to_string());
        if let Err(e) = self.pointers.set(&pointer_key(&self.user_id), session_id) {
            tracing::warn!("Failed to store session pointer: {:#}", e);
        }
    }
}

/// Ask the backend for a new session, normalizing every failure to
/// `MedchatError::SessionCreation`
pub(crate) async fn create_session(backend: &dyn Backend, user_id: &str) -> Result<String> {
    backend.create_session(user_id).await.map_err(|e| {
        let error = match e.downcast::<MedchatError>() {
            Ok(MedchatError::SessionCreation(msg)) => MedchatError::SessionCreation(msg),
            Ok(other) => MedchatError::SessionCreation(other.to_string()),
            Err(other) => MedchatError::SessionCreation(format!("{:#}", other)),
        };
        error.into()
    })
}
