//! Message dispatch pipeline
//!
//! One dispatch is the full cycle triggered by a submitted message:
//!
//! 1. optimistic append of the user message (controller)
//! 2. dispatch state to `Sending` (controller)
//! 3. detached persistence of the user message
//! 4. query the answer backend
//! 5. extract the answer, substituting a fallback when absent
//! 6. detached persistence of the reply, ordered after step 3
//! 7. append the reply (controller, subject to the staleness guard)
//! 8. on query failure, a synthetic connectivity reply instead of 5-7
//! 9. dispatch state back to `Idle` on every exit path (controller)
//!
//! This module owns steps 3-6 and 8; the controller owns the transcript and
//! the dispatch state around them.

use crate::backend::{Backend, PersistRequest, QueryRequest};
use crate::config::ChatConfig;
use crate::error::{MedchatError, Result};
use crate::session::busy::DispatchTicket;
use crate::session::{Message, Role};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What happened to a `send()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Reply appended to the live transcript
    Delivered(Message),
    /// Backend unreachable; the synthetic failure reply was appended
    Failed(Message),
    /// The session changed while the query was in flight; nothing applied
    Discarded,
    /// Another send is still in flight for this session; nothing happened
    Busy,
}

/// Reply produced by the backend exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Exchange {
    Answered(Message),
    Unreachable(Message),
}

/// Validate raw composer text
///
/// Returns the trimmed text to send.
///
/// # Errors
///
/// Returns `MedchatError::Validation` when nothing but whitespace was entered
///
/// # Examples
///
/// ```
/// use medchat::session::validate_input;
///
/// assert_eq!(validate_input("  hello ").unwrap(), "hello");
/// assert!(validate_input("   ").is_err());
/// ```
pub fn validate_input(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MedchatError::Validation("message is empty".to_string()).into());
    }
    Ok(trimmed.to_string())
}

/// Backend half of a dispatch
#[derive(Clone)]
pub struct DispatchPipeline {
    backend: Arc<dyn Backend>,
    user_id: String,
    replies: ChatConfig,
}

impl DispatchPipeline {
    pub fn new(backend: Arc<dyn Backend>, user_id: impl Into<String>, replies: ChatConfig) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            replies,
        }
    }

    /// Run steps 3-6 and 8 for `text` on behalf of `ticket`
    ///
    /// Never fails: query errors become the synthetic connectivity reply.
    pub(crate) async fn exchange(&self, ticket: &DispatchTicket, text: &str) -> Exchange {
        let user_saved = self.persist_detached(ticket, Role::User, text, None);

        let request = QueryRequest {
            query: text.to_string(),
            user_id: self.user_id.clone(),
            session_id: ticket.session_id.clone(),
        };

        match self.backend.query(&request).await {
            Ok(response) => {
                tracing::debug!(
                    "Answer received for session {} (confidence: {:?}, domains: {:?}, emergency: {})",
                    ticket.session_id,
                    response.confidence,
                    response.domains,
                    response.is_emergency
                );
                let answer = response
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| self.replies.fallback_answer.clone());

                self.persist_detached(ticket, Role::Assistant, &answer, Some(user_saved));
                Exchange::Answered(Message::assistant(answer))
            }
            Err(e) => {
                tracing::error!(
                    "Query failed for session {}: {:#}",
                    ticket.session_id,
                    e
                );
                Exchange::Unreachable(Message::assistant(self.replies.connectivity_error.clone()))
            }
        }
    }

    /// Fire-and-forget persistence of one message
    ///
    /// When `after` is given the save waits for that earlier save to finish
    /// first, so the backend stores the user message before its reply.
    fn persist_detached(
        &self,
        ticket: &DispatchTicket,
        role: Role,
        text: &str,
        after: Option<JoinHandle<()>>,
    ) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let request = PersistRequest {
            user_id: self.user_id.clone(),
            session_id: ticket.session_id.clone(),
            role: role.as_str().to_string(),
            message: text.to_string(),
        };

        tokio::spawn(async move {
            if let Some(previous) = after {
                let _ = previous.await;
            }
            if let Err(e) = backend.persist_message(&request).await {
                tracing::warn!(
                    "Failed to save {} message for session {}: {:#}",
                    request.role,
                    request.session_id,
                    e
                );
            }
        })
    }
}
