//! Answer backend abstraction
//!
//! The session controller talks to a single backend service that creates
//! sessions, stores transcripts and answers medical questions. This module
//! defines the [`Backend`] trait the controller depends on and the wire types
//! exchanged with it. [`HttpBackend`] is the production implementation.

use crate::error::Result;
use crate::session::SessionSummary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::{HealthStatus, HttpBackend};

/// One persisted transcript row as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryRecord {
    /// `"user"` or `"assistant"` (anything but `"user"` renders as assistant)
    #[serde(default)]
    pub role: String,
    /// Message body
    #[serde(default)]
    pub message: String,
    /// Backend timestamp, RFC 3339 or RFC 2822 rendering
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of the persist-message call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistRequest {
    pub user_id: String,
    pub session_id: String,
    pub role: String,
    pub message: String,
}

/// Body of the query call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: String,
    pub session_id: String,
}

/// Reply of the query call
///
/// Only `answer` is consumed by the dispatch pipeline; the remaining fields
/// are informational and logged at debug level.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub is_emergency: bool,
}

/// Reply of the create-session call
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateSessionResponse {
    pub session_id: Option<String>,
}

/// One row of the session listing as sent by the backend
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<serde_json::Value>,
    #[serde(default)]
    pub message_count: usize,
}

impl From<SessionRecord> for SessionSummary {
    fn from(record: SessionRecord) -> Self {
        let title = record
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "New Chat".to_string());
        let created_at = record.created_at.and_then(|value| match value {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        SessionSummary {
            session_id: record.session_id,
            title,
            created_at,
            message_count: record.message_count,
        }
    }
}

/// Request/response contract of the answer backend
///
/// Every call is asynchronous. Implementations map non-success replies to
/// the matching [`MedchatError`](crate::error::MedchatError) variant so the
/// controller can apply its failure policy per call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Ask the backend for a fresh session id for `user_id`
    async fn create_session(&self, user_id: &str) -> Result<String>;

    /// Fetch the ordered transcript rows of a session
    async fn load_history(&self, session_id: &str) -> Result<Vec<HistoryRecord>>;

    /// Store one message; callers treat this as fire-and-forget
    async fn persist_message(&self, request: &PersistRequest) -> Result<()>;

    /// Ask the answer backend a question
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// Delete a session and its transcript
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// List the sessions owned by `user_id`, newest first
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>>;
}
