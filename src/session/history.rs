//! Session history loading
//!
//! Hydrates the transcript of a session from the backend. Loading is
//! restartable: the caller replaces its transcript with the result, so
//! loading the same session twice yields the same transcript.

use crate::backend::{Backend, HistoryRecord};
use crate::session::{Message, Notice, Role};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Result of one history load
///
/// A failed load still yields a (empty) transcript plus a notice for the UI;
/// the session stays usable for sending.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedHistory {
    pub messages: Vec<Message>,
    pub notice: Option<Notice>,
}

/// Fetches and converts session transcripts
#[derive(Clone)]
pub struct HistoryLoader {
    backend: Arc<dyn Backend>,
}

impl HistoryLoader {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Load the ordered transcript of `session_id`
    ///
    /// Backend order is preserved as-is. Failures are logged and turned into
    /// an empty transcript with an error notice.
    pub async fn load(&self, session_id: &str) -> LoadedHistory {
        match self.backend.load_history(session_id).await {
            Ok(records) => {
                let messages: Vec<Message> = records.into_iter().map(to_message).collect();
                tracing::debug!(
                    "Loaded {} messages for session {}",
                    messages.len(),
                    session_id
                );
                LoadedHistory {
                    messages,
                    notice: None,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load history for session {}: {}", session_id, e);
                LoadedHistory {
                    messages: Vec::new(),
                    notice: Some(Notice::error(
                        "Could not load conversation",
                        "Previous messages are unavailable; you can keep chatting.",
                    )),
                }
            }
        }
    }
}

fn to_message(record: HistoryRecord) -> Message {
    Message {
        role: Role::from_backend(&record.role),
        timestamp: record
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        text: record.message,
    }
}

/// Parse a backend timestamp
///
/// Accepts RFC 3339 and the RFC 2822 HTTP-date form Flask uses when it
/// serializes datetimes, plus a naive `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
