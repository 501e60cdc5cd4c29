use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sender of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed or dictated by the user
    User,
    /// Produced by the answer backend (or a synthetic failure reply)
    Assistant,
}

impl Role {
    /// Map a backend role field onto the user/assistant distinction.
    ///
    /// Only the exact value `"user"` is a user message; every other value is
    /// rendered as an assistant reply.
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::session::Role;
    ///
    /// assert_eq!(Role::from_backend("user"), Role::User);
    /// assert_eq!(Role::from_backend("assistant"), Role::Assistant);
    /// assert_eq!(Role::from_backend("system"), Role::Assistant);
    /// ```
    pub fn from_backend(value: &str) -> Self {
        if value == "user" {
            Self::User
        } else {
            Self::Assistant
        }
    }

    /// Wire representation used by the persistence endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript entry
///
/// Messages are immutable once created; a transcript only ever grows by
/// appending or is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message body
    pub text: String,
    /// Who sent it
    pub role: Role,
    /// When it was created (client clock for optimistic entries)
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped with the current time
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::User,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message stamped with the current time
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::Assistant,
            timestamp: Utc::now(),
        }
    }

    /// Returns true when the message was sent by the user
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// The signed-in user, supplied by the authentication collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
}

/// Metadata for a stored conversation session, as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Opaque session token
    pub session_id: String,
    /// First user question, or "New Chat"
    pub title: String,
    /// Creation time as rendered by the backend
    pub created_at: Option<String>,
    /// Number of persisted messages
    pub message_count: usize,
}

/// Severity of a [`Notice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}
