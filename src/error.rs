//! Error types for Medchat
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Medchat operations
///
/// Covers the failure taxonomy of the session controller (validation,
/// persistence, query, session creation, dictation) as well as the ambient
/// failures of configuration, storage and transport.
#[derive(Error, Debug)]
pub enum MedchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any request was made (e.g. blank message)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Best-effort message persistence failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The answer backend could not be reached or returned an unusable reply
    #[error("Query error: {0}")]
    Query(String),

    /// The backend refused or failed to create a session
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// Session listing or deletion failed on the backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Loading a session transcript failed
    #[error("History load error: {0}")]
    HistoryLoad(String),

    /// No speech capture capability is available on this platform
    #[error("Voice input is not supported on this platform")]
    DictationUnsupported,

    /// Speech capture failed or could not be started
    #[error("Voice capture error: {0}")]
    DictationCapture(String),

    /// An operation required an active session but none is set
    #[error("No active session")]
    NoActiveSession,

    /// Local pointer storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite errors from the pointer store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for Medchat operations
///
/// Uses `anyhow::Error` so callers can attach context while the concrete
/// [`MedchatError`] stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
