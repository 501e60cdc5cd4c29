//! Medchat - medical question-answering chat client library
//!
//! This library provides the conversational session controller of a medical
//! chat client: it keeps a user's active conversation, sends questions to a
//! retrieval-augmented answer backend, persists the exchange and supports
//! voice dictation of questions.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `controller`: [`ChatController`], the composed session controller
//! - `session`: session identity, history loading, busy tracking and dispatch
//! - `dictation`: voice dictation state machine and speech recognizers
//! - `backend`: answer backend abstraction and its HTTP client
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use medchat::{ChatController, Config};
//! use medchat::commands::{build_backend, build_pointer_store, build_speech};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let controller = ChatController::start(
//!         config.user.to_user(),
//!         build_backend(&config)?,
//!         build_pointer_store(&config.storage)?,
//!         build_speech(&config.dictation)?,
//!         config.chat.clone(),
//!     )
//!     .await?;
//!     controller.send("What is hypertension?").await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod dictation;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use backend::{Backend, HttpBackend};
pub use config::Config;
pub use controller::{ChatController, SessionRemoval};
pub use dictation::{DictationState, SpeechCapability, SpeechEvent, SpeechRecognizer};
pub use error::{MedchatError, Result};
pub use session::{DispatchState, Message, Notice, Role, SendOutcome, SessionSummary, User};

#[cfg(test)]
pub mod test_utils;
