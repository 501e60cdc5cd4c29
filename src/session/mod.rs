//! Conversation sessions
//!
//! Building blocks of the session controller: identity and pointer
//! management, history loading, busy tracking and the dispatch pipeline.
//! [`ChatController`](crate::controller::ChatController) composes them.

pub mod busy;
pub mod dispatch;
pub mod history;
pub mod identity;
pub mod pointer;
pub mod types;

pub use busy::{BusyTracker, DispatchState, DispatchTicket};
pub use dispatch::{validate_input, DispatchPipeline, SendOutcome};
pub use history::{HistoryLoader, LoadedHistory};
pub use identity::{SessionIdentityManager, StartupSession};
pub use pointer::{pointer_key, MemoryPointerStore, PointerStore, SqlitePointerStore};
pub use types::{Message, Notice, NoticeLevel, Role, SessionSummary, User};
