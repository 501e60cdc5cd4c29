//! Typing/busy state tracking
//!
//! The dispatch state gates the composer and drives the waiting indicator.
//! Only the dispatch pipeline moves it to `Sending`; the pipeline and the
//! session switch coordinator are the only components that reset it.

use std::fmt;

/// Whether a message is in flight for the active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    Sending,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
        }
    }
}

/// Tag identifying one dispatch
///
/// Carries the session id the send was issued for and the session epoch at
/// issue time. A completion whose tag no longer matches the live session is
/// stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTicket {
    pub session_id: String,
    pub epoch: u64,
}

/// Owner of the single [`DispatchState`]
#[derive(Debug, Default)]
pub struct BusyTracker {
    state: DispatchState,
    holder: Option<DispatchTicket>,
}

impl BusyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current dispatch state
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Render-facing flag: true while a send is in flight
    pub fn is_busy(&self) -> bool {
        self.state == DispatchState::Sending
    }

    /// Move to `Sending` for `ticket`
    ///
    /// Returns false (and changes nothing) when a send is already in flight.
    pub fn try_begin(&mut self, ticket: &DispatchTicket) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = DispatchState::Sending;
        self.holder = Some(ticket.clone());
        true
    }

    /// Release the state held by `ticket`
    ///
    /// A ticket that no longer holds the state (because the coordinator reset
    /// it and possibly a newer send acquired it) releases nothing.
    pub fn release(&mut self, ticket: &DispatchTicket) -> bool {
        if self.holder.as_ref() != Some(ticket) {
            return false;
        }
        self.state = DispatchState::Idle;
        self.holder = None;
        true
    }

    /// Force the state back to `Idle` (session switch)
    pub fn reset(&mut self) {
        self.state = DispatchState::Idle;
        self.holder = None;
    }
}
