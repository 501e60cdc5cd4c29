//! Voice dictation
//!
//! Wraps a platform speech-capture capability as a small state machine:
//!
//! - `Idle` -> `Listening` on [`DictationController::start`]
//! - `Listening` -> `Idle` on a recognized result (text is handed back for
//!   merging into the composer), on `End`, or on an explicit stop
//! - `Listening` -> `Error` -> `Idle` on a capture error
//!
//! The capability is injected as [`SpeechCapability`] so tests and
//! platforms without a recognizer can substitute it. Only one capture may
//! run per capability at a time; the slot is held by a lease that is
//! released on every exit path.

use crate::error::{MedchatError, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub mod command;

pub use command::CommandRecognizer;

/// Event emitted by a running capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Final recognized text; ends the capture
    Result(String),
    /// Capture failed with a platform error code
    Error(String),
    /// Capture ended without (further) results
    End,
}

/// Platform speech recognizer
///
/// `start` begins one capture and reports its events on `events`. `stop`
/// cancels a running capture; it must be harmless when nothing is running.
pub trait SpeechRecognizer: Send + Sync {
    fn start(&self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<()>;
    fn stop(&self);
}

/// A recognizer together with its process-wide capture slot
#[derive(Clone)]
pub struct SharedRecognizer {
    recognizer: Arc<dyn SpeechRecognizer>,
    in_use: Arc<AtomicBool>,
}

impl SharedRecognizer {
    fn acquire(&self) -> Option<CaptureLease> {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CaptureLease {
                in_use: Arc::clone(&self.in_use),
            })
    }
}

/// Holds the capture slot; dropping it frees the slot
struct CaptureLease {
    in_use: Arc<AtomicBool>,
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::Release);
    }
}

/// Result of probing the platform for speech capture
#[derive(Clone)]
pub enum SpeechCapability {
    Available(SharedRecognizer),
    Unavailable,
}

impl SpeechCapability {
    /// Wrap a recognizer as an available capability
    pub fn available<R: SpeechRecognizer + 'static>(recognizer: R) -> Self {
        Self::from_arc(Arc::new(recognizer))
    }

    /// Wrap a shared recognizer as an available capability
    pub fn from_arc(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self::Available(SharedRecognizer {
            recognizer,
            in_use: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// True while some controller holds the capture slot
    pub fn is_capturing(&self) -> bool {
        match self {
            Self::Available(shared) => shared.in_use.load(Ordering::Acquire),
            Self::Unavailable => false,
        }
    }
}

impl fmt::Debug for SpeechCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(_) => f.write_str("SpeechCapability::Available"),
            Self::Unavailable => f.write_str("SpeechCapability::Unavailable"),
        }
    }
}

/// Dictation state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictationState {
    #[default]
    Idle,
    Listening,
    Error,
}

impl fmt::Display for DictationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Event stream of one capture, owned by whoever pumps events
///
/// Feed every received event back through the controller together with
/// `capture_id`; events of an ended capture are ignored.
#[derive(Debug)]
pub struct CaptureEvents {
    pub capture_id: u64,
    events: mpsc::UnboundedReceiver<SpeechEvent>,
}

impl CaptureEvents {
    /// Next event; a recognizer that went away counts as `End`
    pub async fn recv(&mut self) -> SpeechEvent {
        self.events.recv().await.unwrap_or(SpeechEvent::End)
    }
}

/// Effect of feeding one event to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationUpdate {
    /// Text to merge into the composer
    Recognized(String),
    /// Capture failed with this code
    Failed(String),
    /// Capture ended without text
    Ended,
    /// Event did not belong to the running capture
    Ignored,
}

struct ActiveCapture {
    id: u64,
    recognizer: Arc<dyn SpeechRecognizer>,
    _lease: CaptureLease,
}

/// Voice dictation state machine
pub struct DictationController {
    capability: SpeechCapability,
    state: DictationState,
    active: Option<ActiveCapture>,
    next_id: u64,
}

impl DictationController {
    pub fn new(capability: SpeechCapability) -> Self {
        Self {
            capability,
            state: DictationState::Idle,
            active: None,
            next_id: 0,
        }
    }

    pub fn state(&self) -> DictationState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == DictationState::Listening
    }

    /// Begin a capture
    ///
    /// Returns `Ok(None)` when already listening (no-op).
    ///
    /// # Errors
    ///
    /// - `MedchatError::DictationUnsupported` when no recognizer exists; the
    ///   state is left untouched
    /// - `MedchatError::DictationCapture` when another capture holds the slot
    ///   or the recognizer fails to start
    pub fn start(&mut self) -> Result<Option<CaptureEvents>> {
        let shared = match &self.capability {
            SpeechCapability::Available(shared) => shared.clone(),
            SpeechCapability::Unavailable => return Err(MedchatError::DictationUnsupported.into()),
        };

        if self.is_listening() {
            return Ok(None);
        }

        let lease = shared.acquire().ok_or_else(|| {
            MedchatError::DictationCapture("voice input is already in use".to_string())
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        shared
            .recognizer
            .start(tx)
            .map_err(|e| MedchatError::DictationCapture(format!("{:#}", e)))?;

        self.next_id += 1;
        self.active = Some(ActiveCapture {
            id: self.next_id,
            recognizer: shared.recognizer,
            _lease: lease,
        });
        self.state = DictationState::Listening;
        tracing::debug!("Dictation capture {} started", self.next_id);

        Ok(Some(CaptureEvents {
            capture_id: self.next_id,
            events: rx,
        }))
    }

    /// Cancel a running capture without merging anything
    ///
    /// Returns true if a capture was running.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(capture) => {
                capture.recognizer.stop();
                self.state = DictationState::Idle;
                tracing::debug!("Dictation capture {} stopped", capture.id);
                true
            }
            None => false,
        }
    }

    /// Apply an event from capture `capture_id`
    pub fn handle_event(&mut self, capture_id: u64, event: SpeechEvent) -> DictationUpdate {
        let current = matches!(&self.active, Some(capture) if capture.id == capture_id);
        if !current || !self.is_listening() {
            tracing::debug!("Ignoring dictation event from capture {}", capture_id);
            return DictationUpdate::Ignored;
        }

        // Every event ends the capture: there is no partial-result support.
        self.active = None;
        match event {
            SpeechEvent::Result(text) => {
                self.state = DictationState::Idle;
                DictationUpdate::Recognized(text)
            }
            SpeechEvent::Error(code) => {
                tracing::warn!("Speech recognition error: {}", code);
                self.state = DictationState::Error;
                DictationUpdate::Failed(code)
            }
            SpeechEvent::End => {
                self.state = DictationState::Idle;
                DictationUpdate::Ended
            }
        }
    }

    /// Leave the transient `Error` state
    pub fn recover(&mut self) {
        if self.state == DictationState::Error {
            self.state = DictationState::Idle;
        }
    }

    /// Stop any capture and return to `Idle`
    pub fn reset(&mut self) {
        self.stop();
        self.state = DictationState::Idle;
    }
}

/// Merge dictated text into the composer buffer
///
/// # Examples
///
/// ```
/// use medchat::dictation::merge_dictated;
///
/// assert_eq!(merge_dictated("", "chest pain"), "chest pain");
/// assert_eq!(merge_dictated("I have", "chest pain"), "I have chest pain");
/// ```
pub fn merge_dictated(buffer: &str, text: &str) -> String {
    if buffer.is_empty() {
        text.to_string()
    } else {
        format!("{} {}", buffer, text)
    }
}
