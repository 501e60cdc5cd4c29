//! Speech recognizer backed by an external command
//!
//! Terminals have no speech API, so dictation delegates to a configured
//! speech-to-text program. The program records one utterance and prints the
//! recognized text on stdout; a non-zero exit is reported as a capture
//! error. Stopping the capture kills the program.

use crate::dictation::{SpeechEvent, SpeechRecognizer};
use crate::error::{MedchatError, Result};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

/// Runs `program args...` once per capture
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    language: String,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandRecognizer {
    /// Build a recognizer from an argv list
    ///
    /// # Errors
    ///
    /// Returns `MedchatError::Config` if `argv` is empty
    pub fn new(argv: &[String], language: impl Into<String>) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| MedchatError::Config("dictation.command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            language: language.into(),
            cancel: Mutex::new(None),
        })
    }

    fn set_cancel(&self, sender: Option<oneshot::Sender<()>>) -> Option<oneshot::Sender<()>> {
        let mut slot = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, sender)
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn start(&self, events: mpsc::UnboundedSender<SpeechEvent>) -> Result<()> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .env("MEDCHAT_DICTATION_LANG", &self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MedchatError::DictationCapture(format!(
                    "failed to spawn speech command `{}`: {}",
                    self.program, e
                ))
            })?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        if let Some(previous) = self.set_cancel(Some(cancel_tx)) {
            let _ = previous.send(());
        }

        tokio::spawn(async move {
            tokio::select! {
                output = child.wait_with_output() => {
                    let event = match output {
                        Ok(output) if output.status.success() => {
                            let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                            if text.is_empty() {
                                SpeechEvent::Error("no-speech".to_string())
                            } else {
                                SpeechEvent::Result(text)
                            }
                        }
                        Ok(output) => {
                            tracing::debug!(
                                "speech command stderr: {}",
                                String::from_utf8_lossy(&output.stderr).trim()
                            );
                            SpeechEvent::Error(match output.status.code() {
                                Some(code) => format!("exit-{}", code),
                                None => "terminated".to_string(),
                            })
                        }
                        Err(e) => SpeechEvent::Error(e.to_string()),
                    };
                    let _ = events.send(event);
                    let _ = events.send(SpeechEvent::End);
                }
                _ = cancel_rx => {
                    // Dropping the wait future drops the child, which kills it.
                    tracing::debug!("speech command cancelled");
                }
            }
        });

        Ok(())
    }

    fn stop(&self) {
        if let Some(cancel) = self.set_cancel(None) {
            let _ = cancel.send(());
        }
    }
}
