/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`     - Interactive chat REPL driving a [`ChatController`]
- `sessions` - List and delete stored sessions
- `health`   - Probe the answer backend

It also builds the runtime collaborators (backend client, pointer store,
speech capability) from [`Config`].
*/

use crate::backend::HttpBackend;
use crate::config::{Config, DictationConfig, StorageConfig};
use crate::controller::{ChatController, SessionRemoval};
use crate::dictation::{CommandRecognizer, SpeechCapability};
use crate::error::Result;
use crate::session::{
    Message, MemoryPointerStore, Notice, NoticeLevel, PointerStore, Role, SqlitePointerStore,
};
use colored::Colorize;
use std::sync::Arc;

// Special commands parser for the chat REPL
pub mod special_commands;

// Session management commands
pub mod sessions;

/// Build the HTTP client for the configured backend
pub fn build_backend(config: &Config) -> Result<Arc<HttpBackend>> {
    Ok(Arc::new(HttpBackend::new(&config.backend)?))
}

/// Build the durable pointer store
///
/// `ephemeral` selects an in-memory store; otherwise SQLite at the
/// configured path or in the platform data directory.
pub fn build_pointer_store(config: &StorageConfig) -> Result<Arc<dyn PointerStore>> {
    if config.ephemeral {
        tracing::debug!("Using in-memory session pointer store");
        return Ok(Arc::new(MemoryPointerStore::new()));
    }
    let store = match &config.pointer_db {
        Some(path) => SqlitePointerStore::new_with_path(path)?,
        None => SqlitePointerStore::new()?,
    };
    tracing::debug!("Using session pointer store at {}", store.path().display());
    Ok(Arc::new(store))
}

/// Probe for speech capture
///
/// Capture is available only when an external speech command is configured.
pub fn build_speech(config: &DictationConfig) -> Result<SpeechCapability> {
    match &config.command {
        Some(argv) => {
            let recognizer = CommandRecognizer::new(argv, config.language.clone())?;
            Ok(SpeechCapability::available(recognizer))
        }
        None => Ok(SpeechCapability::Unavailable),
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`
///
/// # Examples
///
/// ```
/// use medchat::commands::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 25), "Short");
/// assert_eq!(truncate_chars("Chest pain after running", 10), "Chest pain...");
/// ```
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn print_message(message: &Message) {
    let time = message.timestamp.format("%H:%M").to_string().dimmed();
    match message.role {
        Role::User => println!("{} {}\n{}\n", "You".cyan().bold(), time, message.text),
        Role::Assistant => println!(
            "{} {}\n{}\n",
            "Assistant".green().bold(),
            time,
            message.text
        ),
    }
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Info => println!(
                "{} {}",
                format!("{}:", notice.title).blue().bold(),
                notice.description
            ),
            NoticeLevel::Error => eprintln!(
                "{} {}",
                format!("{}:", notice.title).red().bold(),
                notice.description.red()
            ),
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Establishes the active session, then runs a readline loop: slash
    //! commands manage sessions and dictation, everything else is sent as a
    //! question. Dictated text is pre-filled into the next prompt so it can
    //! be edited before sending.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::dictation::DictationUpdate;
    use crate::session::{pointer_key, SendOutcome};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start the interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Open this session instead of the last active one
    /// * `new` - Start with a fresh session
    ///
    /// # Errors
    ///
    /// Fails if no session can be established at startup or the terminal
    /// cannot be read.
    pub async fn run_chat(config: Config, session: Option<String>, new: bool) -> Result<()> {
        let backend = build_backend(&config)?;
        let pointers = build_pointer_store(&config.storage)?;
        let user = config.user.to_user();

        let key = pointer_key(&user.id);
        if new {
            pointers.remove(&key)?;
        } else if let Some(id) = &session {
            pointers.set(&key, id)?;
        }

        let speech = build_speech(&config.dictation)?;
        let controller =
            ChatController::start(user, backend, pointers, speech, config.chat.clone()).await?;

        print_welcome_banner(&controller);
        for message in controller.transcript() {
            print_message(&message);
        }
        print_notices(controller.take_notices());

        let mut rl = DefaultEditor::new()?;

        loop {
            let prompt = format_prompt(&controller);
            let composer = controller.composer();
            let read = if composer.is_empty() {
                rl.readline(&prompt)
            } else {
                rl.readline_with_initial(&prompt, (composer.as_str(), ""))
            };
            controller.set_composer(String::new());

            match read {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::NewSession => {
                            if let Err(e) = controller.new_session().await {
                                tracing::debug!("New session failed: {:#}", e);
                            }
                        }
                        SpecialCommand::ListSessions => list_sessions(&controller).await,
                        SpecialCommand::SwitchSession(id) => {
                            controller.switch_session(&id).await?;
                            println!("Opened conversation {}\n", id.cyan());
                            for message in controller.transcript() {
                                print_message(&message);
                            }
                        }
                        SpecialCommand::DeleteSession(id) => {
                            match controller.delete_session(&id).await {
                                Ok(removal) => {
                                    println!("{}", format!("Deleted conversation {}", id).green());
                                    match removal {
                                        SessionRemoval::Replaced(next) => {
                                            println!("Started new conversation {}\n", next.cyan())
                                        }
                                        SessionRemoval::ReplacementFailed => println!(
                                            "{}",
                                            "Use /new to start another conversation.".yellow()
                                        ),
                                        SessionRemoval::Unaffected => {}
                                    }
                                }
                                Err(e) => eprintln!("{}", format!("Error: {:#}", e).red()),
                            }
                        }
                        SpecialCommand::Voice => dictate(&controller).await,
                        SpecialCommand::Clear => controller.clear_view(),
                        SpecialCommand::ShowStatus => print_status_display(&controller),
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {
                            rl.add_history_entry(trimmed)?;
                            send(&controller, trimmed).await;
                        }
                    }
                    print_notices(controller.take_notices());
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn send(controller: &ChatController, text: &str) {
        println!("{}", "Thinking...".dimmed());
        match controller.send(text).await {
            Ok(SendOutcome::Delivered(reply)) => print_message(&reply),
            Ok(SendOutcome::Failed(reply)) => {
                println!("{}\n", reply.text.red());
            }
            Ok(SendOutcome::Discarded) => {
                tracing::debug!("Reply arrived after the conversation changed");
            }
            Ok(SendOutcome::Busy) => {
                println!("{}\n", "Still waiting for the previous answer.".yellow());
            }
            Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
        }
    }

    /// Run one dictation capture; Ctrl+C cancels it
    async fn dictate(controller: &ChatController) {
        let mut events = match controller.start_dictation() {
            Ok(Some(events)) => events,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("Dictation unavailable: {:#}", e);
                return;
            }
        };
        print_notices(controller.take_notices());

        let capture_id = events.capture_id;
        tokio::select! {
            event = events.recv() => {
                if let DictationUpdate::Recognized(text) =
                    controller.handle_dictation_event(capture_id, event)
                {
                    tracing::debug!("Dictated {} characters", text.chars().count());
                    println!("{}", "Edit the dictated text and press Enter to send.".dimmed());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.stop_dictation();
                println!("{}", "Voice input cancelled".yellow());
            }
        }
    }

    async fn list_sessions(controller: &ChatController) {
        match controller.list_sessions().await {
            Ok(list) => {
                let active = controller.active_session();
                sessions::print_sessions(&list, active.as_deref());
            }
            Err(e) => eprintln!("{}", format!("Error: {:#}", e).red()),
        }
    }

    fn format_prompt(controller: &ChatController) -> String {
        let session = controller
            .active_session()
            .map(|id| truncate_chars(&id, 16))
            .unwrap_or_else(|| "-".to_string());
        format!("{} {} ", format!("[{}]", session).cyan(), ">>".bold())
    }

    /// Display welcome banner at the start of interactive chat
    fn print_welcome_banner(controller: &ChatController) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║             Medchat - Medical Question Answering             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("User:         {}", controller.user().name);
        if let Some(id) = controller.active_session() {
            println!("Conversation: {}", id.cyan());
        }
        println!(
            "{}\n",
            "Answers are informational and not a substitute for professional medical advice."
                .yellow()
        );
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    /// Display the active session and controller state
    fn print_status_display(controller: &ChatController) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Medchat Session Status                   ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "Conversation:      {}",
            controller
                .active_session()
                .unwrap_or_else(|| "-".to_string())
                .cyan()
        );
        println!("Messages in view:  {}", controller.transcript().len());
        println!("Dispatch:          {}", controller.dispatch_state());
        println!("Voice input:       {}", controller.dictation_state());
        println!();
    }
}

// Backend health probe
pub mod health {
    //! `medchat health`: report whether the answer backend is up and ready.

    use super::*;

    /// Query the health endpoint and print its report
    pub async fn run_health(config: &Config) -> Result<()> {
        let backend = build_backend(config)?;
        tracing::debug!("Probing backend at {}", backend.base_url());

        let status = backend.health().await?;
        let ready = status.pipeline_initialized;

        println!("Backend:  {}", backend.base_url().as_str().cyan());
        println!(
            "Status:   {}",
            if ready {
                status.status.green()
            } else {
                status.status.yellow()
            }
        );
        println!(
            "Pipeline: {}",
            if ready {
                "initialized".green()
            } else {
                "not initialized".yellow()
            }
        );
        if !status.domain_names.is_empty() {
            println!("Domains:  {}", status.domain_names.join(", "));
        }
        if let Some(timestamp) = &status.timestamp {
            println!("Checked:  {}", timestamp.dimmed());
        }
        Ok(())
    }
}
