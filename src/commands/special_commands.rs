//! Special commands parser for interactive chat
//!
//! Lines starting with `/` are commands rather than questions. They manage
//! sessions, start voice dictation, clear the view or leave the chat.
//! Command names are case-insensitive; session id arguments are kept as typed.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    /// Command was given an argument it does not take
    #[error("Command {command} takes no argument, got: {arg}")]
    UnexpectedArgument { command: String, arg: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a fresh session
    NewSession,

    /// List the user's sessions
    ListSessions,

    /// Make another session active
    SwitchSession(String),

    /// Delete a session
    ///
    /// Deleting the active session starts a new one.
    DeleteSession(String),

    /// Dictate the next question by voice
    Voice,

    /// Clear the visible transcript
    Clear,

    /// Show the active session and dispatch state
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the line as a question
    None,
}

/// Parse one line of input into a special command
///
/// # Errors
///
/// Returns `CommandError` for unknown commands or wrong arguments
///
/// # Examples
///
/// ```
/// use medchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewSession);
/// assert_eq!(
///     parse_special_command("/switch sess_Ab1").unwrap(),
///     SpecialCommand::SwitchSession("sess_Ab1".to_string())
/// );
/// assert_eq!(
///     parse_special_command("what is asthma?").unwrap(),
///     SpecialCommand::None
/// );
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/switch" | "/open" => required(&name, "/switch <session_id>", arg)
            .map(|id| SpecialCommand::SwitchSession(id.to_string())),
        "/delete" | "/rm" => required(&name, "/delete <session_id>", arg)
            .map(|id| SpecialCommand::DeleteSession(id.to_string())),
        _ => {
            let command = match name.as_str() {
                "/new" => SpecialCommand::NewSession,
                "/sessions" | "/ls" => SpecialCommand::ListSessions,
                "/voice" | "/mic" => SpecialCommand::Voice,
                "/clear" => SpecialCommand::Clear,
                "/status" => SpecialCommand::ShowStatus,
                "/help" | "/?" => SpecialCommand::Help,
                "/exit" | "/quit" | "exit" | "quit" => SpecialCommand::Exit,
                _ => return Err(CommandError::UnknownCommand(trimmed.to_string())),
            };
            if arg.is_empty() {
                Ok(command)
            } else {
                Err(CommandError::UnexpectedArgument {
                    command: name,
                    arg: arg.to_string(),
                })
            }
        }
    }
}

fn required<'a>(command: &str, usage: &str, arg: &'a str) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg)
    }
}

/// Print help for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /new              - Start a fresh conversation
  /sessions         - List your conversations
  /switch <id>      - Open another conversation
  /delete <id>      - Delete a conversation (deleting the open one starts a new one)

INPUT:
  /voice            - Dictate a question; the text is placed in the prompt for editing
                      (press Ctrl+C while listening to cancel)

VIEW:
  /clear            - Clear the visible messages (stored history is kept)
  /status           - Show the open conversation and its state

OTHER:
  /help             - Show this help message
  /exit             - Leave the chat (also: exit, quit, Ctrl+D)

Anything else is sent as a question.
"#
    );
}
