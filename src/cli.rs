//! Command-line interface definition for Medchat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, session management and a
//! backend health probe.

use clap::{Parser, Subcommand};

/// Medchat - medical question-answering chat client
///
/// Hold multiple named conversations with a retrieval-augmented medical
/// answer service, optionally dictating questions by voice.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "medchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend base URL from config
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Override the user id from config
    #[arg(short, long, global = true)]
    pub user_id: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for Medchat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat
    Chat {
        /// Open this session instead of the last active one
        #[arg(short, long)]
        session: Option<String>,

        /// Start with a fresh session
        #[arg(short, long, conflicts_with = "session")]
        new: bool,
    },

    /// Manage stored conversation sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Check that the answer backend is reachable and ready
    Health,
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionsCommand {
    /// List sessions of the configured user
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete a session and its transcript
    Delete {
        /// Session id to delete
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_session() {
        let cli = Cli::try_parse_from(["medchat", "chat", "--session", "sess_xyz"]).unwrap();
        match cli.command {
            Some(Commands::Chat { session, new }) => {
                assert_eq!(session.as_deref(), Some("sess_xyz"));
                assert!(!new);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_chat_new_conflicts_with_session() {
        let result = Cli::try_parse_from(["medchat", "chat", "--new", "--session", "s"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_user_id_after_subcommand() {
        let cli =
            Cli::try_parse_from(["medchat", "sessions", "list", "--user-id", "7", "--json"])
                .unwrap();
        assert_eq!(cli.user_id.as_deref(), Some("7"));
        assert!(matches!(
            cli.command,
            Some(Commands::Sessions {
                command: SessionsCommand::List { json: true }
            })
        ));
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["medchat"]).unwrap();
        assert!(cli.command.is_none());
    }
}
