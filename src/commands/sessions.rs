use crate::backend::Backend;
use crate::cli::SessionsCommand;
use crate::commands::{build_backend, build_pointer_store, truncate_chars};
use crate::config::Config;
use crate::error::{MedchatError, Result};
use crate::session::history::parse_timestamp;
use crate::session::{pointer_key, SessionSummary};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle session management commands
pub async fn handle_sessions(config: &Config, command: SessionsCommand) -> Result<()> {
    let backend = build_backend(config)?;
    let user_id = &config.user.id;

    // The pointer store is optional here; listing works without it.
    let pointers = match build_pointer_store(&config.storage) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!("Session pointer store unavailable: {:#}", e);
            None
        }
    };
    let key = pointer_key(user_id);
    let last_active = pointers
        .as_ref()
        .and_then(|store| store.get(&key).ok().flatten());

    match command {
        SessionsCommand::List { json } => {
            let sessions = backend.list_sessions(user_id).await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&sessions).map_err(MedchatError::from)?
                );
                return Ok(());
            }
            print_sessions(&sessions, last_active.as_deref());
            println!(
                "Use {} to open a session.",
                "medchat chat --session <ID>".cyan()
            );
            println!();
        }
        SessionsCommand::Delete { id } => {
            backend.delete_session(&id).await?;
            if last_active.as_deref() == Some(id.as_str()) {
                if let Some(store) = &pointers {
                    store.remove(&key)?;
                }
                tracing::info!("Cleared last active session pointer for user {}", user_id);
            }
            println!("{}", format!("Deleted conversation {}", id).green());
        }
    }

    Ok(())
}

/// Print sessions as a table, marking `active` with `*`
pub fn print_sessions(sessions: &[SessionSummary], active: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No conversations found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for session in sessions {
        let marker = if active == Some(session.session_id.as_str()) {
            "*"
        } else {
            ""
        };
        let created = format_created(session.created_at.as_deref());

        table.add_row(prettytable::row![
            marker.green(),
            session.session_id.cyan(),
            truncate_chars(&session.title, 25),
            session.message_count,
            created
        ]);
    }

    println!("\nConversations:");
    table.printstd();
    println!();
}

/// Render a backend creation timestamp as a date
///
/// Unparseable values are shown as sent.
fn format_created(raw: Option<&str>) -> String {
    match raw {
        Some(value) => parse_timestamp(value)
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| value.to_string()),
        None => "-".to_string(),
    }
}
