//! Medchat - medical question-answering chat CLI
//!
#![doc = "Medchat - medical question-answering chat CLI"]
#![doc = "Main entry point for the Medchat client application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medchat::cli::{Cli, Commands};
use medchat::commands;
use medchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command; chat is the default
    match cli.command.clone().unwrap_or(Commands::Chat {
        session: None,
        new: false,
    }) {
        Commands::Chat { session, new } => {
            tracing::info!("Starting interactive chat for user {}", config.user.id);
            if let Some(id) = &session {
                tracing::debug!("Opening requested session: {}", id);
            }
            if new {
                tracing::debug!("Starting with a fresh session");
            }
            commands::chat::run_chat(config, session, new).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting session management command");
            commands::sessions::handle_sessions(&config, command).await?;
            Ok(())
        }
        Commands::Health => {
            tracing::info!("Checking backend health");
            commands::health::run_health(&config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins over `--verbose`; logs go to stderr so they do not mix
/// with command output.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "medchat=debug" } else { "medchat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
