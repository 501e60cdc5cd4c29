//! Configuration management for Medchat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MedchatError, Result};
use crate::session::User;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Medchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Answer backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Identity of the signed-in user
    #[serde(default)]
    pub user: UserConfig,
    /// Local storage for the last-active-session pointer
    #[serde(default)]
    pub storage: StorageConfig,
    /// Voice dictation settings
    #[serde(default)]
    pub dictation: DictationConfig,
    /// Chat behavior settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Answer backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend service; endpoints live under `/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional per-request timeout in seconds
    ///
    /// Unset by default: a query waits for the backend as long as it takes.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_user_agent() -> String {
    concat!("medchat/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Signed-in user configuration
///
/// Authentication happens elsewhere; the client only needs to know who it
/// is acting for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

fn default_user_id() -> String {
    "1".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
            name: String::new(),
            email: String::new(),
        }
    }
}

impl UserConfig {
    /// Build the [`User`] this configuration describes
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Pointer storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite file holding session pointers
    ///
    /// Defaults to `pointers.db` in the platform data directory.
    #[serde(default)]
    pub pointer_db: Option<PathBuf>,

    /// Keep pointers in memory only (nothing survives a restart)
    #[serde(default)]
    pub ephemeral: bool,
}

/// Voice dictation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictationConfig {
    /// External speech-to-text command (program followed by arguments)
    ///
    /// The command must record one utterance and print the recognized text
    /// on stdout. When unset, voice input is reported as unsupported.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Recognition language, exported to the command as `MEDCHAT_DICTATION_LANG`
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en-US".to_string()
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            command: None,
            language: default_language(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Reply shown when the backend answers without an `answer` field
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,

    /// Synthetic reply shown when the backend cannot be reached
    #[serde(default = "default_connectivity_error")]
    pub connectivity_error: String,
}

fn default_fallback_answer() -> String {
    "AI could not process your query. Please try again.".to_string()
}

fn default_connectivity_error() -> String {
    "Server error! Please check if backend is running.".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_answer: default_fallback_answer(),
            connectivity_error: default_connectivity_error(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parse a YAML configuration file
    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MedchatError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents).map_err(MedchatError::from)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("MEDCHAT_BACKEND_URL") {
            self.backend.base_url = url;
        }

        if let Ok(timeout) = std::env::var("MEDCHAT_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.request_timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid MEDCHAT_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(user_id) = std::env::var("MEDCHAT_USER_ID") {
            self.user.id = user_id;
        }

        if let Ok(name) = std::env::var("MEDCHAT_USER_NAME") {
            self.user.name = name;
        }

        if let Ok(email) = std::env::var("MEDCHAT_USER_EMAIL") {
            self.user.email = email;
        }

        if let Ok(db) = std::env::var("MEDCHAT_POINTER_DB") {
            self.storage.pointer_db = Some(PathBuf::from(db));
        }

        if let Ok(language) = std::env::var("MEDCHAT_DICTATION_LANG") {
            self.dictation.language = language;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.backend_url {
            self.backend.base_url = url.clone();
        }
        if let Some(user_id) = &cli.user_id {
            self.user.id = user_id.clone();
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `MedchatError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(MedchatError::Config("backend.base_url cannot be empty".to_string()).into());
        }

        match url::Url::parse(&self.backend.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(MedchatError::Config(format!(
                    "backend.base_url must use http or https, got {}",
                    url.scheme()
                ))
                .into());
            }
            Err(e) => {
                return Err(MedchatError::Config(format!(
                    "backend.base_url is not a valid URL: {}",
                    e
                ))
                .into());
            }
        }

        if self.backend.request_timeout_seconds == Some(0) {
            return Err(MedchatError::Config(
                "backend.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.user.id.trim().is_empty() {
            return Err(MedchatError::Config("user.id cannot be empty".to_string()).into());
        }

        if let Some(command) = &self.dictation.command {
            if command.first().map_or(true, |program| program.trim().is_empty()) {
                return Err(MedchatError::Config(
                    "dictation.command must name a program".to_string(),
                )
                .into());
            }
        }

        if self.chat.fallback_answer.trim().is_empty()
            || self.chat.connectivity_error.trim().is_empty()
        {
            return Err(
                MedchatError::Config("chat reply texts cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
