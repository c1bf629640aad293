//! Agent Configuration Module
//!
//! Loads settings from environment variables and owns the small JSON state
//! file that carries the conversation id across restarts.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub nl_url: String,
    pub access_token: Option<String>,
    pub state_file: PathBuf,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `HEARTH_SERVER_URL`: Base URL of the dialogue service. Required.
    // *   `HEARTH_NL_URL`: Base URL of the speech-to-text service. Required.
    // *   `HEARTH_ACCESS_TOKEN`: (Optional) Bearer token for the dialogue service.
    // *   `HEARTH_STATE_FILE`: (Optional) Path of the persisted state file. Defaults to "hearth-state.json".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO". Can be "TRACE", "DEBUG", "INFO", "WARN", or "ERROR".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();

        let server_url = env::var("HEARTH_SERVER_URL")
            .map_err(|_| ConfigError::MissingVar("HEARTH_SERVER_URL".to_string()))?;
        let nl_url = env::var("HEARTH_NL_URL")
            .map_err(|_| ConfigError::MissingVar("HEARTH_NL_URL".to_string()))?;

        let access_token = env::var("HEARTH_ACCESS_TOKEN").ok();

        // Provide a default for non-critical variables.
        let state_file =
            env::var("HEARTH_STATE_FILE").unwrap_or_else(|_| "hearth-state.json".to_string());

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            server_url,
            nl_url,
            access_token,
            state_file: PathBuf::from(state_file),
            log_level,
        })
    }
}

/// State the agent keeps across restarts. Currently only the conversation
/// id handed out by the dialogue service, so reconnects resume the same
/// conversation.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct PersistedState {
    pub conversation_id: Option<String>,
}

impl PersistedState {
    /// Read the state file; a missing or unreadable file yields the
    /// default state rather than an error.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("ignoring corrupt state file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("failed to serialize state")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write state file {}", path.display()))
    }
}
