//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. Credentials for the
//! identity provider and the advisor are optional: their absence degrades
//! to an error message (sign-in) or fallback text (advisor).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Gemini model used by the advisor.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase/GCP project hosting the `users` collection
    pub firebase_project_id: String,
    /// Firebase web API key (identity provider)
    pub firebase_api_key: Option<String>,
    /// Gemini API key (advisor)
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Directory holding pre-authentication local data
    pub local_data_dir: PathBuf,
    /// Attempts per persist before a write is dropped
    pub persist_max_attempts: u32,
    /// First retry delay; doubles on each further attempt
    pub persist_backoff_base: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            firebase_api_key: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            local_data_dir: PathBuf::from(".habit-data"),
            persist_max_attempts: 1,
            persist_backoff_base: Duration::from_millis(200),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let persist_max_attempts = match env::var("PERSIST_MAX_ATTEMPTS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("PERSIST_MAX_ATTEMPTS", raw))?,
            Err(_) => 1,
        };

        let persist_backoff_ms = match env::var("PERSIST_BACKOFF_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("PERSIST_BACKOFF_MS", raw))?,
            Err(_) => 200,
        };

        Ok(Self {
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| "t2sar-dream".to_string()),
            firebase_api_key: first_non_empty(&[
                "FIREBASE_API_KEY",
                "REACT_APP_FIREBASE_API_KEY",
                "API_KEY",
            ]),
            gemini_api_key: first_non_empty(&["GEMINI_API_KEY", "API_KEY"]),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            local_data_dir: env::var("LOCAL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".habit-data")),
            persist_max_attempts,
            persist_backoff_base: Duration::from_millis(persist_backoff_ms),
        })
    }
}

/// First variable in `keys` that is set to a non-blank value, trimmed.
///
/// Keys pasted from a console often carry trailing whitespace, which the
/// identity provider rejects as an invalid key.
fn first_non_empty(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
