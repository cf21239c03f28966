//! Application Configuration Module
//!
//! Loads the interviewer's settings from environment variables. Session
//! parameters (role, level, ...) come from the command line instead.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// How questions are spoken and answers captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechProvider {
    /// Questions are printed and answers typed.
    Console,
    /// Questions are spoken and answers transcribed by Gemini Live.
    GeminiLive,
}

/// Holds all configuration loaded from the environment.
pub struct Config {
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub gemini_live_url: String,
    pub speech_provider: SpeechProvider,
    pub listen_timeout: Duration,
    pub data_dir: PathBuf,
    pub prompts_dir: Option<PathBuf>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY`: Your secret key for the Gemini API. Required.
    // *   `GEMINI_MODEL`: (Optional) Model for questions and evaluation. Defaults to "gemini-1.5-flash".
    // *   `GEMINI_LIVE_URL`: (Optional) WebSocket endpoint of the Live speech service.
    // *   `SPEECH_PROVIDER`: (Optional) "console" or "gemini-live". Defaults to "console".
    // *   `LISTEN_TIMEOUT_SECS`: (Optional) How long to wait for a spoken answer. Defaults to 60.
    // *   `DATA_DIR`: (Optional) Where interviews are saved. Defaults to "data".
    // *   `PROMPTS_DIR`: (Optional) Directory of `.md` prompt overrides.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gemini_api_key = var("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let gemini_model = var("GEMINI_MODEL")
            .unwrap_or_else(|| intervu_gemini::client::DEFAULT_MODEL.to_string());
        let gemini_live_url = var("GEMINI_LIVE_URL")
            .unwrap_or_else(|| intervu_gemini::live::DEFAULT_LIVE_URL.to_string());

        let provider_str = var("SPEECH_PROVIDER").unwrap_or_else(|| "console".to_string());
        let speech_provider = match provider_str.trim().to_lowercase().as_str() {
            "console" => SpeechProvider::Console,
            "gemini-live" | "gemini" => SpeechProvider::GeminiLive,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SPEECH_PROVIDER".to_string(),
                    format!("'{other}' is not one of console, gemini-live"),
                ));
            }
        };

        let timeout_str = var("LISTEN_TIMEOUT_SECS").unwrap_or_else(|| "60".to_string());
        let listen_timeout = timeout_str
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "LISTEN_TIMEOUT_SECS".to_string(),
                    format!("'{timeout_str}' is not a positive number of seconds"),
                )
            })?;

        let data_dir = PathBuf::from(var("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let prompts_dir = var("PROMPTS_DIR").map(PathBuf::from);

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{log_level_str}' is not a valid log level"),
            )
        })?;

        Ok(Self {
            gemini_api_key,
            gemini_model,
            gemini_live_url,
            speech_provider,
            listen_timeout,
            data_dir,
            prompts_dir,
            log_level,
        })
    }
}
