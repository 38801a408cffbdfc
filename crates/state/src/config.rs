//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `WONDER_STORE_PATH` - JSON store file (default: wonder-store.json)
//! - `WONDER_CONTEXT_ID` - Fixed execution-context id (default: random UUID)
//! - `WONDER_POLL_INTERVAL_SECS` - Fallback polling interval (default: 5)
//! - `WONDER_PREVIEW_CHARS` - Notification preview length (default: 50)
//! - `WONDER_STORE_QUOTA_BYTES` - Simulated storage quota (default: none)
//! - `WONDER_LOG_FORMAT` - `text` or `json` (default: text)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::store::ContextId;

const DEFAULT_STORE_PATH: &str = "wonder-store.json";
const DEFAULT_POLL_INTERVAL_SECS: &str = "5";
const DEFAULT_PREVIEW_CHARS: &str = "50";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Runtime configuration for one execution context.
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Location of the JSON-file store
    pub store_path: PathBuf,
    /// Fixed context id; `None` means generate one
    pub context_id: Option<String>,
    /// Interval for the fallback polling loop
    pub poll_interval: Duration,
    /// Characters of message text quoted in notification bodies
    pub preview_chars: usize,
    /// Optional quota applied to the store backend
    pub store_quota_bytes: Option<usize>,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            context_id: None,
            poll_interval: Duration::from_secs(5),
            preview_chars: 50,
            store_quota_bytes: None,
            log_format: LogFormat::Text,
        }
    }
}

impl StateConfig {
    /// Load configuration from the environment.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is present but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_path = PathBuf::from(get_or("WONDER_STORE_PATH", DEFAULT_STORE_PATH));
        let context_id = lookup("WONDER_CONTEXT_ID").filter(|s| !s.trim().is_empty());

        let poll_secs = parse_var::<u64>(
            "WONDER_POLL_INTERVAL_SECS",
            &get_or("WONDER_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
        )?;
        if poll_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "WONDER_POLL_INTERVAL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let preview_chars = parse_var::<usize>(
            "WONDER_PREVIEW_CHARS",
            &get_or("WONDER_PREVIEW_CHARS", DEFAULT_PREVIEW_CHARS),
        )?;

        let store_quota_bytes = lookup("WONDER_STORE_QUOTA_BYTES")
            .map(|raw| parse_var::<usize>("WONDER_STORE_QUOTA_BYTES", &raw))
            .transpose()?;

        let log_format = match get_or("WONDER_LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "WONDER_LOG_FORMAT".to_string(),
                    format!("expected text or json, got {other}"),
                ));
            }
        };

        Ok(Self {
            store_path,
            context_id,
            poll_interval: Duration::from_secs(poll_secs),
            preview_chars,
            store_quota_bytes,
            log_format,
        })
    }

    /// The context id to write as.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context_id
            .as_ref()
            .map_or_else(ContextId::generate, ContextId::named)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
