//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `LIBRARY_AI_API_URL` - Base URL of the library service (default: `http://127.0.0.1:5000/api`)
//! - `LIBRARY_AI_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `LIBRARY_AI_CREDENTIAL_DIR` - Directory holding the persisted credential
//!   (default: `$HOME/.library-ai`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CREDENTIAL_DIR_NAME: &str = ".library-ai";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is appended to
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Directory for the persisted credential
    pub credential_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value, or if
    /// no credential directory is configured and `HOME` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_url = parse_api_url(&get_or_default("LIBRARY_AI_API_URL", DEFAULT_API_URL))?;

        let timeout_secs = get_or_default("LIBRARY_AI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .trim()
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LIBRARY_AI_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "LIBRARY_AI_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let credential_dir = match lookup("LIBRARY_AI_CREDENTIAL_DIR").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => lookup("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(DEFAULT_CREDENTIAL_DIR_NAME))
                .ok_or_else(|| ConfigError::MissingEnvVar("LIBRARY_AI_CREDENTIAL_DIR".to_string()))?,
        };

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            credential_dir,
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
        })
    }

    /// Base URL without a trailing slash, ready for `{base}{path}` joins.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.api_url.as_str().trim_end_matches('/').to_string()
    }
}

fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("LIBRARY_AI_API_URL".to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEnvVar(
            "LIBRARY_AI_API_URL".to_string(),
            format!("unsupported scheme '{other}'"),
        )),
    }
}
