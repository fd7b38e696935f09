//! Error types for the Library AI client.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use library_ai_core::FormError;

use crate::config::ConfigError;

/// Body of a non-2xx response.
///
/// The service answers failures with `{"message": ...}`, `{"errors": {...}}`
/// or, for token failures, `{"msg": ...}`. Anything else leaves both fields
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    /// HTTP status code.
    pub status: u16,
    /// Server-provided message, if any.
    pub message: Option<String>,
    /// Field name → message.
    pub errors: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, serde_json::Value>,
}

impl ErrorPayload {
    /// Build a payload from a status code and a raw response body.
    #[must_use]
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let Ok(raw) = serde_json::from_slice::<RawErrorBody>(body) else {
            return Self {
                status,
                ..Self::default()
            };
        };

        let errors = raw
            .errors
            .into_iter()
            .map(|(field, value)| {
                let message = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (field, message)
            })
            .collect();

        Self {
            status,
            message: raw
                .message
                .filter(|m| !m.trim().is_empty())
                .or_else(|| raw.msg.filter(|m| !m.trim().is_empty())),
            errors,
        }
    }

    /// Server message, else the field messages joined, else `None`.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        if self.errors.is_empty() {
            return None;
        }
        Some(self.errors.values().cloned().collect::<Vec<_>>().join(" "))
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.summary() {
            Some(summary) => write!(f, "{} ({summary})", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// A failed exchange with the library service.
///
/// `Clone` so that every caller sharing a coalesced fetch receives the same
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// 401. The session has expired unless the request was anonymous.
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorPayload),

    /// 403. The session is valid but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(ErrorPayload),

    /// 400 or 422.
    #[error("Validation failed: {0}")]
    Validation(ErrorPayload),

    /// 404.
    #[error("Not found: {0}")]
    NotFound(ErrorPayload),

    /// 409.
    #[error("Conflict: {0}")]
    Conflict(ErrorPayload),

    /// Any other non-2xx status.
    #[error("Unexpected status: {0}")]
    Status(ErrorPayload),

    /// A 2xx response whose body could not be decoded.
    #[error("Invalid response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Map a non-2xx status and its body to an error.
    #[must_use]
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let payload = ErrorPayload::from_body(status, body);
        match status {
            400 | 422 => Self::Validation(payload),
            401 => Self::Unauthorized(payload),
            403 => Self::Forbidden(payload),
            404 => Self::NotFound(payload),
            409 => Self::Conflict(payload),
            _ => Self::Status(payload),
        }
    }

    /// The structured payload for status-bearing variants.
    #[must_use]
    pub const fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Unauthorized(p)
            | Self::Forbidden(p)
            | Self::Validation(p)
            | Self::NotFound(p)
            | Self::Conflict(p)
            | Self::Status(p) => Some(p),
            Self::Network(_) | Self::Parse(_) => None,
        }
    }

    /// HTTP status, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.payload().map(|p| p.status)
    }

    /// Field-level messages returned by the server.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        self.payload()
            .map(|p| &p.errors)
            .filter(|errors| !errors.is_empty())
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Text suitable for showing to a person.
    ///
    /// Prefers the server's own message, then its field messages, then a
    /// generic description of the failure.
    #[must_use]
    pub fn display_message(&self) -> String {
        if let Some(summary) = self.payload().and_then(ErrorPayload::summary) {
            return summary;
        }
        match self {
            Self::Network(_) => "Could not reach the library service.".to_string(),
            Self::Unauthorized(_) => "Please log in to continue.".to_string(),
            Self::Forbidden(_) => "You do not have permission to do that.".to_string(),
            Self::Validation(_) => "The request was not valid.".to_string(),
            Self::NotFound(_) => "Not found.".to_string(),
            Self::Conflict(_) => "That conflicts with existing data.".to_string(),
            Self::Status(p) => format!("Request failed with status {}.", p.status),
            Self::Parse(_) => "Unexpected response from the library service.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Any error surfaced by the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid input: {0}")]
    Form(#[from] FormError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Text suitable for showing to a person.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Api(e) => e.display_message(),
            Self::Form(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result alias for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
