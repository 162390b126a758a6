//! Error types for the explorer
//!
//! [`Error`] is what every fallible operation returns. Failures at the HTTP
//! boundary are carried as a tagged [`TransportError`] so that
//! classification (see [`crate::classify`]) is an exhaustive match instead
//! of shape inspection.

use thiserror::Error;

/// Result type alias for explorer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure observed at the transport boundary
///
/// Produced by [`crate::NasaApi`] implementations and propagated untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("HTTP {status} {reason} ({url})")]
    Status {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase (may be empty)
        reason: String,
        /// Request URL with the API key stripped
        url: String,
    },

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout {
        /// Configured timeout in seconds, if any
        timeout_secs: Option<u64>,
    },

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// The response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Any other request failure
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Create a status error
    pub fn status(status: u16, reason: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
            url: url.into(),
        }
    }

    /// HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Core error type for the explorer
#[derive(Error, Debug)]
pub enum Error {
    /// Transport/API failure from the remote data client
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Client-side validation failure
    #[error("Invalid {field}: {value}")]
    Validation {
        /// Name of the rejected field (e.g. "date", "sol", "photo_count")
        field: String,
        /// Rejected value, as entered
        value: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, value: impl ToString) -> Self {
        Self::Validation {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport status error
    pub fn http_status(status: u16, reason: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Transport(TransportError::status(status, reason, url))
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_only_for_status_variant() {
        assert_eq!(TransportError::status(429, "Too Many Requests", "/x").status_code(), Some(429));
        assert_eq!(TransportError::Timeout { timeout_secs: None }.status_code(), None);
    }

    #[test]
    fn validation_error_display() {
        let err = Error::validation("sol", 5000);
        assert_eq!(err.to_string(), "Invalid sol: 5000");
    }
}
