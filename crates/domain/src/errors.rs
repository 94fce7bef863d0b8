//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for RateWatch
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RateWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for RateWatch operations
pub type Result<T> = std::result::Result<T, RateWatchError>;

/// Classification of a failed backend interaction.
///
/// Drives both the retry decision inside the query client and the failure
/// accounting on [`crate::types::FailureRecord`]: timeouts, network errors
/// and 5xx/429 responses are transient; everything else is permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request exceeded the per-request timeout.
    Timeout,
    /// Connection-level failure (DNS, refused, reset).
    Network,
    /// The backend answered with a non-success HTTP status.
    Http(u16),
    /// The body could not be parsed into the expected shape.
    MalformedResponse,
}

impl FailureKind {
    /// Whether a failure of this kind is worth another attempt.
    pub fn is_transient(self) -> bool {
        match self {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::Http(status) => status >= 500 || status == 429,
            FailureKind::MalformedResponse => false,
        }
    }

    /// Stable label suitable for metrics/logging.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Network => "network",
            FailureKind::Http(_) => "http",
            FailureKind::MalformedResponse => "malformed_response",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Http(status) => write!(f, "http status {status}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Error returned by backend query operations.
///
/// Carries the failure classification and how many attempts the client
/// spent before giving up, so per-metric failures can be recorded without
/// losing either piece of information.
#[derive(Debug, Error)]
#[error("backend query failed after {attempts} attempt(s): {kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub attempts: u32,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: FailureKind, attempts: u32, message: impl Into<String>) -> Self {
        Self { kind, attempts, message: message.into() }
    }
}

impl From<BackendError> for RateWatchError {
    fn from(err: BackendError) -> Self {
        match err.kind {
            FailureKind::Timeout | FailureKind::Network => {
                RateWatchError::Network(err.to_string())
            }
            FailureKind::Http(_) | FailureKind::MalformedResponse => {
                RateWatchError::Backend(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_are_retryable() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::Network.is_transient());
        assert!(FailureKind::Http(500).is_transient());
        assert!(FailureKind::Http(503).is_transient());
        assert!(FailureKind::Http(429).is_transient());
    }

    #[test]
    fn permanent_kinds_are_not_retryable() {
        assert!(!FailureKind::Http(400).is_transient());
        assert!(!FailureKind::Http(401).is_transient());
        assert!(!FailureKind::Http(404).is_transient());
        assert!(!FailureKind::MalformedResponse.is_transient());
    }

    #[test]
    fn backend_error_converts_by_kind() {
        let network = BackendError::new(FailureKind::Network, 3, "connection refused");
        assert!(matches!(RateWatchError::from(network), RateWatchError::Network(_)));

        let malformed = BackendError::new(FailureKind::MalformedResponse, 1, "bad json");
        assert!(matches!(RateWatchError::from(malformed), RateWatchError::Backend(_)));
    }
}
