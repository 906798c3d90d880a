//! Error types for `unrelated-mockserver-client`.
//!
//! Every failure surfaced by the client is one of the variants below. Transport failures are
//! classified once, where reqwest reports them; after that a `MockServerError` is only ever
//! passed through.

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use thiserror::Error;

/// Discriminant of a [`MockServerError`], stable across releases.
///
/// Serializes as the kebab-case names callers branch on (`connection-failed`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ConnectionFailed,
    ConnectionTimeout,
    RemoteError,
    VerificationMismatch,
    InvalidParameters,
    UnknownError,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionFailed => "connection-failed",
            Self::ConnectionTimeout => "connection-timeout",
            Self::RemoteError => "remote-error",
            Self::VerificationMismatch => "verification-mismatch",
            Self::InvalidParameters => "invalid-parameters",
            Self::UnknownError => "unknown-error",
        }
    }

    /// Whether this kind means the MockServer instance could not be reached at all.
    #[must_use]
    pub fn is_unreachable(self) -> bool {
        matches!(self, Self::ConnectionFailed | Self::ConnectionTimeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for MockServer operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MockServerError {
    /// The transport could not reach the host (refused, DNS, network failure).
    #[error("Failed to connect to MockServer at {base_url}: {message}")]
    ConnectionFailed { base_url: String, message: String },

    /// The call was abandoned after exceeding the configured budget.
    #[error("Request to MockServer at {base_url} timed out after {timeout_ms}ms")]
    ConnectionTimeout { base_url: String, timeout_ms: u64 },

    /// Non-success status that is not special-cased by the endpoint.
    #[error("MockServer returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// Negative verification answer (406 from `/mockserver/verify`).
    #[error("Verification failed: {body}")]
    VerificationMismatch { body: String },

    /// Arguments rejected before any request was made.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for MockServer operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

impl MockServerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::ConnectionTimeout { .. } => ErrorKind::ConnectionTimeout,
            Self::Remote { .. } => ErrorKind::RemoteError,
            Self::VerificationMismatch { .. } => ErrorKind::VerificationMismatch,
            Self::InvalidParameters(_) => ErrorKind::InvalidParameters,
            Self::Unknown(_) => ErrorKind::UnknownError,
        }
    }

    /// Machine-readable detail map (`baseUrl`, `timeoutMs`, `statusCode`, `body`).
    ///
    /// Keys are only present when the variant carries them.
    #[must_use]
    pub fn details(&self) -> Map<String, Value> {
        let mut out = Map::new();
        match self {
            Self::ConnectionFailed { base_url, message } => {
                out.insert("baseUrl".to_string(), json!(base_url));
                out.insert("cause".to_string(), json!(message));
            }
            Self::ConnectionTimeout {
                base_url,
                timeout_ms,
            } => {
                out.insert("baseUrl".to_string(), json!(base_url));
                out.insert("timeoutMs".to_string(), json!(timeout_ms));
            }
            Self::Remote { status, body } => {
                out.insert("statusCode".to_string(), json!(status));
                out.insert("body".to_string(), json!(body));
            }
            Self::VerificationMismatch { body } => {
                out.insert("statusCode".to_string(), json!(406));
                out.insert("body".to_string(), json!(body));
            }
            Self::InvalidParameters(_) | Self::Unknown(_) => {}
        }
        out
    }

    /// `{kind, message, details}` as a single JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "kind": self.kind(),
            "message": self.to_string(),
            "details": self.details(),
        })
    }
}

impl From<serde_json::Error> for MockServerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Unknown(format!("JSON error: {value}"))
    }
}
