//! Error types for album-dl
//!
//! Two layers of errors exist:
//! - [`Error`] covers setup-phase and run-level failures (configuration, report loading,
//!   destination directory problems). These abort the whole run.
//! - [`FetchError`] covers a single work item. These are caught by the scheduler,
//!   counted, and never escalate past the item that produced them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for album-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for album-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error while building or using the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error (malformed JSON input)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The report document parsed but does not have the expected shape
    #[error("invalid report: {0}")]
    InvalidReport(String),

    /// The destination path exists but is not a directory
    #[error("destination {0} exists and is not a directory")]
    NotADirectory(PathBuf),

    /// Input file or resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Per-item fetch errors
///
/// Every variant is terminal for its work item. Only [`FetchError::Transport`] is
/// retried, and only within the configured retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source URL could not be parsed or uses a scheme outside the allow-list
    #[error("invalid source {url}: {reason}")]
    InvalidSource {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The server answered with something other than 200 OK
    #[error("HTTP status {status}")]
    Http {
        /// Response status code
        status: u16,
    },

    /// Declared or received byte count is below the validity threshold
    #[error("size violation: declared {declared:?}, received {actual} bytes, minimum {minimum}")]
    SizeViolation {
        /// Content-Length announced by the server, if any
        declared: Option<u64>,
        /// Bytes actually written before the check failed
        actual: u64,
        /// Minimum accepted size in bytes
        minimum: u64,
    },

    /// The attempt exceeded its time budget
    #[error("timed out after {after:?}")]
    Timeout {
        /// Time budget that was exceeded
        after: Duration,
    },

    /// Connection-level failure (refused, reset, DNS, broken body stream)
    #[error("transport failure: {0}")]
    Transport(String),

    /// Local write failure (cannot create or write the destination file)
    #[error("local I/O failure: {0}")]
    Io(String),
}

impl FetchError {
    /// Machine-readable error kind, used when tallying failures in summaries
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::InvalidSource { .. } => "invalid_source",
            FetchError::Http { .. } => "http_error",
            FetchError::SizeViolation { .. } => "size_violation",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Transport(_) => "transport_failure",
            FetchError::Io(_) => "io_error",
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}
