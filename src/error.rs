//! Error types for catalog-crawler
//!
//! Two layers of errors exist:
//! - [`Error`] for run-level failures (configuration, input loading, durable writes).
//!   These propagate out of [`Crawler::run`](crate::Crawler::run) and end the process.
//! - [`FetchError`] for a single attempt against the catalog API. These never leave
//!   the fetch worker; they are retried and finally turned into a
//!   [`FailureRecord`](crate::types::FailureRecord).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog-crawler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length kept from a transport error message
pub const MAX_ERROR_MESSAGE_LEN: usize = 100;

/// Main error type for catalog-crawler
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch_size")
        key: Option<String>,
    },

    /// I/O error without a more specific location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing an output file failed
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        /// The file or directory being accessed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// HTTP client could not be built
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The identifier list could not be loaded
    #[error("invalid input {}: {message}", path.display())]
    Input {
        /// The input file
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Config`] for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Build a [`Error::Storage`] for the given path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Failure of one attempt to fetch a product.
///
/// The `Display` output is what ends up in `error_message` of a failure record and
/// is what the error-kind classifier reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The API answered with a status other than 200
    #[error("HTTP {0}")]
    Status(u16),

    /// The request did not complete within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Connection, TLS, body or decode failure (message already truncated)
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    /// Build a [`FetchError::Transport`], truncating the message to
    /// [`MAX_ERROR_MESSAGE_LEN`] characters.
    pub fn transport(message: impl std::fmt::Display) -> Self {
        FetchError::Transport(crate::utils::truncate_chars(
            &message.to_string(),
            MAX_ERROR_MESSAGE_LEN,
        ))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::transport(e)
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_matches_failure_message_format() {
        assert_eq!(FetchError::Status(500).to_string(), "HTTP 500");
        assert_eq!(FetchError::Timeout.to_string(), "Request timeout");
        assert_eq!(
            FetchError::Transport("connection reset".to_string()).to_string(),
            "connection reset"
        );
    }

    #[test]
    fn transport_message_is_truncated() {
        let long = "x".repeat(250);
        match FetchError::transport(&long) {
            FetchError::Transport(msg) => assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn config_error_carries_key() {
        let err = Error::config("batch_size", "must be greater than zero");
        match &err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("batch_size")),
            other => panic!("unexpected variant {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "configuration error: must be greater than zero"
        );
    }

    #[test]
    fn storage_error_mentions_path() {
        let err = Error::storage(
            "/tmp/out/products_1.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out/products_1.json"));
    }
}
