//! Error types for pagewise
//!
//! This module defines the error hierarchy for the whole crate.
//! Network and query-construction errors reach the caller. Validation and
//! stale-response errors are recovered where they occur.

use std::sync::Arc;
use thiserror::Error;

/// The main error type for pagewise
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Network Errors
    // ============================================================================
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Query Errors
    // ============================================================================
    #[error("Invalid query: {message}")]
    QueryConstruction { message: String },

    #[error("Document store error: {message}")]
    Store { message: String },

    // ============================================================================
    // Locally Recovered Errors
    // ============================================================================
    #[error("Rejected input: {message}")]
    Validation { message: String },

    #[error("Stale response for query generation {actual} (current is {expected})")]
    StaleResponse { expected: u64, actual: u64 },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// An error delivered to every waiter of a deduplicated request
    #[error(transparent)]
    Shared(Arc<Error>),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a query construction error
    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryConstruction {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a document store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            Error::Shared(inner) => inner.status(),
            _ => None,
        }
    }

    /// Whether this is a network-level failure (unreachable or non-2xx)
    pub fn is_network(&self) -> bool {
        match self {
            Error::Network(_) | Error::HttpStatus { .. } => true,
            Error::Shared(inner) => inner.is_network(),
            _ => false,
        }
    }

    /// Whether a caller-side retry policy may try again.
    ///
    /// Throttling (429), server-side failures (5xx other than 501) and
    /// transport timeouts or refused connections qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::HttpStatus { status, .. } => {
                *status == 429 || ((500..600).contains(status) && *status != 501)
            }
            Error::Shared(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for pagewise
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix an error with what was being attempted
pub trait ResultExt<T> {
    fn context(self, what: &str) -> Result<T>;

    /// Like `context`, building the message only on failure
    fn with_context(self, what: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, what: &str) -> Result<T> {
        self.with_context(|| what.to_string())
    }

    fn with_context(self, what: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| Error::Other(format!("{}: {}", what(), e.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::query("sort field 'price' conflicts with range on 'rating'");
        assert_eq!(
            err.to_string(),
            "Invalid query: sort field 'price' conflicts with range on 'rating'"
        );

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::StaleResponse {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Stale response for query generation 2 (current is 3)"
        );
    }

    #[test]
    fn test_status_through_shared() {
        let err = Error::Shared(Arc::new(Error::http_status(503, "")));
        assert_eq!(err.status(), Some(503));
        assert!(err.is_network());
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "HTTP 503: ");
    }

    #[test]
    fn test_is_retryable() {
        for status in [429, 500, 502, 503, 504] {
            assert!(Error::http_status(status, "").is_retryable(), "{status}");
        }
        for status in [400, 404, 501] {
            assert!(!Error::http_status(status, "").is_retryable(), "{status}");
        }
        assert!(!Error::query("bad").is_retryable());
        assert!(!Error::validation("bad").is_network());
    }

    #[test]
    fn test_result_context() {
        let missing: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = missing.context("Failed to read orders.yaml").unwrap_err();
        assert_eq!(err.to_string(), "Failed to read orders.yaml: IO error: gone");
    }
}
