//! Typed error types for the db crate.

use thiserror::Error;

/// Failures reported by a [`QueryStore`](crate::QueryStore).
#[derive(Debug, Error)]
pub enum DbError {
    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store rejected request ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    /// A response body or row could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("row not found")]
    NotFound,

    /// A single-row fetch matched more than one row.
    #[error("expected a single row, got {0}")]
    MultipleRows(usize),

    /// The query cannot be expressed against this store.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors raised while reading store configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value {key}")]
    Missing { key: &'static str },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
