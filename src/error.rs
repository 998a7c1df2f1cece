//! Error types for the chat client.

use thiserror::Error;

/// Errors surfaced by the chat client.
#[derive(Debug, Error)]
pub enum ProsaError {
    /// Configuration error (missing environment variable, bad path)
    #[error("configuration error: {0}")]
    Config(String),

    /// API returned a non-success response
    #[error("API request failed: {0}")]
    Api(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema migration error
    #[error("migration error: {0}")]
    Migration(String),

    /// Query error (lock poisoning, row decoding)
    #[error("query error: {0}")]
    Query(String),

    /// Rate table file error
    #[error("rate table error: {0}")]
    RateTable(String),

    /// Ledger export error
    #[error("ledger export error: {0}")]
    Export(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProsaError {
    /// Check if this error came from the remote call (network or API).
    ///
    /// Remote faults are recovered locally by the command loop; everything
    /// else in the prompt path indicates a local persistence problem.
    pub fn is_remote_error(&self) -> bool {
        matches!(self, ProsaError::Api(_) | ProsaError::Http(_))
    }
}

/// Result type for chat client operations.
pub type Result<T> = std::result::Result<T, ProsaError>;
