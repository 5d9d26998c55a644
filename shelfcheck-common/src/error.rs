//! Common error types for shelfcheck

use thiserror::Error;

/// Common result type for shelfcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the shelfcheck crates
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing session configuration field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request could not be sent or no response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body could not be parsed
    #[error("Invalid JSON response: {0}")]
    InvalidResponse(String),

    /// Server answered with an `{error}` payload
    #[error("API error: {0}")]
    Api(String),

    /// Persistence failure for a single logical key
    #[error("Storage error for key '{key}': {message}")]
    Storage { key: String, message: String },

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the current session phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// CSV report generation failed
    #[error("CSV error: {0}")]
    Csv(String),
}

impl Error {
    /// Build a storage error for `key`
    pub fn storage(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
