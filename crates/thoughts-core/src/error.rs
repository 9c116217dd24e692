//! Error types for thoughts-core

use thiserror::Error;

/// Result type alias using thoughts-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in local thoughts-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Thought not found
    #[error("Thought not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A version-checked replace observed a newer store version
    #[error("Stale write: store is at version {current}, write expected {expected}")]
    StaleWrite {
        /// Version the writer read
        expected: u64,
        /// Version the store holds now
        current: u64,
    },
}
