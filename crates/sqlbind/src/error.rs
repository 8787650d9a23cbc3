//! Error types for the statement binding layer

use thiserror::Error;

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by statements and the native handle
#[derive(Debug, Error)]
pub enum Error {
    /// Column-name count disagrees with the column-value count of a row
    #[error("row shape mismatch: {columns} column names but {values} values")]
    ShapeMismatch { columns: usize, values: usize },

    /// Operation invoked on a finalized statement
    #[error("statement has been finalized")]
    Finalized,

    /// Failure reported by the SQLite engine (SQL errors, constraints, I/O)
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Parameter the binding boundary cannot carry
    #[error("invalid bind parameter: {0}")]
    InvalidParameter(String),

    /// Row could not be decoded into the requested type
    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid database configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Blocking-pool task panicked or was cancelled
    #[error("blocking task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}
