//! Error types for artifact persistence.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while persisting artifacts.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A table's rows do not match its header width.
    #[error("table '{name}' row {row} has {actual} cells, expected {expected}")]
    RaggedTable {
        name: String,
        row: usize,
        expected: usize,
        actual: usize,
    },
}
