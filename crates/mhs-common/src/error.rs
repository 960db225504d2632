//! Error types for the survey pipeline.
//!
//! The taxonomy mirrors how failures propagate through a run:
//! - Schema violations (a required column is missing) are fatal; the
//!   enclosing run aborts with no partial output for that stage.
//! - Analysis conditions (degenerate designs) surface as errors from the
//!   engine that hit them but never abort the whole run.
//! - Configuration and I/O errors are fatal at startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping and propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The input frame does not match the fixed survey schema.
    Schema,
    /// A statistical computation hit a degenerate design.
    Analysis,
    /// Configuration file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Schema => write!(f, "schema"),
            ErrorCategory::Analysis => write!(f, "analysis"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the survey pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("required column missing: {column}")]
    MissingColumn { column: String },

    #[error("column length mismatch: {column} has {actual} rows, frame has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("degenerate analysis design: {0}")]
    Degenerate(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("artifact store error: {0}")]
    Artifact(String),
}

impl Error {
    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingColumn { .. } | Error::LengthMismatch { .. } => ErrorCategory::Schema,
            Error::Degenerate(_) => ErrorCategory::Analysis,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Csv(_) | Error::Artifact(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error must abort the enclosing pipeline run.
    ///
    /// Analysis-level conditions are terminal for the engine that hit
    /// them but leave the rest of the fan-out running.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Analysis)
    }
}
