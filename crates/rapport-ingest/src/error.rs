//! Error types for file ingestion.

use std::fmt;

use rapport_core::error::RapportError;
use serde::Serialize;

/// Errors that abort an ingestion call.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload is not the expected shape (e.g. a JSON object where an
    /// array was required, or a ragged CSV row).
    #[error("format error: {0}")]
    Format(String),
    /// The payload parsed but produced no usable records.
    #[error("data error: {0}")]
    Data(String),
    /// Writing the table failed, including column collisions.
    #[error("storage error: {0}")]
    Storage(String),
    #[error("unsupported file type: {0} (expected .csv, .json or .jsonl)")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RapportError> for IngestError {
    fn from(err: RapportError) -> Self {
        match err {
            RapportError::Io(e) => IngestError::Io(e),
            other => IngestError::Storage(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(err: rusqlite::Error) -> Self {
        IngestError::Storage(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::Format(format!("invalid CSV: {}", err))
    }
}

/// A malformed input line that was skipped. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number in the source payload.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
