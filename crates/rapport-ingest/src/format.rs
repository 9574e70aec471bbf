//! Accepted upload formats.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::IngestError;

/// File extensions the upload layer accepts, with leading dot.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".csv", ".json", ".jsonl"];

/// The three ingestion modes. Each has its own parser feeding the common
/// flatten and rectangularize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestFormat {
    Csv,
    JsonArray,
    Jsonl,
}

impl IngestFormat {
    /// Match an extension, with or without the leading dot, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::JsonArray),
            "jsonl" => Some(Self::Jsonl),
            _ => None,
        }
    }

    /// Pick the format from a file path's extension.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| {
            IngestError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", ext)
            })
        })
    }

    /// Short name used in the ingestion registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::JsonArray => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for IngestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| IngestError::UnsupportedFormat(s.to_string()))
    }
}
