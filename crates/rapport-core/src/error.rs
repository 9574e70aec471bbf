use thiserror::Error;

/// Top-level error type for Rapport.
///
/// Subsystem crates define their own error types and implement
/// `From<RapportError>` so that storage and config failures raised here
/// propagate with `?` across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RapportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for RapportError {
    fn from(err: toml::de::Error) -> Self {
        RapportError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RapportError {
    fn from(err: toml::ser::Error) -> Self {
        RapportError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RapportError {
    fn from(err: serde_json::Error) -> Self {
        RapportError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Rapport operations.
pub type Result<T> = std::result::Result<T, RapportError>;
