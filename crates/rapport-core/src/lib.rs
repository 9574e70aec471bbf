pub mod config;
pub mod error;

pub use config::{ChatConfig, GeneralConfig, IngestConfig, RapportConfig};
pub use error::{RapportError, Result};
