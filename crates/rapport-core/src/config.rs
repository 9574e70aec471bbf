use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RapportError, Result};

/// Top-level configuration for the Rapport application.
///
/// Loaded from `~/.rapport/config.toml` by default. Each section is handed
/// to the subsystem that owns it at construction time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RapportConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl RapportConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RapportConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RapportError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.rapport/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// File ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Separator joining nested key paths and array indexes.
    pub delimiter: String,
    /// Number of rows returned as a preview after ingestion.
    pub sample_rows: usize,
    /// Prefix added to table names that do not start with a letter.
    pub table_prefix: String,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: "__".to_string(),
            sample_rows: 5,
            table_prefix: "table_".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Chat assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages kept in the conversation buffer.
    pub max_history: usize,
    /// Longest accepted user message, in characters.
    pub max_message_length: usize,
    /// Model name reported by the LLM client.
    pub model: String,
    /// Entries kept in the model metadata cache.
    pub model_cache_capacity: usize,
    /// Prompt prepended when handing history to a model.
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: 20,
            max_message_length: 4000,
            model: "mock".to_string(),
            model_cache_capacity: 8,
            system_prompt: "You are a helpful assistant for a personal contact database. \
                            Answer questions about contacts, tags, and notes."
                .to_string(),
        }
    }
}
