//! CLI argument definitions for the Rapport application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rapport_ingest::IngestFormat;

/// Rapport: turn CSV/JSON exports into tables and ask questions about them.
#[derive(Parser, Debug)]
#[command(name = "rapport", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a .csv, .json, or .jsonl file into a table.
    Ingest {
        /// File to ingest.
        file: PathBuf,

        /// Table name. Defaults to the file name.
        #[arg(short = 't', long = "table")]
        table: Option<String>,

        /// Input format (csv, json, jsonl). Defaults to the file extension.
        #[arg(short = 'f', long = "format")]
        format: Option<IngestFormat>,
    },

    /// List ingested tables.
    Tables {
        /// Print the registry as JSON.
        #[arg(long = "json")]
        json: bool,
    },

    /// Chat with the assistant about your data.
    Chat {
        /// Answer a single message and exit instead of starting a session.
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > RAPPORT_CONFIG env var > ~/.rapport/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("RAPPORT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > config file value. A leading `~/` is
    /// expanded to the home directory.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> PathBuf {
        match self.data_dir {
            Some(ref p) => p.clone(),
            None => expand_home(config_data_dir),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value. `RUST_LOG`, when
    /// set, overrides both at subscriber setup.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Expand `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(path),
    }
}

/// Default config file path.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".rapport").join("config.toml");
    }
    PathBuf::from("config.toml")
}
