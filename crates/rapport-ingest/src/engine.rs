//! Ingestion entry points.
//!
//! `IngestEngine` owns the storage handle and ingestion settings and routes
//! each upload through the parser for its format, the shared flatten and
//! rectangularize stage, and the materializer.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use rapport_core::config::IngestConfig;
use rapport_storage::Database;

use crate::error::IngestError;
use crate::format::IngestFormat;
use crate::materialize::{materialize, TableMetadata};
use crate::reader::{read_csv, read_json_array, RawTable};
use crate::sanitize::{is_valid_identifier, sanitize_with_prefix, DEFAULT_TABLE_PREFIX};
use crate::schema::{parse_jsonl, rectangularize};

/// Converts uploaded CSV/JSON/JSONL payloads into tables.
pub struct IngestEngine {
    db: Arc<Database>,
    config: IngestConfig,
}

impl IngestEngine {
    /// Create an engine writing to `db`.
    ///
    /// An unusable `table_prefix` (one that would not yield a valid
    /// identifier) falls back to `table_`.
    pub fn new(db: Arc<Database>, mut config: IngestConfig) -> Self {
        if !config.table_prefix.starts_with(|c: char| c.is_ascii_alphabetic())
            || !is_valid_identifier(&config.table_prefix)
        {
            warn!(
                prefix = %config.table_prefix,
                "Invalid table prefix in config, using {}", DEFAULT_TABLE_PREFIX
            );
            config.table_prefix = DEFAULT_TABLE_PREFIX.to_string();
        }
        Self { db, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest a CSV payload.
    pub fn convert_csv(&self, bytes: &[u8], table_name: &str) -> Result<TableMetadata, IngestError> {
        self.ingest(bytes, table_name, IngestFormat::Csv)
    }

    /// Ingest a JSON array of objects.
    pub fn convert_json(&self, bytes: &[u8], table_name: &str) -> Result<TableMetadata, IngestError> {
        self.ingest(bytes, table_name, IngestFormat::JsonArray)
    }

    /// Ingest newline-delimited JSON.
    pub fn convert_jsonl(&self, bytes: &[u8], table_name: &str) -> Result<TableMetadata, IngestError> {
        self.ingest(bytes, table_name, IngestFormat::Jsonl)
    }

    /// Ingest `bytes` as `format` into a table named after `table_name`.
    ///
    /// The table name is sanitized first. Any existing table with that name
    /// is replaced. Malformed JSONL lines are skipped and reported in
    /// [`TableMetadata::warnings`].
    pub fn ingest(
        &self,
        bytes: &[u8],
        table_name: &str,
        format: IngestFormat,
    ) -> Result<TableMetadata, IngestError> {
        if bytes.len() > self.config.max_upload_bytes {
            return Err(IngestError::Data(format!(
                "payload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.config.max_upload_bytes
            )));
        }

        let table_name = sanitize_with_prefix(table_name, &self.config.table_prefix);
        let delimiter = self.config.delimiter.as_str();

        let (raw, warnings): (RawTable, _) = match format {
            IngestFormat::Csv => (read_csv(bytes)?, Vec::new()),
            IngestFormat::JsonArray => (rectangularize(&read_json_array(bytes, delimiter)?), Vec::new()),
            IngestFormat::Jsonl => {
                let parsed = parse_jsonl(bytes, delimiter);
                if parsed.records.is_empty() {
                    return Err(IngestError::Data(format!(
                        "no valid records found in JSONL input ({} malformed lines skipped)",
                        parsed.warnings.len()
                    )));
                }
                (rectangularize(&parsed.records), parsed.warnings)
            }
        };

        let mut metadata = self.db.with_conn(|conn| {
            materialize(conn, &table_name, format, &raw, self.config.sample_rows)
        })?;
        metadata.warnings = warnings;

        info!(
            table = %metadata.table_name,
            format = %format,
            rows = metadata.row_count,
            columns = metadata.schema.len(),
            skipped = metadata.warnings.len(),
            "Ingestion complete"
        );
        Ok(metadata)
    }

    /// Read a file and ingest it, choosing the format from its extension.
    ///
    /// Without an explicit `table_name` the file name is used.
    pub fn ingest_file(
        &self,
        path: &Path,
        table_name: Option<&str>,
    ) -> Result<TableMetadata, IngestError> {
        let format = IngestFormat::from_path(path)?;
        self.ingest_file_as(path, table_name, format)
    }

    /// Read a file and ingest it as `format`, whatever its extension.
    ///
    /// The size limit is checked before the file is read.
    pub fn ingest_file_as(
        &self,
        path: &Path,
        table_name: Option<&str>,
        format: IngestFormat,
    ) -> Result<TableMetadata, IngestError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.config.max_upload_bytes as u64 {
            return Err(IngestError::Data(format!(
                "{} is {} bytes, over the {} byte limit",
                path.display(),
                size,
                self.config.max_upload_bytes
            )));
        }

        let bytes = std::fs::read(path)?;
        let default_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.ingest(&bytes, table_name.unwrap_or(&default_name), format)
    }
}
