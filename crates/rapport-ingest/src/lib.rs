//! File ingestion for Rapport.
//!
//! Turns CSV, JSON-array, and JSON Lines uploads into SQLite tables:
//! nested JSON is flattened into delimited column names, heterogeneous
//! records are padded to a common schema, and identifiers are sanitized
//! before they reach SQL.

pub mod engine;
pub mod error;
pub mod flatten;
pub mod format;
pub mod materialize;
pub mod reader;
pub mod sanitize;
pub mod schema;

pub use engine::IngestEngine;
pub use error::{IngestError, ParseWarning};
pub use flatten::{flatten, FlatRecord, DEFAULT_DELIMITER};
pub use format::{IngestFormat, ACCEPTED_EXTENSIONS};
pub use materialize::{ColumnSchema, SqlType, TableMetadata};
pub use reader::RawTable;
pub use sanitize::{is_valid_identifier, normalize_column, sanitize_table_name, DEFAULT_TABLE_PREFIX};
pub use schema::{infer_schema, SchemaSet};
