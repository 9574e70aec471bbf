//! Rapport Storage crate - SQLite persistence for ingested tables.
//!
//! Provides a WAL-mode SQLite database with migrations, the registry of
//! ingested tables, and row-count statistics consumed by the chat assistant.

pub mod db;
pub mod migrations;
pub mod stats;

pub use db::Database;
pub use stats::{quote_identifier, DbStats, IngestedTable, TableStats};
