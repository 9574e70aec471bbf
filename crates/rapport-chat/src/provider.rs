//! Data providers supplying database facts to response templates.

use std::sync::Arc;

use serde::Serialize;

use rapport_storage::{Database, DbStats, TableStats};

use crate::error::ChatError;
use crate::template::TemplateContext;

/// Point-in-time facts about the user's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataSnapshot {
    pub contact_count: u64,
    pub tag_count: u64,
    pub note_count: u64,
    pub table_count: u64,
    pub total_rows: u64,
    pub tables: Vec<String>,
}

impl DataSnapshot {
    pub fn from_stats(stats: DbStats, tables: Vec<String>) -> Self {
        Self {
            contact_count: stats.contact_count,
            tag_count: stats.tag_count,
            note_count: stats.note_count,
            table_count: stats.table_count,
            total_rows: stats.total_rows,
            tables,
        }
    }

    /// Template variables for this snapshot.
    pub fn to_context(&self) -> TemplateContext {
        let tables = if self.tables.is_empty() {
            "none".to_string()
        } else {
            self.tables.join(", ")
        };

        TemplateContext::from([
            ("contact_count".to_string(), self.contact_count.to_string()),
            ("tag_count".to_string(), self.tag_count.to_string()),
            ("note_count".to_string(), self.note_count.to_string()),
            ("table_count".to_string(), self.table_count.to_string()),
            ("total_rows".to_string(), self.total_rows.to_string()),
            ("tables".to_string(), tables),
        ])
    }
}

/// Source of [`DataSnapshot`]s for the responder.
pub trait DataProvider: Send + Sync {
    fn snapshot(&self) -> Result<DataSnapshot, ChatError>;
}

/// Reads live counts from the database.
pub struct StorageDataProvider {
    stats: TableStats,
}

impl StorageDataProvider {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            stats: TableStats::new(db),
        }
    }
}

impl DataProvider for StorageDataProvider {
    fn snapshot(&self) -> Result<DataSnapshot, ChatError> {
        let stats = self.stats.snapshot()?;
        let tables = self.stats.list_user_tables()?;
        Ok(DataSnapshot::from_stats(stats, tables))
    }
}

/// Always returns the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticDataProvider {
    snapshot: DataSnapshot,
}

impl StaticDataProvider {
    pub fn new(snapshot: DataSnapshot) -> Self {
        Self { snapshot }
    }
}

impl DataProvider for StaticDataProvider {
    fn snapshot(&self) -> Result<DataSnapshot, ChatError> {
        Ok(self.snapshot.clone())
    }
}
