//! Table listing and row-count statistics.
//!
//! Backs the assistant's "how many contacts" answers and the `tables`
//! command. Entity tables (`contacts`, `tags`, `notes`) are counted when
//! present and reported as zero otherwise.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use rapport_core::error::RapportError;

use crate::db::Database;
use crate::migrations::INTERNAL_TABLES;

/// Aggregate counts over the whole database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub table_count: u64,
    pub total_rows: u64,
    pub contact_count: u64,
    pub tag_count: u64,
    pub note_count: u64,
}

/// One entry of the ingestion registry.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedTable {
    pub table_name: String,
    pub source_format: String,
    pub row_count: u64,
    pub column_count: u64,
    pub ingested_at: DateTime<Utc>,
}

/// Quote an identifier for SQLite, doubling any embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Whether a table with the given name exists.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, RapportError> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| RapportError::Storage(format!("Table lookup failed: {}", e)))?;
    Ok(found.is_some())
}

/// Row count of a table, zero when the table does not exist.
pub fn count_rows_in(conn: &Connection, table: &str) -> Result<u64, RapportError> {
    if !table_exists(conn, table)? {
        return Ok(0);
    }
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(|e| RapportError::Storage(format!("Row count failed for {}: {}", table, e)))?;
    Ok(count.max(0) as u64)
}

/// Upsert a registry entry. Runs on the caller's connection so it can join
/// the caller's transaction.
pub fn record_ingestion(
    conn: &Connection,
    table: &str,
    source_format: &str,
    row_count: u64,
    column_count: u64,
) -> Result<(), RapportError> {
    conn.execute(
        "INSERT INTO ingested_tables (table_name, source_format, row_count, column_count, ingested_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(table_name) DO UPDATE SET
            source_format = excluded.source_format,
            row_count = excluded.row_count,
            column_count = excluded.column_count,
            ingested_at = excluded.ingested_at",
        params![
            table,
            source_format,
            row_count as i64,
            column_count as i64,
            Utc::now().timestamp()
        ],
    )
    .map_err(|e| RapportError::Storage(format!("Failed to record ingestion: {}", e)))?;
    Ok(())
}

/// Read-only statistics service.
pub struct TableStats {
    db: Arc<Database>,
}

impl TableStats {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// User tables in name order, excluding bookkeeping tables.
    pub fn list_user_tables(&self) -> Result<Vec<String>, RapportError> {
        self.db.with_conn(list_user_tables_in)
    }

    /// Row count of a table, zero when it does not exist.
    pub fn count_rows(&self, table: &str) -> Result<u64, RapportError> {
        self.db.with_conn(|conn| count_rows_in(conn, table))
    }

    /// Registry of ingested tables, most recent first.
    pub fn registry(&self) -> Result<Vec<IngestedTable>, RapportError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT table_name, source_format, row_count, column_count, ingested_at
                     FROM ingested_tables
                     ORDER BY ingested_at DESC, table_name ASC",
                )
                .map_err(|e| RapportError::Storage(format!("Registry query prepare: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    let table_name: String = row.get(0)?;
                    let source_format: String = row.get(1)?;
                    let row_count: i64 = row.get(2)?;
                    let column_count: i64 = row.get(3)?;
                    let ingested_at: i64 = row.get(4)?;
                    Ok((table_name, source_format, row_count, column_count, ingested_at))
                })
                .map_err(|e| RapportError::Storage(format!("Registry query: {}", e)))?;

            let mut tables = Vec::new();
            for row in rows {
                let (table_name, source_format, row_count, column_count, ingested_at) =
                    row.map_err(|e| RapportError::Storage(e.to_string()))?;
                tables.push(IngestedTable {
                    table_name,
                    source_format,
                    row_count: row_count.max(0) as u64,
                    column_count: column_count.max(0) as u64,
                    ingested_at: Utc
                        .timestamp_opt(ingested_at, 0)
                        .single()
                        .unwrap_or_default(),
                });
            }
            Ok(tables)
        })
    }

    /// Aggregate counts across all user tables.
    pub fn snapshot(&self) -> Result<DbStats, RapportError> {
        self.db.with_conn(|conn| {
            let tables = list_user_tables_in(conn)?;
            let mut total_rows = 0;
            for table in &tables {
                total_rows += count_rows_in(conn, table)?;
            }
            Ok(DbStats {
                table_count: tables.len() as u64,
                total_rows,
                contact_count: count_rows_in(conn, "contacts")?,
                tag_count: count_rows_in(conn, "tags")?,
                note_count: count_rows_in(conn, "notes")?,
            })
        })
    }
}

fn list_user_tables_in(conn: &Connection) -> Result<Vec<String>, RapportError> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(|e| RapportError::Storage(format!("Table list prepare: {}", e)))?;

    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| RapportError::Storage(format!("Table list: {}", e)))?;

    let mut tables = Vec::new();
    for name in names {
        let name = name.map_err(|e| RapportError::Storage(e.to_string()))?;
        if !INTERNAL_TABLES.contains(&name.as_str()) {
            tables.push(name);
        }
    }
    Ok(tables)
}
