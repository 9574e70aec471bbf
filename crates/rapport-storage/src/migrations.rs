//! Database schema migrations.
//!
//! Only bookkeeping tables live here. Ingested tables are created at
//! runtime by the ingestion engine and recorded in `ingested_tables`.

use rusqlite::Connection;
use tracing::info;

use rapport_core::error::RapportError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), RapportError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| RapportError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| RapportError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: ingested_tables");
    }

    Ok(())
}

/// Version 1: registry of tables produced by file ingestion.
fn apply_v1(conn: &Connection) -> Result<(), RapportError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ingested_tables (
            table_name      TEXT PRIMARY KEY NOT NULL,
            source_format   TEXT NOT NULL
                            CHECK (source_format IN ('csv', 'json', 'jsonl')),
            row_count       INTEGER NOT NULL DEFAULT 0,
            column_count    INTEGER NOT NULL DEFAULT 0,
            ingested_at     INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'ingested_tables');
        ",
    )
    .map_err(|e| RapportError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}

/// Names of tables owned by the migration layer rather than by ingestion.
pub const INTERNAL_TABLES: &[&str] = &["schema_migrations", "ingested_tables"];
