//! Table materialization: writes a [`RawTable`] to SQLite.
//!
//! Each call replaces any existing table of the same name inside one
//! transaction, so a failed write leaves the previous table untouched.

use std::collections::{BTreeMap, HashSet};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use rapport_storage::migrations::INTERNAL_TABLES;
use rapport_storage::quote_identifier;
use rapport_storage::stats::record_ingestion;

use crate::error::{IngestError, ParseWarning};
use crate::flatten::FlatRecord;
use crate::format::IngestFormat;
use crate::reader::RawTable;
use crate::sanitize::{is_valid_identifier, normalize_column};

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }

    /// Infer a type from a column's values, ignoring nulls.
    ///
    /// Integers and booleans give `INTEGER`, any other number widens to
    /// `REAL`, anything else gives `TEXT`. An all-null column is `TEXT`.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> SqlType {
        let mut seen = false;
        let mut all_integer = true;
        let mut all_numeric = true;

        for value in values {
            match value {
                Value::Null => continue,
                Value::Bool(_) => {}
                Value::Number(n) => {
                    if n.as_i64().is_none() {
                        all_integer = false;
                    }
                }
                _ => {
                    all_integer = false;
                    all_numeric = false;
                }
            }
            seen = true;
        }

        match (seen, all_integer, all_numeric) {
            (false, _, _) => SqlType::Text,
            (true, true, _) => SqlType::Integer,
            (true, false, true) => SqlType::Real,
            _ => SqlType::Text,
        }
    }
}

/// A column and its declared type as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: String,
}

/// Result of one ingestion call.
#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata {
    pub table_name: String,
    pub row_count: usize,
    pub schema: Vec<ColumnSchema>,
    pub sample_data: Vec<FlatRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseWarning>,
}

impl TableMetadata {
    /// Column name to declared type.
    pub fn schema_map(&self) -> BTreeMap<String, String> {
        self.schema
            .iter()
            .map(|c| (c.name.clone(), c.sql_type.clone()))
            .collect()
    }

    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.schema
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.sql_type.as_str())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Normalize column names, failing on any collision.
pub fn normalize_columns(columns: &[String]) -> Result<Vec<String>, IngestError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(columns.len());
    for original in columns {
        let name = normalize_column(original);
        if !seen.insert(name.clone()) {
            return Err(IngestError::Storage(format!(
                "duplicate column name after normalization: {} (from {})",
                name, original
            )));
        }
        normalized.push(name);
    }
    Ok(normalized)
}

/// Replace `table_name` with the contents of `table` and describe the result.
///
/// `table_name` must already be sanitized. Bookkeeping tables and SQLite's
/// `sqlite_` namespace are refused.
pub fn materialize(
    conn: &Connection,
    table_name: &str,
    source: IngestFormat,
    table: &RawTable,
    sample_rows: usize,
) -> Result<TableMetadata, IngestError> {
    if !is_valid_identifier(table_name) {
        return Err(IngestError::Storage(format!(
            "refusing to create table with unsafe name: {}",
            table_name
        )));
    }
    if is_reserved_table(table_name) {
        return Err(IngestError::Storage(format!(
            "table name {} is reserved for internal use",
            table_name
        )));
    }
    if table.columns.is_empty() {
        return Err(IngestError::Data(
            "no valid records: no columns could be inferred from the input".to_string(),
        ));
    }

    let columns = normalize_columns(&table.columns)?;
    let types: Vec<SqlType> = (0..columns.len())
        .map(|i| SqlType::infer(table.rows.iter().filter_map(|row| row.get(i))))
        .collect();

    let quoted_table = quote_identifier(table_name);
    let column_defs: Vec<String> = columns
        .iter()
        .zip(&types)
        .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty.as_str()))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} ({defs});",
        table = quoted_table,
        defs = column_defs.join(", ")
    ))?;

    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            quoted_table,
            placeholders.join(", ")
        ))?;
        for row in &table.rows {
            insert.execute(params_from_iter(row.iter().map(to_sql_value)))?;
        }
    }

    record_ingestion(
        &tx,
        table_name,
        source.as_str(),
        table.rows.len() as u64,
        columns.len() as u64,
    )?;
    tx.commit()?;

    debug!(
        table = %table_name,
        rows = table.rows.len(),
        columns = columns.len(),
        "Table written"
    );

    Ok(TableMetadata {
        table_name: table_name.to_string(),
        row_count: table.rows.len(),
        schema: read_schema(conn, table_name)?,
        sample_data: read_sample(conn, table_name, sample_rows)?,
        warnings: Vec::new(),
    })
}

/// Declared column types as reported by `PRAGMA table_info`.
pub fn read_schema(conn: &Connection, table_name: &str) -> Result<Vec<ColumnSchema>, IngestError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table_name)))?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnSchema {
            name: row.get(1)?,
            sql_type: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// The first `limit` rows in insertion order.
pub fn read_sample(
    conn: &Connection,
    table_name: &str,
    limit: usize,
) -> Result<Vec<FlatRecord>, IngestError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM {} ORDER BY rowid LIMIT ?1",
        quote_identifier(table_name)
    ))?;
    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

    let mut rows = stmt.query([limit as i64])?;
    let mut sample = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = FlatRecord::new();
        for (i, name) in names.iter().enumerate() {
            record.insert(name.clone(), from_sql_value(row.get_ref(i)?));
        }
        sample.push(record);
    }
    Ok(sample)
}

/// Whether `name` belongs to the store's own bookkeeping.
pub fn is_reserved_table(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    INTERNAL_TABLES.contains(&lower.as_str()) || lower.starts_with("sqlite_")
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, Some(f)) => SqlValue::Real(f),
            (None, None) => SqlValue::Text(n.to_string()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Flattening removes containers; keep the JSON text if one slips through.
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
