//! Schema inference and rectangularization for JSON records.
//!
//! The schema of a batch is the union of the flattened keys of all of its
//! records, in first-seen order. Every record is then padded with nulls so
//! the table comes out rectangular.

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::error::ParseWarning;
use crate::flatten::{flatten, FlatRecord};
use crate::reader::RawTable;

/// Ordered set of column names observed across a batch.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    columns: Vec<String>,
    seen: HashSet<String>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Returns false if it was already present.
    pub fn insert(&mut self, column: &str) -> bool {
        if self.seen.contains(column) {
            return false;
        }
        self.seen.insert(column.to_string());
        self.columns.push(column.to_string());
        true
    }

    /// Union the keys of one flattened record into the set.
    pub fn extend_from(&mut self, record: &FlatRecord) {
        for key in record.keys() {
            self.insert(key);
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.seen.contains(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Build the set from already flattened records.
    pub fn from_records(records: &[FlatRecord]) -> Self {
        let mut schema = Self::new();
        for record in records {
            schema.extend_from(record);
        }
        schema
    }
}

/// Records parsed from newline-delimited JSON plus the lines that were skipped.
#[derive(Debug, Default)]
pub struct ParsedLines {
    pub records: Vec<FlatRecord>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse newline-delimited JSON into flattened records.
///
/// Blank lines are ignored. Lines that are not valid UTF-8, not valid JSON,
/// or not a JSON object are skipped with a [`ParseWarning`].
pub fn parse_jsonl(bytes: &[u8], delimiter: &str) -> ParsedLines {
    let mut parsed = ParsedLines::default();

    for (idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_no = idx + 1;
        let line = match std::str::from_utf8(raw_line) {
            Ok(line) => line.trim(),
            Err(e) => {
                skip_line(&mut parsed, line_no, format!("invalid UTF-8: {}", e));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => parsed.records.push(flatten(&map, "", delimiter)),
            Ok(other) => skip_line(
                &mut parsed,
                line_no,
                format!("expected a JSON object, found {}", json_kind(&other)),
            ),
            Err(e) => skip_line(&mut parsed, line_no, format!("invalid JSON: {}", e)),
        }
    }

    parsed
}

/// Infer the flattened schema of newline-delimited JSON.
///
/// Returns an empty set when no line parses.
pub fn infer_schema(bytes: &[u8], delimiter: &str) -> SchemaSet {
    SchemaSet::from_records(&parse_jsonl(bytes, delimiter).records)
}

/// Pad every record to the union schema, producing one row per record.
pub fn rectangularize(records: &[FlatRecord]) -> RawTable {
    let schema = SchemaSet::from_records(records);
    let rows = records
        .iter()
        .map(|record| {
            schema
                .columns()
                .iter()
                .map(|col| record.get(col).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    RawTable {
        columns: schema.columns().to_vec(),
        rows,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn skip_line(parsed: &mut ParsedLines, line: usize, message: String) {
    warn!(line, %message, "Skipping malformed JSONL line");
    parsed.warnings.push(ParseWarning { line, message });
}
