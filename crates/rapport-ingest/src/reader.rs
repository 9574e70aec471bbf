//! Source parsers for CSV and JSON-array payloads.
//!
//! JSON Lines parsing lives in [`crate::schema`] since it skips bad lines
//! instead of failing.

use csv::ReaderBuilder;
use serde_json::Value;

use crate::error::IngestError;
use crate::flatten::{flatten, FlatRecord};
use crate::schema::json_kind;

/// A rectangular table ready to be written: every row has one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Parse a CSV payload with a header row.
///
/// Empty header cells become `unnamed_<index>`, short rows are padded with
/// null, and a row longer than the header is a format error.
pub fn read_csv(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("unnamed_{}", idx)
            } else {
                h.to_string()
            }
        })
        .collect();

    if columns.is_empty() {
        return Err(IngestError::Data(
            "no valid records: CSV payload has no header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() > columns.len() {
            return Err(IngestError::Format(format!(
                "CSV record {} has {} fields, expected at most {}",
                idx + 1,
                record.len(),
                columns.len()
            )));
        }
        let row = (0..columns.len())
            .map(|i| record.get(i).map(coerce_cell).unwrap_or(Value::Null))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

/// Parse a JSON array of objects into flattened records.
pub fn read_json_array(bytes: &[u8], delimiter: &str) -> Result<Vec<FlatRecord>, IngestError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| IngestError::Format(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(IngestError::Format(format!(
                "expected a JSON array of objects, found {}",
                json_kind(&other)
            )))
        }
    };

    if items.is_empty() {
        return Err(IngestError::Data(
            "no valid records: JSON array is empty".to_string(),
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(map) => Ok(flatten(map, "", delimiter)),
            other => Err(IngestError::Format(format!(
                "array element {} is {}, expected an object",
                idx,
                json_kind(other)
            ))),
        })
        .collect()
}

/// Best-effort typing of a CSV cell.
///
/// Digit strings with a leading `0` or `+` (zip codes, phone numbers) stay
/// text so the zero or plus sign survives.
fn coerce_cell(s: &str) -> Value {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if looks_like_code(trimmed) {
        return Value::String(trimmed.to_string());
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }

    Value::String(trimmed.to_string())
}

fn looks_like_code(s: &str) -> bool {
    let rest = match s.as_bytes() {
        [b'+', rest @ ..] => rest,
        [b'0', rest @ ..] => rest,
        _ => return false,
    };
    rest.first().is_some_and(u8::is_ascii_digit)
}
