//! Recursive flattening of nested JSON records.
//!
//! Nested objects become delimited key paths (`address__city`) and array
//! elements get an index segment (`tags__0`). The result holds scalars only.

use serde_json::{Map, Value};

/// Default separator for key paths and array indexes.
pub const DEFAULT_DELIMITER: &str = "__";

/// A single-level record: column name to scalar (string, number, bool, null).
///
/// Keys keep the order in which they were first produced.
pub type FlatRecord = Map<String, Value>;

/// Flatten `record` into a [`FlatRecord`].
///
/// Keys are prefixed with `parent_key` when it is non-empty. Empty objects
/// and empty arrays become `null` so the column survives. A key produced
/// twice keeps its first position and the later value.
pub fn flatten(record: &Map<String, Value>, parent_key: &str, delimiter: &str) -> FlatRecord {
    let mut out = FlatRecord::new();
    flatten_object(&mut out, record, parent_key, delimiter);
    out
}

fn flatten_object(out: &mut FlatRecord, record: &Map<String, Value>, parent_key: &str, delimiter: &str) {
    for (key, value) in record {
        let new_key = if parent_key.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", parent_key, delimiter, key)
        };
        flatten_value(out, new_key, value, delimiter);
    }
}

fn flatten_value(out: &mut FlatRecord, key: String, value: &Value, delimiter: &str) {
    match value {
        Value::Object(map) if map.is_empty() => {
            out.insert(key, Value::Null);
        }
        Value::Object(map) => flatten_object(out, map, &key, delimiter),
        Value::Array(items) if items.is_empty() => {
            out.insert(key, Value::Null);
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(out, format!("{}{}{}", key, delimiter, i), item, delimiter);
            }
        }
        scalar => {
            out.insert(key, scalar.clone());
        }
    }
}
