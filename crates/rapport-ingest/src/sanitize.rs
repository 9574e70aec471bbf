//! SQL identifier sanitization.
//!
//! Table and column names come from file names and JSON keys, so they are
//! rewritten to `[a-z0-9_]` before being spliced into SQL. Identifiers
//! cannot be bound as parameters.

use crate::format::ACCEPTED_EXTENSIONS;

/// Prefix for names that do not start with a letter.
pub const DEFAULT_TABLE_PREFIX: &str = "table_";

/// Sanitize a table name with the default prefix.
///
/// `"Test-Table Name!"` becomes `"test_table_name_"`, `"123data"` becomes
/// `"table_123data"` and `"data.csv"` becomes `"data"`. Never fails.
pub fn sanitize_table_name(name: &str) -> String {
    sanitize_with_prefix(name, DEFAULT_TABLE_PREFIX)
}

/// Sanitize a table name, prepending `prefix` when the result would not
/// start with an ASCII letter.
pub fn sanitize_with_prefix(name: &str, prefix: &str) -> String {
    let replaced: String = strip_extension(name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    let named = if replaced.starts_with(|c: char| c.is_ascii_alphabetic()) {
        replaced
    } else {
        format!("{}{}", prefix, replaced)
    };
    named.to_lowercase()
}

/// Whether `name` already is a plain identifier: a letter or underscore
/// followed by letters, digits, or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Normalize a column name for the store: lower-case, with spaces and
/// hyphens turned into underscores.
pub fn normalize_column(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn strip_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &name[..name.len() - ext.len()])
        .unwrap_or(name)
}
