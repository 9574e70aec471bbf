//! End-to-end ingestion tests against SQLite databases.
//!
//! Each test builds its own engine over a fresh in-memory or temp-file
//! database and inspects the resulting table through plain SQL.

use std::io::Write;
use std::sync::Arc;

use rapport_core::config::IngestConfig;
use rapport_core::error::RapportError;
use rapport_ingest::{IngestEngine, IngestError, IngestFormat};
use rapport_storage::{Database, TableStats};
use serde_json::{json, Value};

// =============================================================================
// Helpers
// =============================================================================

fn setup() -> (Arc<Database>, IngestEngine) {
    let db = Arc::new(Database::in_memory().unwrap());
    let engine = IngestEngine::new(Arc::clone(&db), IngestConfig::default());
    (db, engine)
}

fn query_rows(db: &Database, sql: &str) -> Vec<Vec<Value>> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| RapportError::Storage(e.to_string()))?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| {
                        Ok(match row.get_ref(i)? {
                            rusqlite::types::ValueRef::Null => Value::Null,
                            rusqlite::types::ValueRef::Integer(n) => json!(n),
                            rusqlite::types::ValueRef::Real(f) => json!(f),
                            rusqlite::types::ValueRef::Text(t) => {
                                json!(String::from_utf8_lossy(t))
                            }
                            rusqlite::types::ValueRef::Blob(_) => Value::Null,
                        })
                    })
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })
            .map_err(|e| RapportError::Storage(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| RapportError::Storage(e.to_string()))
    })
    .unwrap()
}

// =============================================================================
// JSONL
// =============================================================================

#[test]
fn test_jsonl_heterogeneous_records_are_rectangular() {
    let (db, engine) = setup();
    let input = b"{\"id\":1}\n{\"id\":2,\"age\":30}\n{\"email\":\"x\"}\n";

    let meta = engine.convert_jsonl(input, "people").unwrap();

    assert_eq!(meta.table_name, "people");
    assert_eq!(meta.row_count, 3);
    assert_eq!(meta.column_names(), vec!["id", "age", "email"]);
    assert!(meta.warnings.is_empty());

    let rows = query_rows(&db, "SELECT id, age, email FROM people ORDER BY rowid");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec![json!(1), Value::Null, Value::Null]);
    assert_eq!(rows[1], vec![json!(2), json!(30), Value::Null]);
    assert_eq!(rows[2], vec![Value::Null, Value::Null, json!("x")]);
}

#[test]
fn test_jsonl_malformed_lines_skipped() {
    let (_db, engine) = setup();
    let input = b"{\"id\":1}\n{oops\n{\"id\":3}\nnot json at all\n";

    let meta = engine.convert_jsonl(input, "events").unwrap();

    assert_eq!(meta.row_count, 2);
    assert_eq!(meta.warnings.len(), 2);
    assert_eq!(meta.warnings[0].line, 2);
    assert_eq!(meta.warnings[1].line, 4);
}

#[test]
fn test_jsonl_all_malformed_raises_data_error() {
    let (_db, engine) = setup();
    let err = engine.convert_jsonl(b"{oops\n[\n", "events").unwrap_err();
    assert!(matches!(err, IngestError::Data(_)));
    assert!(err.to_string().contains("no valid records"));
}

#[test]
fn test_jsonl_empty_raises_data_error() {
    let (_db, engine) = setup();
    let err = engine.convert_jsonl(b"", "events").unwrap_err();
    assert!(matches!(err, IngestError::Data(_)));
}

#[test]
fn test_jsonl_nested_records_flattened() {
    let (db, engine) = setup();
    let input = br#"{"name":"Ada","address":{"city":"London","geo":{"lat":51.5}},"tags":["math","poetry"]}
{"name":"Grace","address":{},"tags":[]}
"#;

    let meta = engine.convert_jsonl(input, "contacts").unwrap();

    assert_eq!(
        meta.column_names(),
        vec![
            "name",
            "address__city",
            "address__geo__lat",
            "tags__0",
            "tags__1",
            "address",
            "tags"
        ]
    );
    assert_eq!(meta.column_type("address__geo__lat"), Some("REAL"));
    assert_eq!(meta.column_type("address"), Some("TEXT"));
    assert_eq!(meta.column_type("tags"), Some("TEXT"));

    let rows = query_rows(&db, "SELECT name, tags__0, address FROM contacts ORDER BY rowid");
    assert_eq!(rows[0], vec![json!("Ada"), json!("math"), Value::Null]);
    assert_eq!(rows[1], vec![json!("Grace"), Value::Null, Value::Null]);
}

#[test]
fn test_jsonl_column_names_normalized() {
    let (_db, engine) = setup();
    let meta = engine
        .convert_jsonl(br#"{"First Name":"Ada","e-mail":"ada@example.com"}"#, "t")
        .unwrap();
    assert_eq!(meta.column_names(), vec!["first_name", "e_mail"]);
}

#[test]
fn test_jsonl_column_collision_is_storage_error() {
    let (_db, engine) = setup();
    let err = engine
        .convert_jsonl(br#"{"user-name":"a","user_name":"b"}"#, "t")
        .unwrap_err();
    assert!(matches!(err, IngestError::Storage(_)));
}

// =============================================================================
// JSON array
// =============================================================================

#[test]
fn test_json_array_ingest() {
    let (_db, engine) = setup();
    let input = br#"[{"id":1,"items":[{"sku":"a"},{"sku":"b"}]},{"id":2,"active":true}]"#;

    let meta = engine.convert_json(input, "orders.json").unwrap();

    assert_eq!(meta.table_name, "orders");
    assert_eq!(meta.row_count, 2);
    assert_eq!(
        meta.column_names(),
        vec!["id", "items__0__sku", "items__1__sku", "active"]
    );
    assert_eq!(meta.column_type("id"), Some("INTEGER"));
    assert_eq!(meta.sample_data[1]["active"], json!(1));
}

#[test]
fn test_json_non_array_is_format_error() {
    let (_db, engine) = setup();
    let err = engine.convert_json(br#"{"id":1}"#, "t").unwrap_err();
    assert!(matches!(err, IngestError::Format(_)));
}

// =============================================================================
// CSV
// =============================================================================

#[test]
fn test_csv_ingest_types_and_sample() {
    let (_db, engine) = setup();
    let mut csv = String::from("Name,Age,Balance,Notes\n");
    for i in 0..8 {
        csv.push_str(&format!("person{},{},{}.25,\n", i, 20 + i, i));
    }

    let meta = engine.convert_csv(csv.as_bytes(), "Client List").unwrap();

    assert_eq!(meta.table_name, "client_list");
    assert_eq!(meta.row_count, 8);
    let schema = meta.schema_map();
    assert_eq!(schema["name"], "TEXT");
    assert_eq!(schema["age"], "INTEGER");
    assert_eq!(schema["balance"], "REAL");
    assert_eq!(schema["notes"], "TEXT");
    assert_eq!(meta.sample_data.len(), 5);
    assert_eq!(meta.sample_data[0]["name"], json!("person0"));
    assert_eq!(meta.sample_data[4]["age"], json!(24));
}

#[test]
fn test_reingest_replaces_table() {
    let (db, engine) = setup();
    engine.convert_csv(b"a,b\n1,2\n3,4\n5,6\n", "data").unwrap();
    let meta = engine.convert_csv(b"c\nx\n", "data").unwrap();

    assert_eq!(meta.row_count, 1);
    assert_eq!(meta.column_names(), vec!["c"]);
    let rows = query_rows(&db, "SELECT COUNT(*) FROM data");
    assert_eq!(rows[0][0], json!(1));
}

#[test]
fn test_failed_ingest_keeps_previous_table() {
    let (db, engine) = setup();
    engine.convert_csv(b"a\n1\n2\n", "data").unwrap();
    let err = engine.convert_csv(b"a,b\n1,2,3\n", "data").unwrap_err();
    assert!(matches!(err, IngestError::Format(_)));

    let rows = query_rows(&db, "SELECT COUNT(*) FROM data");
    assert_eq!(rows[0][0], json!(2));
}

// =============================================================================
// Files and registry
// =============================================================================

#[test]
fn test_ingest_file_picks_format_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Friends-2024.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, r#"{{"name":"Ada"}}"#).unwrap();
    writeln!(file, r#"{{"name":"Grace","city":"NYC"}}"#).unwrap();

    let db = Arc::new(Database::new(&dir.path().join("rapport.db")).unwrap());
    let engine = IngestEngine::new(Arc::clone(&db), IngestConfig::default());
    let meta = engine.ingest_file(&path, None).unwrap();

    assert_eq!(meta.table_name, "friends_2024");
    assert_eq!(meta.row_count, 2);

    let registry = TableStats::new(db).registry().unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry[0].table_name, "friends_2024");
    assert_eq!(registry[0].source_format, IngestFormat::Jsonl.as_str());
    assert_eq!(registry[0].column_count, 2);
}

#[test]
fn test_ingest_file_explicit_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    std::fs::write(&path, "x\n1\n").unwrap();

    let (_db, engine) = setup();
    let meta = engine.ingest_file(&path, Some("123 import")).unwrap();
    assert_eq!(meta.table_name, "table_123_import");
}

#[test]
fn test_ingest_file_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();

    let (_db, engine) = setup();
    let err = engine.ingest_file(&path, None).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat(_)));
}

#[test]
fn test_ingest_file_missing_is_io_error() {
    let (_db, engine) = setup();
    let err = engine
        .ingest_file(std::path::Path::new("/nonexistent/people.csv"), None)
        .unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));
}

#[test]
fn test_ingest_file_as_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.txt");
    std::fs::write(&path, "{\"a\":1}\n{\"b\":2}\n").unwrap();

    let (_db, engine) = setup();
    let meta = engine
        .ingest_file_as(&path, None, IngestFormat::Jsonl)
        .unwrap();
    assert_eq!(meta.table_name, "dump");
    assert_eq!(meta.row_count, 2);
}

#[test]
fn test_ingest_file_as_checks_size_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.dat");
    std::fs::write(&path, "a,b\n1,2\n3,4\n").unwrap();

    let db = Arc::new(Database::in_memory().unwrap());
    let engine = IngestEngine::new(
        db,
        IngestConfig {
            max_upload_bytes: 4,
            ..IngestConfig::default()
        },
    );
    let err = engine
        .ingest_file_as(&path, Some("big"), IngestFormat::Csv)
        .unwrap_err();
    assert!(matches!(err, IngestError::Data(ref m) if m.contains("limit")));
}

// =============================================================================
// Reserved names
// =============================================================================

#[test]
fn test_bookkeeping_table_names_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rapport.db");
    let csv_path = dir.path().join("schema_migrations.csv");
    std::fs::write(&csv_path, "x\n1\n").unwrap();

    {
        let db = Arc::new(Database::new(&db_path).unwrap());
        let engine = IngestEngine::new(Arc::clone(&db), IngestConfig::default());
        engine.convert_csv(b"name\nAda\n", "contacts").unwrap();

        let err = engine.ingest_file(&csv_path, None).unwrap_err();
        assert!(matches!(err, IngestError::Storage(ref m) if m.contains("reserved")));

        let err = engine
            .convert_jsonl(b"{\"x\":1}\n", "ingested_tables.jsonl")
            .unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));

        let err = engine.convert_csv(b"x\n1\n", "sqlite_sequence").unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));
    }

    // The store still opens and its registry is intact.
    let db = Arc::new(Database::new(&db_path).unwrap());
    let stats = TableStats::new(db);
    assert_eq!(stats.list_user_tables().unwrap(), vec!["contacts".to_string()]);
    assert_eq!(stats.registry().unwrap().len(), 1);
}

#[test]
fn test_metadata_serializes_to_json() {
    let (_db, engine) = setup();
    let meta = engine.convert_csv(b"a,b\n1,x\n", "t").unwrap();
    let value = serde_json::to_value(&meta).unwrap();
    assert_eq!(value["table_name"], json!("t"));
    assert_eq!(value["row_count"], json!(1));
    assert_eq!(value["schema"][0]["name"], json!("a"));
    assert!(value.get("warnings").is_none());
}
