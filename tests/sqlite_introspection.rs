//! SQLite Integration Tests
//!
//! Runs the full stack (DSN classification, driver, catalog, passthrough
//! executors) against real SQLite files in a temporary directory.

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use common::{sqlite_dsn, sqlite_file};
use pretty_assertions::assert_eq;
use schemata::catalog::sqlite::{database_schema, describe_table_raw, table_schema};
use schemata::{describe_table_for_dsn, list_tables_for_dsn, DbConnection};

const TEST_TABLE: &str = "CREATE TABLE test_table (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    email TEXT DEFAULT 'no-email'
);";

async fn open(dsn: &str) -> Arc<dyn DbConnection> {
    let parsed = schemata::dsn::classify(dsn).expect("classify");
    schemata::driver::connect(&parsed).await.expect("connect")
}

// ============================================================================
// Canonical Describe
// ============================================================================

#[tokio::test]
async fn test_describe_test_table() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "test.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let cols = describe_table_for_dsn(conn.as_ref(), &dsn, "test_table").await.unwrap();

    let json = serde_json::to_string_pretty(&cols).unwrap();
    insta::assert_snapshot!(json, @r###"
    [
      {
        "name": "id",
        "type": "INTEGER",
        "nullable": true,
        "is_primary_key": true
      },
      {
        "name": "name",
        "type": "TEXT",
        "nullable": false,
        "is_primary_key": false
      },
      {
        "name": "age",
        "type": "INTEGER",
        "nullable": true,
        "is_primary_key": false
      },
      {
        "name": "email",
        "type": "TEXT",
        "nullable": true,
        "default": "'no-email'",
        "is_primary_key": false
      }
    ]
    "###);
}

#[tokio::test]
async fn test_composite_key_marks_every_member() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(
        dir.path(),
        "pairs.db",
        "CREATE TABLE pairs (a INTEGER NOT NULL, b INTEGER NOT NULL, note TEXT, PRIMARY KEY (a, b));",
    ));
    let conn = open(&dsn).await;

    let cols = describe_table_for_dsn(conn.as_ref(), &dsn, "pairs").await.unwrap();
    let keys: Vec<_> = cols.iter().map(|c| (c.name.as_str(), c.is_primary_key)).collect();
    assert_eq!(keys, [("a", true), ("b", true), ("note", false)]);
}

#[tokio::test]
async fn test_describe_preserves_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(
        dir.path(),
        "order.db",
        "CREATE TABLE wide (zeta TEXT, alpha TEXT, mid INTEGER, beta REAL);",
    ));
    let conn = open(&dsn).await;

    let cols = describe_table_for_dsn(conn.as_ref(), &dsn, "wide").await.unwrap();
    let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha", "mid", "beta"]);
}

#[tokio::test]
async fn test_path_with_space_opens_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "my db.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let cols = describe_table_for_dsn(conn.as_ref(), &dsn, "test_table").await.unwrap();
    assert_eq!(cols.len(), 4);
    assert!(!dir.path().join("my%20db.db").exists());
}

#[tokio::test]
async fn test_missing_table_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "empty.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let cols = describe_table_for_dsn(conn.as_ref(), &dsn, "no_such_table").await.unwrap();
    assert!(cols.is_empty());
}

#[tokio::test]
async fn test_dsn_rejections_surface_before_querying() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "t.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let err = describe_table_for_dsn(conn.as_ref(), "adodb://localhost/db", "test_table").await.unwrap_err();
    assert!(err.to_string().contains("unsupported database driver: adodb"));

    let err = describe_table_for_dsn(conn.as_ref(), "unsupported://x", "test_table").await.unwrap_err();
    assert!(err.to_string().starts_with("failed to parse DSN"));
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_tables_skips_internal_tables() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(
        dir.path(),
        "list.db",
        "CREATE TABLE table1 (id INTEGER PRIMARY KEY AUTOINCREMENT);
         CREATE TABLE table2 (id INTEGER);
         INSERT INTO table1 DEFAULT VALUES;",
    ));
    let conn = open(&dsn).await;

    // AUTOINCREMENT creates sqlite_sequence, which must not be listed.
    let tables = list_tables_for_dsn(conn.as_ref(), &dsn).await.unwrap();
    assert_eq!(tables, ["table1", "table2"]);
}

#[tokio::test]
async fn test_in_memory_database() {
    let conn = open("sqlite3::memory:").await;
    conn.execute("CREATE TABLE scratch (k TEXT PRIMARY KEY, v BLOB)").await.unwrap();

    let tables = list_tables_for_dsn(conn.as_ref(), "sqlite3::memory:").await.unwrap();
    assert_eq!(tables, ["scratch"]);
}

// ============================================================================
// Legacy SQLite Views
// ============================================================================

#[tokio::test]
async fn test_raw_pragma_rows() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "raw.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let raw = describe_table_raw(conn.as_ref(), "test_table").await.unwrap();
    assert_eq!(raw.len(), 4);
    assert_eq!(raw[0].name, "id");
    assert_eq!(raw[0].primary_key, 1);
    assert_eq!(raw[0].default, "");
    assert_eq!(raw[1].notnull, 1);
    assert_eq!(raw[2].default, "");
    assert_eq!(raw[3].default, "'no-email'");
}

#[tokio::test]
async fn test_table_schema_details() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(
        dir.path(),
        "shop.db",
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE);
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY,
             customer_id INTEGER NOT NULL REFERENCES customers(id),
             total REAL DEFAULT 0
         );
         CREATE INDEX idx_orders_customer ON orders(customer_id);
         INSERT INTO customers (email) VALUES ('a@example.com'), ('b@example.com');
         INSERT INTO orders (customer_id, total) VALUES (1, 9.5);",
    ));
    let conn = open(&dsn).await;

    let schema = table_schema(conn.as_ref(), "orders").await.unwrap();
    assert_eq!(schema.name, "orders");
    assert_eq!(schema.columns.len(), 3);
    assert_eq!(schema.columns[2].default.as_deref(), Some("0"));
    assert_eq!(schema.statistics.row_count, 1);

    let index_names: Vec<_> = schema.indexes.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(index_names, ["idx_orders_customer"]);

    let kinds: Vec<_> = schema.constraints.iter().map(|c| c.kind.as_str()).collect();
    assert_eq!(kinds, ["PRIMARY KEY", "FOREIGN KEY"]);
    let fk = &schema.constraints[1];
    assert_eq!(fk.columns, ["customer_id"]);
    assert_eq!(fk.references.as_deref(), Some("customers(id)"));

    let customers = table_schema(conn.as_ref(), "customers").await.unwrap();
    assert!(customers.constraints.iter().any(|c| c.kind == "UNIQUE" && c.columns == ["email"]));
    assert_eq!(customers.statistics.row_count, 2);
}

#[tokio::test]
async fn test_table_schema_missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "m.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let err = table_schema(conn.as_ref(), "ghost").await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INPUT");
    assert!(err.to_string().contains("table ghost does not exist"));
}

#[tokio::test]
async fn test_database_schema_covers_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(
        dir.path(),
        "db.db",
        "CREATE TABLE a (id INTEGER PRIMARY KEY); CREATE TABLE b (id INTEGER PRIMARY KEY);",
    ));
    let conn = open(&dsn).await;

    let schema = database_schema(conn.as_ref()).await.unwrap();
    assert_eq!(schema.table_count, 2);
    assert!(schema.version.starts_with('3'));
    assert!(schema.size_bytes > 0);
}

// ============================================================================
// Passthrough Executors
// ============================================================================

#[tokio::test]
async fn test_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "rw.db", TEST_TABLE));
    let conn = open(&dsn).await;

    let written = schemata::write_query(
        conn.as_ref(),
        "INSERT INTO test_table (name) VALUES ('Alice'), ('Bob')",
    )
    .await
    .unwrap();
    assert_eq!(written.rows_affected, 2);
    assert_eq!(written.message, "2 rows affected");

    let result = schemata::read_query(conn.as_ref(), "SELECT id, name, email FROM test_table ORDER BY id")
        .await
        .unwrap();
    assert_eq!(result.columns, ["id", "name", "email"]);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0]["name"], serde_json::json!("Alice"));
    assert_eq!(result.rows[1]["email"], serde_json::json!("no-email"));
}

#[tokio::test]
async fn test_alter_reports_no_rows_message() {
    // FakeConnection::execute always reports zero affected rows.
    let fake = common::FakeConnection::new("sqlite3");
    let written = schemata::write_query(&fake, "ALTER TABLE test_table ADD COLUMN age INTEGER")
        .await
        .unwrap();
    assert_eq!(written.message, "ALTER query executed successfully, but no rows were affected.");
    assert_eq!(fake.issued()[0].sql, "ALTER TABLE test_table ADD COLUMN age INTEGER");
}

#[tokio::test]
async fn test_alter_is_visible_to_describe() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = sqlite_dsn(&sqlite_file(dir.path(), "alter.db", TEST_TABLE));
    let conn = open(&dsn).await;

    schemata::write_query(conn.as_ref(), "ALTER TABLE test_table ADD COLUMN nickname TEXT")
        .await
        .unwrap();

    let cols = describe_table_for_dsn(conn.as_ref(), &dsn, "test_table").await.unwrap();
    assert_eq!(cols.len(), 5);
    assert_eq!(cols.last().map(|c| c.name.as_str()), Some("nickname"));
}

#[tokio::test]
async fn test_create_table_and_blob_roundtrip() {
    let conn = open("sqlite3::memory:").await;
    let message = schemata::create_table(conn.as_ref(), "CREATE TABLE files (name TEXT, data BLOB)")
        .await
        .unwrap();
    assert_eq!(message, "Table created successfully");

    conn.execute("INSERT INTO files VALUES ('x', X'DEAD')").await.unwrap();
    let result = schemata::read_query(conn.as_ref(), "SELECT data FROM files").await.unwrap();
    assert_eq!(result.rows[0]["data"], serde_json::json!("3q0="));
}

#[tokio::test]
async fn test_bad_statement_is_query_failed() {
    let conn = open("sqlite3::memory:").await;
    let err = schemata::read_query(conn.as_ref(), "SELEC nonsense").await.unwrap_err();
    assert_eq!(err.error_code(), "QUERY_FAILED");

    let err = schemata::create_table(conn.as_ref(), "CREATE TABLE").await.unwrap_err();
    assert!(err.to_string().contains("create table"));
}
