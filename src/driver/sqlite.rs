//! `SQLite` adapter
//!
//! `rusqlite` is synchronous and its `Connection` is not `Sync`, so the handle
//! sits behind a mutex and each call runs to completion while holding it.
//! Statements are short catalog lookups or caller SQL against a local file.

use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::{DbConnection, DriverError, Rows, SqlValue};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

pub struct SqliteConnection {
    conn: Mutex<Connection>,
    driver: &'static str,
}

impl SqliteConnection {
    /// Open the file named by the DSN, creating it if needed
    pub fn open(dsn: &Dsn) -> Result<Self> {
        let path = dsn
            .file_path()
            .ok_or_else(|| SchemataError::invalid_input("SQLite DSN does not name a file"))?;

        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
        }
        .map_err(|e| SchemataError::connection_failed(format!("Failed to open SQLite database: {e}")))?;

        Ok(Self::from_connection(conn, dsn.driver()))
    }

    /// Wrap an already-open `rusqlite` connection
    #[must_use]
    pub fn from_connection(conn: Connection, driver: &'static str) -> Self {
        Self { conn: Mutex::new(conn), driver }
    }

    fn lock(&self) -> std::result::Result<std::sync::MutexGuard<'_, Connection>, DriverError> {
        self.conn.lock().map_err(|e| DriverError::new(format!("SQLite connection lock poisoned: {e}")))
    }
}

#[async_trait]
impl DbConnection for SqliteConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError> {
        let start = Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn.prepare(sql).map_err(|e| DriverError::new(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();
        let width = columns.len();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(|e| DriverError::new(e.to_string()))?;

        let mut out = Vec::new();
        let mut deferred = None;
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut values = Vec::with_capacity(width);
                    for idx in 0..width {
                        let value = row.get_ref(idx).map_err(|e| DriverError::new(e.to_string()))?;
                        values.push(sqlite_value(value));
                    }
                    out.push(values);
                }
                Ok(None) => break,
                Err(e) => {
                    deferred = Some(DriverError::new(e.to_string()));
                    break;
                }
            }
        }

        tracing::debug!(
            row_count = out.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "sqlite query completed"
        );

        let rows = Rows::new(columns, out);
        Ok(match deferred {
            Some(err) => rows.with_deferred_error(err),
            None => rows,
        })
    }

    async fn execute(&self, sql: &str) -> std::result::Result<u64, DriverError> {
        let conn = self.lock()?;
        let affected = conn.execute(sql, []).map_err(|e| DriverError::new(e.to_string()))?;
        Ok(affected as u64)
    }
}

fn sqlite_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => SqlValue::Text(s.to_string()),
            Err(_) => SqlValue::Bytes(t.to_vec()),
        },
        ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
    }
}
