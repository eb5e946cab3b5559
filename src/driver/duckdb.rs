//! `DuckDB` adapter
//!
//! Same shape as the `SQLite` adapter: an embedded, synchronous engine behind
//! a mutex.

use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use duckdb::types::ValueRef;
use duckdb::Connection;

use super::{DbConnection, DriverError, Rows, SqlValue};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

pub struct DuckDbConnection {
    conn: Mutex<Connection>,
    driver: &'static str,
}

impl DuckDbConnection {
    pub fn open(dsn: &Dsn) -> Result<Self> {
        let path = dsn.file_path().unwrap_or_else(|| ":memory:".to_string());

        let conn = if path == ":memory:" { Connection::open_in_memory() } else { Connection::open(&path) }
            .map_err(|e| {
                SchemataError::connection_failed(format!("Failed to open DuckDB database: {e}"))
            })?;

        Ok(Self::from_connection(conn, dsn.driver()))
    }

    #[must_use]
    pub fn from_connection(conn: Connection, driver: &'static str) -> Self {
        Self { conn: Mutex::new(conn), driver }
    }

    fn lock(&self) -> std::result::Result<std::sync::MutexGuard<'_, Connection>, DriverError> {
        self.conn.lock().map_err(|e| DriverError::new(format!("DuckDB connection lock poisoned: {e}")))
    }
}

#[async_trait]
impl DbConnection for DuckDbConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError> {
        let start = Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn.prepare(sql).map_err(|e| DriverError::new(e.to_string()))?;
        let mut rows = stmt
            .query(duckdb::params_from_iter(params.iter()))
            .map_err(|e| DriverError::new(e.to_string()))?;

        // Column names are only known once the statement has run.
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names().iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        let width = columns.len();

        let mut out = Vec::new();
        let mut deferred = None;
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut values = Vec::with_capacity(width);
                    for idx in 0..width {
                        let value = row.get_ref(idx).map_err(|e| DriverError::new(e.to_string()))?;
                        values.push(duckdb_value(value));
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
            "duckdb query completed"
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

fn duckdb_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Boolean(b) => SqlValue::Bool(b),
        ValueRef::TinyInt(i) => SqlValue::Int(i64::from(i)),
        ValueRef::SmallInt(i) => SqlValue::Int(i64::from(i)),
        ValueRef::Int(i) => SqlValue::Int(i64::from(i)),
        ValueRef::BigInt(i) => SqlValue::Int(i),
        ValueRef::UTinyInt(i) => SqlValue::Int(i64::from(i)),
        ValueRef::USmallInt(i) => SqlValue::Int(i64::from(i)),
        ValueRef::UInt(i) => SqlValue::Int(i64::from(i)),
        ValueRef::UBigInt(i) => i64::try_from(i).map_or_else(|_| SqlValue::Text(i.to_string()), SqlValue::Int),
        ValueRef::HugeInt(i) => i64::try_from(i).map_or_else(|_| SqlValue::Text(i.to_string()), SqlValue::Int),
        ValueRef::Float(f) => SqlValue::Float(f64::from(f)),
        ValueRef::Double(f) => SqlValue::Float(f),
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => SqlValue::Text(s.to_string()),
            Err(_) => SqlValue::Bytes(t.to_vec()),
        },
        ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
        // Decimals, temporals and nested types render through the owned value.
        other => SqlValue::Text(format!("{:?}", other.to_owned())),
    }
}
