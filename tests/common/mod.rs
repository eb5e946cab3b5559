//! Shared test fixtures
//!
//! `FakeConnection` stands in for a live server of any dialect: it replays
//! scripted results and records every statement with its bound parameters.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schemata::{DbConnection, DriverError, Rows, SqlValue};

/// One recorded statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub sql: String,
    pub params: Vec<String>,
}

pub struct FakeConnection {
    driver: String,
    script: Mutex<VecDeque<Result<Rows, DriverError>>>,
    issued: Mutex<Vec<Issued>>,
}

impl FakeConnection {
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            script: Mutex::new(VecDeque::new()),
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result set for the next query
    pub fn returning(self, rows: Rows) -> Self {
        self.script.lock().unwrap().push_back(Ok(rows));
        self
    }

    /// Queue a statement failure for the next query
    pub fn failing(self, message: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(DriverError::new(message)));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn issued(&self) -> Vec<Issued> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl DbConnection for FakeConnection {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<Rows, DriverError> {
        self.issued.lock().unwrap().push(Issued {
            sql: sql.to_string(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Rows::new(Vec::new(), Vec::new())))
    }

    async fn execute(&self, sql: &str) -> Result<u64, DriverError> {
        self.issued.lock().unwrap().push(Issued { sql: sql.to_string(), params: Vec::new() });
        Ok(0)
    }
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

pub fn rows(columns: &[&str], values: Vec<Vec<SqlValue>>) -> Rows {
    Rows::new(columns.iter().map(|c| (*c).to_string()).collect(), values)
}

/// A fresh SQLite file inside `dir`, populated by `ddl`
pub fn sqlite_file(dir: &Path, name: &str, ddl: &str) -> PathBuf {
    let path = dir.join(name);
    let conn = rusqlite::Connection::open(&path).expect("create sqlite file");
    conn.execute_batch(ddl).expect("apply ddl");
    path
}

/// `sqlite3://` DSN for an absolute file path
pub fn sqlite_dsn(path: &Path) -> String {
    format!("sqlite3://{}", path.display())
}
