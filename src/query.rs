//! Passthrough statement execution
//!
//! SQL is forwarded to the connection verbatim. Nothing here inspects or
//! restricts the statement; callers decide what they send.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::driver::DbConnection;
use crate::error::{Result, SchemataError};

/// Rows returned by [`read_query`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadQueryResult {
    /// Column names in result order
    pub columns: Vec<String>,

    /// One object per row, keyed by column name
    pub rows: Vec<HashMap<String, serde_json::Value>>,
}

/// Outcome of [`write_query`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
    pub rows_affected: u64,

    /// Human-readable summary
    pub message: String,
}

/// Run a row-returning statement and collect every row as JSON
///
/// # Errors
/// `QueryFailed` if the statement is rejected or the cursor fails mid-way.
pub async fn read_query(conn: &dyn DbConnection, sql: &str) -> Result<ReadQueryResult> {
    let start = Instant::now();
    let mut rows = conn
        .query(sql, &[])
        .await
        .map_err(|e| SchemataError::query_failed(format!("failed to execute query: {e}")))?;

    let columns = rows.columns().to_vec();
    let mut out = Vec::new();
    for row in rows.by_ref() {
        let obj: HashMap<String, serde_json::Value> = row
            .columns()
            .iter()
            .zip(row.values())
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        out.push(obj);
    }
    rows.finish()
        .map_err(|e| SchemataError::query_failed(format!("row iteration error: {e}")))?;

    tracing::debug!(
        row_count = out.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "read query finished"
    );

    Ok(ReadQueryResult { columns, rows: out })
}

/// Run a data-modifying statement
///
/// # Errors
/// `QueryFailed` if the engine rejects the statement.
pub async fn write_query(conn: &dyn DbConnection, sql: &str) -> Result<WriteQueryResult> {
    let rows_affected = conn
        .execute(sql)
        .await
        .map_err(|e| SchemataError::query_failed(format!("failed to execute query: {e}")))?;

    tracing::debug!(rows_affected, "write query finished");

    Ok(WriteQueryResult { rows_affected, message: write_message(sql, rows_affected) })
}

/// Run a `CREATE TABLE` statement
///
/// # Errors
/// `QueryFailed` if the engine rejects the statement.
pub async fn create_table(conn: &dyn DbConnection, sql: &str) -> Result<&'static str> {
    conn.execute(sql).await.map_err(|e| {
        SchemataError::query_failed(format!("failed to execute create table query: {e}"))
    })?;
    Ok("Table created successfully")
}

// DDL reports zero affected rows on most engines.
fn write_message(sql: &str, rows_affected: u64) -> String {
    let is_alter = sql
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("ALTER "));
    if is_alter && rows_affected == 0 {
        "ALTER query executed successfully, but no rows were affected.".to_string()
    } else {
        format!("{rows_affected} rows affected")
    }
}
