//! `ClickHouse` adapter
//!
//! Talks to the HTTP interface through the `clickhouse` client. Results are
//! requested as `JSONCompactEachRowWithNames`: one JSON array per line, the
//! first line carrying column names, so column order survives intact.

use std::borrow::Cow;
use std::time::Instant;

use async_trait::async_trait;

use super::{DbConnection, DriverError, Rows, SqlValue};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

const RESULT_FORMAT: &str = "JSONCompactEachRowWithNames";

pub struct ClickHouseConnection {
    client: ::clickhouse::Client,
    driver: &'static str,
}

impl ClickHouseConnection {
    pub async fn connect(dsn: &Dsn) -> Result<Self> {
        let host = dsn
            .host()
            .ok_or_else(|| SchemataError::invalid_input("ClickHouse DSN requires a host"))?;
        let secure = dsn.query_param("secure").is_some_and(|v| v == "true");
        let scheme = if secure { "https" } else { "http" };
        let port = dsn.port().unwrap_or(if secure { 8443 } else { 8123 });

        let mut client = ::clickhouse::Client::default().with_url(format!("{scheme}://{host}:{port}"));
        if let Some(user) = dsn.username() {
            client = client.with_user(user);
        }
        if let Some(password) = dsn.password() {
            client = client.with_password(password);
        }
        if let Some(db) = dsn.database() {
            client = client.with_database(db);
        }

        client.query("SELECT 1").execute().await.map_err(|e| {
            SchemataError::connection_failed(format!("Failed to connect to ClickHouse: {e}"))
        })?;

        Ok(Self { client, driver: dsn.driver() })
    }
}

#[async_trait]
impl DbConnection for ClickHouseConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError> {
        let start = Instant::now();

        let mut query = self.client.query(&statement_text(sql, params));
        for param in params {
            query = query.bind(*param);
        }
        let mut cursor =
            query.fetch_bytes(RESULT_FORMAT).map_err(|e| DriverError::new(e.to_string()))?;

        let mut body = Vec::new();
        let mut deferred = None;
        loop {
            match cursor.next().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    deferred = Some(DriverError::new(e.to_string()));
                    break;
                }
            }
        }

        let (columns, out, parse_error) = parse_compact_rows(&body);
        if deferred.is_none() {
            deferred = parse_error;
        }

        tracing::debug!(
            row_count = out.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "clickhouse query completed"
        );

        let rows = Rows::new(columns, out);
        Ok(match deferred {
            Some(err) => rows.with_deferred_error(err),
            None => rows,
        })
    }

    async fn execute(&self, sql: &str) -> std::result::Result<u64, DriverError> {
        self.client.query(&statement_text(sql, &[])).execute().await.map_err(|e| DriverError::new(e.to_string()))?;
        // The HTTP interface does not report affected rows.
        Ok(0)
    }
}

/// The client treats every `?` as a bind placeholder. Unbound statements have
/// theirs doubled so the server receives the text unchanged.
fn statement_text<'a>(sql: &'a str, params: &[&str]) -> Cow<'a, str> {
    if params.is_empty() && sql.contains('?') {
        Cow::Owned(sql.replace('?', "??"))
    } else {
        Cow::Borrowed(sql)
    }
}

/// Split a `JSONCompactEachRowWithNames` body into names and rows. Lines that
/// fail to parse stop the scan and are reported as an iteration error.
fn parse_compact_rows(body: &[u8]) -> (Vec<String>, Vec<Vec<SqlValue>>, Option<DriverError>) {
    let text = String::from_utf8_lossy(body);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let columns: Vec<String> = match lines.next().map(serde_json::from_str::<Vec<String>>) {
        Some(Ok(names)) => names,
        Some(Err(e)) => {
            return (Vec::new(), Vec::new(), Some(DriverError::new(format!("bad header row: {e}"))))
        }
        None => return (Vec::new(), Vec::new(), None),
    };

    let mut rows = Vec::new();
    for line in lines {
        match serde_json::from_str::<Vec<serde_json::Value>>(line) {
            Ok(values) => rows.push(values.into_iter().map(json_value).collect()),
            Err(e) => {
                return (columns, rows, Some(DriverError::new(format!("bad result row: {e}"))));
            }
        }
    }

    (columns, rows, None)
}

fn json_value(value: serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(i),
            None => n.as_f64().map_or_else(|| SqlValue::Text(n.to_string()), SqlValue::Float),
        },
        serde_json::Value::String(s) => SqlValue::Text(s),
        other => SqlValue::Text(other.to_string()),
    }
}
