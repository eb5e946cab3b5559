//! Database driver seam
//!
//! Every engine is reached through [`DbConnection`], an object-safe async
//! trait. Adapters live in per-engine submodules behind cargo features and
//! translate their native row types into [`SqlValue`] so the catalog layer
//! never sees a driver type.
//!
//! Result sets are drained eagerly into a [`Rows`] cursor. A driver failure
//! that happens after the statement was accepted (while stepping through rows)
//! is kept on the cursor and surfaced by [`Rows::finish`], separate from the
//! statement error returned by [`DbConnection::query`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::dialect::{Dialect, DialectIdentity};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

#[cfg(feature = "clickhouse")]
pub mod clickhouse;
#[cfg(feature = "duckdb")]
pub mod duckdb;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Time allowed for opening a connection
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Error raised by a driver adapter or a row accessor
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A single database value, detached from any driver
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// JSON rendering used by passthrough results; BLOBs become Base64
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use base64::Engine;

        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number), // NaN/Infinity as null
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// One result row. Column names are shared across the rows of a result set.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `idx`
    ///
    /// # Errors
    /// Fails when the row has fewer columns than requested.
    pub fn get(&self, idx: usize) -> std::result::Result<&SqlValue, DriverError> {
        self.values.get(idx).ok_or_else(|| {
            DriverError::new(format!(
                "column index {idx} out of range, row has {} columns",
                self.values.len()
            ))
        })
    }

    /// Non-null text. Numbers and booleans are rendered, bytes must be UTF-8.
    pub fn get_string(&self, idx: usize) -> std::result::Result<String, DriverError> {
        self.get_opt_string(idx)?.ok_or_else(|| {
            DriverError::new(format!("converting NULL to string is unsupported (column {idx})"))
        })
    }

    /// Text, or `None` for NULL
    pub fn get_opt_string(&self, idx: usize) -> std::result::Result<Option<String>, DriverError> {
        Ok(match self.get(idx)? {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Bytes(b) => Some(String::from_utf8(b.clone()).map_err(|e| {
                DriverError::new(format!("column {idx} is not valid UTF-8: {e}"))
            })?),
        })
    }

    /// Integer; numeric text is parsed
    pub fn get_i64(&self, idx: usize) -> std::result::Result<i64, DriverError> {
        match self.get(idx)? {
            SqlValue::Int(i) => Ok(*i),
            SqlValue::Bool(b) => Ok(i64::from(*b)),
            SqlValue::Text(s) => s.trim().parse::<i64>().map_err(|e| {
                DriverError::new(format!("converting text {s:?} to integer in column {idx}: {e}"))
            }),
            other => Err(DriverError::new(format!(
                "converting {} to integer is unsupported (column {idx})",
                other.kind()
            ))),
        }
    }

    /// Boolean; accepts 0/1 integers and the usual textual spellings
    pub fn get_bool(&self, idx: usize) -> std::result::Result<bool, DriverError> {
        match self.get(idx)? {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" | "y" | "yes" => Ok(true),
                "0" | "f" | "false" | "n" | "no" => Ok(false),
                _ => Err(DriverError::new(format!(
                    "converting text {s:?} to bool in column {idx} is unsupported"
                ))),
            },
            other => Err(DriverError::new(format!(
                "converting {} to bool is unsupported (column {idx})",
                other.kind()
            ))),
        }
    }
}

/// A drained result set
#[derive(Debug)]
pub struct Rows {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Row>,
    deferred: Option<DriverError>,
}

impl Rows {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows: Vec<Row> =
            rows.into_iter().map(|values| Row::new(Arc::clone(&columns), values)).collect();
        Self { columns, rows: rows.into_iter(), deferred: None }
    }

    /// Attach an error the driver reported while stepping through rows
    #[must_use]
    pub fn with_deferred_error(mut self, err: DriverError) -> Self {
        self.deferred = Some(err);
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Close the cursor and report any deferred iteration error
    ///
    /// # Errors
    /// Returns the error the driver hit after the statement started.
    pub fn finish(self) -> std::result::Result<(), DriverError> {
        match self.deferred {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }
}

/// An open database connection
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait DbConnection: Send + Sync {
    /// Driver token this connection was opened with
    fn driver_name(&self) -> &str;

    /// Run a statement that returns rows. `params` bind positionally using the
    /// dialect's own placeholder syntax.
    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError>;

    /// Run a statement for its side effects and return the affected row count
    async fn execute(&self, sql: &str) -> std::result::Result<u64, DriverError>;
}

/// Open a connection for a classified DSN
///
/// # Errors
/// `UnsupportedDialect` for drivers outside the eight dialects, and
/// `ConnectionFailed` when the adapter is missing, the open fails, or
/// [`OPEN_TIMEOUT`] elapses.
pub async fn connect(dsn: &Dsn) -> Result<Arc<dyn DbConnection>> {
    let dialect = match DialectIdentity::from_driver_token(dsn.driver()) {
        DialectIdentity::Known(d) => d,
        DialectIdentity::Unknown(token) => return Err(SchemataError::unsupported_dialect(token)),
    };

    tracing::debug!(dialect = dialect.as_str(), dsn = %dsn, "opening connection");

    tokio::time::timeout(OPEN_TIMEOUT, open(dialect, dsn))
        .await
        .map_err(|_| {
            SchemataError::connection_failed(format!(
                "timed out after {}s opening {dialect} connection",
                OPEN_TIMEOUT.as_secs()
            ))
        })?
}

async fn open(dialect: Dialect, dsn: &Dsn) -> Result<Arc<dyn DbConnection>> {
    match dialect {
        #[cfg(feature = "sqlite")]
        Dialect::Sqlite => Ok(Arc::new(sqlite::SqliteConnection::open(dsn)?)),
        #[cfg(feature = "postgres")]
        Dialect::Postgres => Ok(Arc::new(postgres::PostgresConnection::connect(dsn).await?)),
        #[cfg(feature = "mysql")]
        Dialect::MySql => Ok(Arc::new(mysql::MySqlConnection::connect(dsn).await?)),
        #[cfg(feature = "mssql")]
        Dialect::SqlServer => Ok(Arc::new(mssql::MssqlConnection::connect(dsn).await?)),
        #[cfg(feature = "duckdb")]
        Dialect::DuckDb => Ok(Arc::new(duckdb::DuckDbConnection::open(dsn)?)),
        #[cfg(feature = "clickhouse")]
        Dialect::ClickHouse => Ok(Arc::new(clickhouse::ClickHouseConnection::connect(dsn).await?)),
        #[allow(unreachable_patterns)]
        other => Err(SchemataError::connection_failed(format!(
            "no {other} driver is compiled into this build"
        ))),
    }
}
