//! SQL Server adapter
//!
//! `tiberius` over a tokio `TcpStream` (via the `tokio-util` compat layer).
//! A TDS connection handles one request at a time, so the client is guarded
//! by an async mutex.

use std::time::Instant;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{DbConnection, DriverError, Rows, SqlValue};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

pub struct MssqlConnection {
    client: Mutex<Client<Compat<TcpStream>>>,
    driver: &'static str,
}

impl MssqlConnection {
    pub async fn connect(dsn: &Dsn) -> Result<Self> {
        let config = build_config(dsn)?;

        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            SchemataError::connection_failed(format!("Failed to reach SQL Server: {e}"))
        })?;
        tcp.set_nodelay(true)
            .map_err(|e| SchemataError::connection_failed(format!("Failed to configure socket: {e}")))?;

        let client = Client::connect(config, tcp.compat_write()).await.map_err(|e| {
            SchemataError::connection_failed(format!("Failed to connect to SQL Server: {e}"))
        })?;

        Ok(Self { client: Mutex::new(client), driver: dsn.driver() })
    }
}

fn build_config(dsn: &Dsn) -> Result<Config> {
    let host = dsn
        .host()
        .ok_or_else(|| SchemataError::invalid_input("SQL Server DSN requires a host"))?;

    let mut config = Config::new();
    config.host(host);
    config.port(dsn.port().unwrap_or(1433));

    if let Some(db) = dsn.database() {
        config.database(db);
    }

    let trust = dsn
        .query_param("TrustServerCertificate")
        .or_else(|| dsn.query_param("trust_cert"))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if trust {
        config.trust_cert();
    }

    match dsn.query_param("encrypt").as_deref() {
        Some("disable") => config.encryption(EncryptionLevel::NotSupported),
        Some("false") => config.encryption(EncryptionLevel::Off),
        _ => config.encryption(EncryptionLevel::Required),
    }

    config.authentication(AuthMethod::sql_server(
        dsn.username().unwrap_or("sa"),
        dsn.password().unwrap_or_default(),
    ));

    Ok(config)
}

#[async_trait]
impl DbConnection for MssqlConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError> {
        let start = Instant::now();
        let mut client = self.client.lock().await;

        let bound: Vec<&dyn tiberius::ToSql> =
            params.iter().map(|p| p as &dyn tiberius::ToSql).collect();

        let mut stream = client.query(sql, &bound).await.map_err(|e| DriverError::new(e.to_string()))?;

        let columns: Vec<String> = match stream.columns().await {
            Ok(Some(cols)) => cols.iter().map(|c| c.name().to_string()).collect(),
            Ok(None) => Vec::new(),
            Err(e) => return Err(DriverError::new(e.to_string())),
        };

        let mut out = Vec::new();
        let mut deferred = None;
        match stream.into_first_result().await {
            Ok(rows) => {
                for row in rows {
                    let values = row
                        .into_iter()
                        .map(column_value)
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    out.push(values);
                }
            }
            Err(e) => deferred = Some(DriverError::new(e.to_string())),
        }

        tracing::debug!(
            row_count = out.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "mssql query completed"
        );

        let rows = Rows::new(columns, out);
        Ok(match deferred {
            Some(err) => rows.with_deferred_error(err),
            None => rows,
        })
    }

    async fn execute(&self, sql: &str) -> std::result::Result<u64, DriverError> {
        let mut client = self.client.lock().await;
        let result = client.execute(sql, &[]).await.map_err(|e| DriverError::new(e.to_string()))?;
        Ok(result.rows_affected().iter().sum::<u64>())
    }
}

fn column_value(data: ColumnData<'static>) -> std::result::Result<SqlValue, DriverError> {
    let temporal = |data: &ColumnData<'static>| -> std::result::Result<SqlValue, DriverError> {
        let text = match data {
            ColumnData::Date(_) => chrono::NaiveDate::from_sql(data)
                .map(|v| v.map(|d| d.format("%Y-%m-%d").to_string())),
            ColumnData::Time(_) => chrono::NaiveTime::from_sql(data)
                .map(|v| v.map(|t| t.format("%H:%M:%S%.f").to_string())),
            ColumnData::DateTimeOffset(_) => {
                chrono::DateTime::<chrono::FixedOffset>::from_sql(data)
                    .map(|v| v.map(|t| t.to_rfc3339()))
            }
            _ => chrono::NaiveDateTime::from_sql(data)
                .map(|v| v.map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        }
        .map_err(|e| DriverError::new(e.to_string()))?;
        Ok(text.map_or(SqlValue::Null, SqlValue::Text))
    };

    Ok(match data {
        ColumnData::Bit(v) => v.map_or(SqlValue::Null, SqlValue::Bool),
        ColumnData::U8(v) => v.map_or(SqlValue::Null, |n| SqlValue::Int(i64::from(n))),
        ColumnData::I16(v) => v.map_or(SqlValue::Null, |n| SqlValue::Int(i64::from(n))),
        ColumnData::I32(v) => v.map_or(SqlValue::Null, |n| SqlValue::Int(i64::from(n))),
        ColumnData::I64(v) => v.map_or(SqlValue::Null, SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null, |n| SqlValue::Float(f64::from(n))),
        ColumnData::F64(v) => v.map_or(SqlValue::Null, SqlValue::Float),
        ColumnData::String(v) => v.map_or(SqlValue::Null, |s| SqlValue::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map_or(SqlValue::Null, |g| SqlValue::Text(g.to_string())),
        ColumnData::Binary(v) => v.map_or(SqlValue::Null, |b| SqlValue::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map_or(SqlValue::Null, |n| SqlValue::Text(n.to_string())),
        ColumnData::Xml(v) => {
            v.map_or(SqlValue::Null, |x| SqlValue::Text(x.into_owned().into_string()))
        }
        ref other @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)
        | ColumnData::DateTimeOffset(_)
        | ColumnData::Date(_)
        | ColumnData::Time(_)) => temporal(other)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_column_value_scalars() {
        assert_eq!(column_value(ColumnData::I32(Some(1))).unwrap(), SqlValue::Int(1));
        assert_eq!(column_value(ColumnData::I32(None)).unwrap(), SqlValue::Null);
        assert_eq!(column_value(ColumnData::Bit(Some(true))).unwrap(), SqlValue::Bool(true));
        assert_eq!(
            column_value(ColumnData::String(Some(Cow::Borrowed("YES")))).unwrap(),
            SqlValue::Text("YES".into())
        );
    }

    #[test]
    fn test_build_config_requires_host() {
        let dsn = crate::dsn::classify("sqlserver:///?database=app").unwrap();
        assert!(build_config(&dsn).is_err());
    }
}
