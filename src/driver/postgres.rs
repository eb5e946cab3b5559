//! `PostgreSQL` adapter
//!
//! Built on `tokio-postgres`. The connection future is spawned onto the
//! runtime and the `Client` is shared; `tokio-postgres` pipelines concurrent
//! requests on one connection, so no extra locking is needed.

use std::time::Instant;

use async_trait::async_trait;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Row};

use super::{DbConnection, DriverError, Rows, SqlValue};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

pub struct PostgresConnection {
    client: Client,
    driver: &'static str,
}

impl PostgresConnection {
    pub async fn connect(dsn: &Dsn) -> Result<Self> {
        let config = build_pg_config(dsn)?;

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            SchemataError::connection_failed(format!("Failed to connect to PostgreSQL: {e}"))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection closed with error");
            }
        });

        Ok(Self { client, driver: dsn.driver() })
    }
}

/// Build `PostgreSQL` connection config from the DSN parts
fn build_pg_config(dsn: &Dsn) -> Result<Config> {
    let host = dsn
        .host()
        .ok_or_else(|| SchemataError::invalid_input("PostgreSQL DSN requires a host"))?;

    let mut pg_config = Config::new();
    pg_config.host(host).port(dsn.port().unwrap_or(5432));

    if let Some(user) = dsn.username() {
        pg_config.user(user);
    }
    if let Some(password) = dsn.password() {
        pg_config.password(password);
    }
    if let Some(db) = dsn.database() {
        pg_config.dbname(&db);
    }
    if let Some(app) = dsn.query_param("application_name") {
        pg_config.application_name(&app);
    }

    Ok(pg_config)
}

#[async_trait]
impl DbConnection for PostgresConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError> {
        let start = Instant::now();

        let stmt = self.client.prepare(sql).await.map_err(|e| DriverError::new(e.to_string()))?;
        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

        let bound: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let pg_rows =
            self.client.query(&stmt, &bound).await.map_err(|e| DriverError::new(e.to_string()))?;

        let mut out = Vec::with_capacity(pg_rows.len());
        for row in &pg_rows {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(postgres_value(row, idx)?);
            }
            out.push(values);
        }

        tracing::debug!(
            row_count = out.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "postgres query completed"
        );

        Ok(Rows::new(columns, out))
    }

    async fn execute(&self, sql: &str) -> std::result::Result<u64, DriverError> {
        self.client.execute(sql, &[]).await.map_err(|e| DriverError::new(e.to_string()))
    }
}

/// Convert `PostgreSQL` value to a driver-neutral value
fn postgres_value(row: &Row, idx: usize) -> std::result::Result<SqlValue, DriverError> {
    let col_type = row.columns()[idx].type_();

    let fail = |e: tokio_postgres::Error| {
        DriverError::new(format!("Failed to read {} value in column {idx}: {e}", col_type.name()))
    };

    let value = match *col_type {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(fail)?.map(SqlValue::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(fail)?.map(SqlValue::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Int(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(fail)?.map(SqlValue::Float),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Text(v.to_string())),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map_err(fail)?.map(SqlValue::Bytes),
        Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Text(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Text(v.to_rfc3339())),
        Type::DATE => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Text(v.format("%Y-%m-%d").to_string())),
        Type::TIME => row
            .try_get::<_, Option<chrono::NaiveTime>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Text(v.format("%H:%M:%S%.f").to_string())),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .map_err(fail)?
            .map(|v| SqlValue::Text(v.to_string())),
        // Text family and anything else that decodes as a string
        _ => row.try_get::<_, Option<String>>(idx).map_err(fail)?.map(SqlValue::Text),
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsn::classify;

    #[test]
    fn test_build_pg_config_defaults_port() {
        let dsn = classify("postgres://alice:pw@db.internal/orders").unwrap();
        let config = build_pg_config(&dsn).unwrap();
        assert_eq!(config.get_ports(), &[5432]);
        assert_eq!(config.get_user(), Some("alice"));
        assert_eq!(config.get_dbname(), Some("orders"));
    }

    #[test]
    fn test_build_pg_config_requires_host() {
        let dsn = classify("postgres:///orders").unwrap();
        assert!(matches!(build_pg_config(&dsn), Err(SchemataError::InvalidInput(_))));
    }
}
