//! `MySQL` adapter
//!
//! Uses a `mysql_async` pool so concurrent requests each check out their own
//! connection. Parameterised statements go through the binary protocol,
//! everything else through the text protocol so caller SQL that cannot be
//! prepared (DDL, `SHOW`, multi-statement scripts) still runs.

use std::time::Instant;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Params, Pool, Row, Value};

use super::{DbConnection, DriverError, Rows, SqlValue};
use crate::dsn::Dsn;
use crate::error::{Result, SchemataError};

pub struct MySqlConnection {
    pool: Pool,
    driver: &'static str,
}

impl MySqlConnection {
    pub async fn connect(dsn: &Dsn) -> Result<Self> {
        let pool = Pool::new(build_mysql_opts(dsn)?);

        // Surface bad credentials now rather than on the first tool call.
        let conn = pool.get_conn().await.map_err(|e| {
            SchemataError::connection_failed(format!("Failed to connect to MySQL: {e}"))
        })?;
        drop(conn);

        Ok(Self { pool, driver: dsn.driver() })
    }

    async fn conn(&self) -> std::result::Result<Conn, DriverError> {
        self.pool.get_conn().await.map_err(|e| DriverError::new(e.to_string()))
    }
}

/// Build `MySQL` connection options from the DSN parts
fn build_mysql_opts(dsn: &Dsn) -> Result<OptsBuilder> {
    let host = dsn
        .host()
        .ok_or_else(|| SchemataError::invalid_input("MySQL DSN requires a host"))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(dsn.port().unwrap_or(3306))
        .user(dsn.username())
        .pass(dsn.password())
        .db_name(dsn.database());

    Ok(opts)
}

#[async_trait]
impl DbConnection for MySqlConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[&str]) -> std::result::Result<Rows, DriverError> {
        let start = Instant::now();
        let mut conn = self.conn().await?;

        let fetched: std::result::Result<Vec<Row>, mysql_async::Error> = if params.is_empty() {
            conn.query(sql).await
        } else {
            let bound: Vec<Value> = params.iter().map(|p| Value::from(*p)).collect();
            conn.exec(sql, Params::Positional(bound)).await
        };
        let mysql_rows = fetched.map_err(|e| DriverError::new(e.to_string()))?;

        // Column metadata travels with each row; an empty result has none.
        let columns: Vec<String> = mysql_rows
            .first()
            .map(|r| r.columns_ref().iter().map(|c| c.name_str().to_string()).collect())
            .unwrap_or_default();

        let out: Vec<Vec<SqlValue>> = mysql_rows
            .iter()
            .map(|row| (0..row.len()).map(|idx| mysql_value(row.as_ref(idx))).collect())
            .collect();

        tracing::debug!(
            row_count = out.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "mysql query completed"
        );

        Ok(Rows::new(columns, out))
    }

    async fn execute(&self, sql: &str) -> std::result::Result<u64, DriverError> {
        let mut conn = self.conn().await?;
        conn.query_drop(sql).await.map_err(|e| DriverError::new(e.to_string()))?;
        Ok(conn.affected_rows())
    }
}

/// Convert `MySQL` value to a driver-neutral value
fn mysql_value(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::NULL) => SqlValue::Null,
        // Text protocol delivers everything as bytes; keep UTF-8 as text.
        Some(Value::Bytes(bytes)) => match std::str::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s.to_string()),
            Err(_) => SqlValue::Bytes(bytes.clone()),
        },
        Some(Value::Int(i)) => SqlValue::Int(*i),
        Some(Value::UInt(u)) => match i64::try_from(*u) {
            Ok(i) => SqlValue::Int(i),
            Err(_) => SqlValue::Text(u.to_string()),
        },
        Some(Value::Float(f)) => SqlValue::Float(f64::from(*f)),
        Some(Value::Double(d)) => SqlValue::Float(*d),
        Some(Value::Date(year, month, day, hour, minute, second, micro)) => SqlValue::Text(format!(
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{micro:06}"
        )),
        Some(Value::Time(is_negative, days, hours, minutes, seconds, micros)) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            SqlValue::Text(format!("{sign}{total_hours}:{minutes:02}:{seconds:02}.{micros:06}"))
        }
    }
}
