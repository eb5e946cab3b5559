//! Schema introspection
//!
//! [`describe_table`] and [`list_tables`] dispatch on the dialect to one of
//! eight catalog modules. Each module owns the catalog SQL for its engine and
//! the normalisation of that engine's rows into [`CanonicalColumn`] records,
//! so every caller sees the same shape regardless of where the metadata came
//! from.
//!
//! # Behaviour shared by all dialects
//! - exactly one catalog query per call, fully drained before returning
//! - columns come back in catalog ordinal order, never re-sorted
//! - `nullable` and `is_primary_key` are read independently from the catalog;
//!   a key column is not forced to be non-nullable
//! - a decode failure on a row (`RowScan`) and a failure reported by the cursor
//!   after iteration (`RowIteration`) stay distinct
//! - an unknown dialect is rejected before any SQL is sent

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, DialectIdentity};
use crate::driver::{DbConnection, DriverError, Row, Rows};
use crate::dsn;
use crate::error::{Result, SchemataError};

pub mod clickhouse;
pub mod duckdb;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod snowflake;
pub mod sqlite;

/// One column of a table, normalised across dialects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalColumn {
    /// Column name as the catalog reports it
    pub name: String,

    /// Engine-native type name, not mapped across dialects
    #[serde(rename = "type")]
    pub data_type: String,

    pub nullable: bool,

    /// Default expression verbatim (quotes kept); absent when there is none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    pub is_primary_key: bool,
}

/// Describe the columns of `table`.
///
/// An unknown table yields an empty list unless the engine itself raises.
///
/// # Errors
/// `InvalidInput` for an empty table name, `UnsupportedDialect` for an
/// unknown dialect, `CatalogQuery`, `RowScan` or `RowIteration` from the
/// catalog round trip.
pub async fn describe_table(
    conn: &dyn DbConnection,
    table: &str,
    identity: &DialectIdentity,
) -> Result<Vec<CanonicalColumn>> {
    let dialect = known_dialect(identity)?;
    if table.trim().is_empty() {
        return Err(SchemataError::invalid_input("table name must not be empty"));
    }

    tracing::debug!(dialect = dialect.as_str(), table, "describing table");

    match dialect {
        Dialect::Sqlite => sqlite::describe(conn, table).await,
        Dialect::Postgres => postgres::describe(conn, table).await,
        Dialect::MySql => mysql::describe(conn, table).await,
        Dialect::SqlServer => mssql::describe(conn, table).await,
        Dialect::Oracle => oracle::describe(conn, table).await,
        Dialect::ClickHouse => clickhouse::describe(conn, table).await,
        Dialect::DuckDb => duckdb::describe(conn, table).await,
        Dialect::Snowflake => snowflake::describe(conn, table).await,
    }
}

/// List base tables in the connection's default schema
///
/// # Errors
/// `UnsupportedDialect` for an unknown dialect, otherwise catalog errors.
pub async fn list_tables(conn: &dyn DbConnection, identity: &DialectIdentity) -> Result<Vec<String>> {
    let dialect = known_dialect(identity)?;

    tracing::debug!(dialect = dialect.as_str(), "listing tables");

    let sql = match dialect {
        Dialect::Sqlite => sqlite::LIST_TABLES,
        Dialect::Postgres => postgres::LIST_TABLES,
        Dialect::MySql => mysql::LIST_TABLES,
        Dialect::SqlServer => mssql::LIST_TABLES,
        Dialect::Oracle => oracle::LIST_TABLES,
        Dialect::ClickHouse => clickhouse::LIST_TABLES,
        Dialect::DuckDb => duckdb::LIST_TABLES,
        Dialect::Snowflake => snowflake::LIST_TABLES,
    };

    let rows = run(conn, dialect, "table list", sql, &[]).await?;
    collect_rows(dialect, rows, |row| row.get_string(0))
}

/// [`describe_table`] for a raw connection string
///
/// # Errors
/// `ConnectionStringParse` if the DSN cannot be classified, then as
/// [`describe_table`].
pub async fn describe_table_for_dsn(
    conn: &dyn DbConnection,
    dsn: &str,
    table: &str,
) -> Result<Vec<CanonicalColumn>> {
    let parsed = dsn::classify(dsn)?;
    describe_table(conn, table, &DialectIdentity::from_driver_token(parsed.driver())).await
}

/// [`list_tables`] for a raw connection string
///
/// # Errors
/// `ConnectionStringParse` if the DSN cannot be classified, then as
/// [`list_tables`].
pub async fn list_tables_for_dsn(conn: &dyn DbConnection, dsn: &str) -> Result<Vec<String>> {
    let parsed = dsn::classify(dsn)?;
    list_tables(conn, &DialectIdentity::from_driver_token(parsed.driver())).await
}

fn known_dialect(identity: &DialectIdentity) -> Result<Dialect> {
    match identity {
        DialectIdentity::Known(d) => Ok(*d),
        DialectIdentity::Unknown(token) => Err(SchemataError::unsupported_dialect(token.clone())),
    }
}

/// Issue one catalog statement
pub(crate) async fn run(
    conn: &dyn DbConnection,
    dialect: Dialect,
    target: &str,
    sql: &str,
    params: &[&str],
) -> Result<Rows> {
    conn.query(sql, params)
        .await
        .map_err(|e| SchemataError::catalog_query(dialect, target, e))
}

/// Decode every row, then close the cursor and surface any deferred error
pub(crate) fn collect_rows<T>(
    dialect: Dialect,
    mut rows: Rows,
    decode: impl Fn(&Row) -> std::result::Result<T, DriverError>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows.by_ref() {
        out.push(decode(&row).map_err(|e| SchemataError::row_scan(dialect, e))?);
    }
    rows.finish().map_err(|e| SchemataError::row_iteration(dialect, e))?;
    Ok(out)
}

/// Describe via a single parameterless or parameterised catalog query
pub(crate) async fn describe_with(
    conn: &dyn DbConnection,
    dialect: Dialect,
    table: &str,
    sql: &str,
    params: &[&str],
    decode: impl Fn(&Row) -> std::result::Result<CanonicalColumn, DriverError>,
) -> Result<Vec<CanonicalColumn>> {
    let rows = run(conn, dialect, table, sql, params).await?;
    collect_rows(dialect, rows, decode)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::driver::{Row, SqlValue};

    /// Build a row from literal values for normaliser tests
    pub fn row(values: Vec<SqlValue>) -> Row {
        let columns: Arc<[String]> =
            (0..values.len()).map(|i| format!("c{i}")).collect::<Vec<_>>().into();
        Row::new(columns, values)
    }

    pub fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }
}
