//! `ClickHouse` catalog
//!
//! `DESCRIBE TABLE` returns name, type, default kind, default expression,
//! comment, codec and TTL. Nullability is encoded in the type itself
//! (`Nullable(T)`) and `ClickHouse` has no primary-key constraint in the
//! relational sense, so `is_primary_key` is always false.

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const LIST_TABLES: &str = "SELECT name FROM system.tables \
    WHERE database = currentDatabase() AND engine NOT LIKE '%View'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    let sql = format!("DESCRIBE TABLE {table};");
    describe_with(conn, Dialect::ClickHouse, table, &sql, &[], column_from_row).await
}

// name | type | default_type | default_expression | comment | codec_expression | ttl_expression
fn column_from_row(row: &Row) -> std::result::Result<CanonicalColumn, DriverError> {
    if row.len() < 7 {
        return Err(DriverError::new(format!(
            "DESCRIBE TABLE returned {} columns, expected 7",
            row.len()
        )));
    }
    let data_type = row.get_string(1)?;
    Ok(CanonicalColumn {
        name: row.get_string(0)?,
        nullable: data_type.contains("Nullable("),
        data_type,
        default: row.get_opt_string(3)?.filter(|d| !d.is_empty()),
        is_primary_key: false,
    })
}
