//! `DuckDB` catalog
//!
//! `PRAGMA table_info` mirrors `SQLite`'s layout but with real boolean flags.

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const LIST_TABLES: &str = "SELECT table_name FROM information_schema.tables \
    WHERE table_schema = 'main' AND table_type = 'BASE TABLE'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    let sql = format!("PRAGMA table_info('{table}');");
    describe_with(conn, Dialect::DuckDb, table, &sql, &[], column_from_row).await
}

// cid | name | type | notnull | dflt_value | pk
fn column_from_row(row: &Row) -> std::result::Result<CanonicalColumn, DriverError> {
    Ok(CanonicalColumn {
        name: row.get_string(1)?,
        data_type: row.get_string(2)?,
        nullable: !row.get_bool(3)?,
        default: row.get_opt_string(4)?,
        is_primary_key: row.get_bool(5)?,
    })
}
