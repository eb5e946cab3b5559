//! `MySQL` catalog

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const DESCRIBE: &str = "SELECT column_name, \
    data_type, \
    is_nullable = 'YES' AS nullable, \
    column_default, \
    column_key = 'PRI' AS is_primary_key \
    FROM information_schema.columns \
    WHERE table_name = ? \
    ORDER BY ordinal_position";

pub(crate) const LIST_TABLES: &str = "SELECT table_name FROM information_schema.tables \
    WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    describe_with(conn, Dialect::MySql, table, DESCRIBE, &[table], column_from_row).await
}

// Boolean expressions come back as 0/1 integers.
fn column_from_row(row: &Row) -> std::result::Result<CanonicalColumn, DriverError> {
    Ok(CanonicalColumn {
        name: row.get_string(0)?,
        data_type: row.get_string(1)?,
        nullable: row.get_bool(2)?,
        default: row.get_opt_string(3)?,
        is_primary_key: row.get_bool(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{row, text};
    use crate::driver::SqlValue;

    #[test]
    fn test_integer_flags() {
        let r = row(vec![text("id"), text("int"), SqlValue::Int(0), SqlValue::Null, SqlValue::Int(1)]);
        let col = column_from_row(&r).unwrap();
        assert!(!col.nullable);
        assert!(col.is_primary_key);
    }

    #[test]
    fn test_current_timestamp_default() {
        let r = row(vec![
            text("created_at"),
            text("timestamp"),
            SqlValue::Int(1),
            text("CURRENT_TIMESTAMP"),
            SqlValue::Int(0),
        ]);
        let col = column_from_row(&r).unwrap();
        assert_eq!(col.default.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert!(col.nullable);
    }
}
