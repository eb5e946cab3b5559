//! Snowflake catalog
//!
//! Snowflake stores unquoted identifiers upper-cased; the table name is
//! upper-cased here before it is bound. No driver ships with this build.

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const DESCRIBE: &str = "SELECT c.column_name, \
    c.data_type, \
    c.is_nullable = 'YES' AS nullable, \
    c.column_default, \
    CASE WHEN pk.column_name IS NOT NULL THEN TRUE ELSE FALSE END AS is_primary_key \
    FROM information_schema.columns c \
    LEFT JOIN ( \
        SELECT kcu.table_schema, kcu.table_name, kcu.column_name \
        FROM information_schema.table_constraints tc \
        JOIN information_schema.key_column_usage kcu \
            ON tc.constraint_name = kcu.constraint_name \
            AND tc.table_schema = kcu.table_schema \
        WHERE tc.constraint_type = 'PRIMARY KEY' \
        AND tc.table_name = ? \
    ) pk \
        ON c.table_schema = pk.table_schema \
        AND c.table_name = pk.table_name \
        AND c.column_name = pk.column_name \
    WHERE c.table_name = ? \
    ORDER BY c.ordinal_position";

pub(crate) const LIST_TABLES: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    let upper = table.to_uppercase();
    describe_with(conn, Dialect::Snowflake, table, DESCRIBE, &[upper.as_str(), upper.as_str()], column_from_row).await
}

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
    fn test_textual_booleans() {
        let r = row(vec![text("ID"), text("NUMBER"), text("false"), SqlValue::Null, text("true")]);
        let col = column_from_row(&r).unwrap();
        assert!(!col.nullable);
        assert!(col.is_primary_key);
    }
}
