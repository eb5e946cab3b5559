//! SQL Server catalog
//!
//! Key membership comes from a left join against the table's `PRIMARY KEY`
//! constraint columns; the flags are projected as 1/0.

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const DESCRIBE: &str = "SELECT c.COLUMN_NAME, \
    c.DATA_TYPE, \
    CASE WHEN c.IS_NULLABLE = 'YES' THEN 1 ELSE 0 END AS IS_NULLABLE, \
    c.COLUMN_DEFAULT, \
    CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 1 ELSE 0 END AS IS_PRIMARY_KEY \
    FROM INFORMATION_SCHEMA.COLUMNS c \
    LEFT JOIN ( \
        SELECT ku.TABLE_CATALOG, ku.TABLE_SCHEMA, ku.TABLE_NAME, ku.COLUMN_NAME \
        FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS AS tc \
        INNER JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE AS ku \
            ON tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
            AND tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME \
        WHERE ku.TABLE_NAME = @P1 \
    ) pk \
        ON c.TABLE_CATALOG = pk.TABLE_CATALOG \
        AND c.TABLE_SCHEMA = pk.TABLE_SCHEMA \
        AND c.TABLE_NAME = pk.TABLE_NAME \
        AND c.COLUMN_NAME = pk.COLUMN_NAME \
    WHERE c.TABLE_NAME = @P2 \
    ORDER BY c.ORDINAL_POSITION";

pub(crate) const LIST_TABLES: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    describe_with(conn, Dialect::SqlServer, table, DESCRIBE, &[table, table], column_from_row).await
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
    fn test_identity_key() {
        let r = row(vec![text("OrderID"), text("int"), SqlValue::Int(0), SqlValue::Null, SqlValue::Int(1)]);
        let col = column_from_row(&r).unwrap();
        assert_eq!(col.name, "OrderID");
        assert!(!col.nullable);
        assert!(col.is_primary_key);
    }

    #[test]
    fn test_parenthesised_default_kept_verbatim() {
        let r = row(vec![text("Status"), text("nvarchar"), SqlValue::Int(1), text("('new')"), SqlValue::Int(0)]);
        assert_eq!(column_from_row(&r).unwrap().default.as_deref(), Some("('new')"));
    }
}
