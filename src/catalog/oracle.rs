//! Oracle catalog
//!
//! Oracle folds unquoted identifiers to upper case, so the bound table name is
//! upper-cased inside the key-constraint lookup. No driver ships with this
//! build; the catalog works against any [`DbConnection`] that speaks Oracle.

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const DESCRIBE: &str = "SELECT c.COLUMN_NAME, \
    c.DATA_TYPE, \
    CASE WHEN c.NULLABLE = 'Y' THEN 1 ELSE 0 END AS IS_NULLABLE, \
    c.DATA_DEFAULT, \
    CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 1 ELSE 0 END AS IS_PRIMARY_KEY \
    FROM ALL_TAB_COLUMNS c \
    LEFT JOIN ( \
        SELECT acc.OWNER, acc.TABLE_NAME, acc.COLUMN_NAME \
        FROM ALL_CONSTRAINTS ac \
        JOIN ALL_CONS_COLUMNS acc \
            ON ac.OWNER = acc.OWNER \
            AND ac.CONSTRAINT_NAME = acc.CONSTRAINT_NAME \
        WHERE ac.CONSTRAINT_TYPE = 'P' \
        AND ac.TABLE_NAME = UPPER(:1) \
    ) pk \
        ON c.OWNER = pk.OWNER \
        AND c.TABLE_NAME = pk.TABLE_NAME \
        AND c.COLUMN_NAME = pk.COLUMN_NAME \
    WHERE c.TABLE_NAME = UPPER(:2) \
    ORDER BY c.COLUMN_ID";

pub(crate) const LIST_TABLES: &str = "SELECT table_name FROM user_tables";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    describe_with(conn, Dialect::Oracle, table, DESCRIBE, &[table, table], column_from_row).await
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
