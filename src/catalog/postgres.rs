//! `PostgreSQL` catalog
//!
//! Columns come from `information_schema.columns`; key membership from the
//! table's `indisprimary` index in `pg_index`. The table name is bound twice:
//! once as text for the information-schema filter and once as a `regclass`
//! for the index lookup.

use super::{describe_with, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::Result;

pub(crate) const DESCRIBE: &str = "SELECT column_name::text AS name, \
    data_type::text AS type, \
    is_nullable = 'YES' AS nullable, \
    column_default::text AS default_value, \
    CASE WHEN column_name IN ( \
        SELECT a.attname \
        FROM pg_index i \
        JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
        WHERE i.indrelid = $2::text::regclass AND i.indisprimary \
    ) THEN true ELSE false END AS is_primary_key \
    FROM information_schema.columns \
    WHERE table_name = $1::text \
    ORDER BY ordinal_position";

pub(crate) const LIST_TABLES: &str = "SELECT table_name::text FROM information_schema.tables \
    WHERE table_schema = 'public' AND table_type = 'BASE TABLE'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    describe_with(conn, Dialect::Postgres, table, DESCRIBE, &[table, table], column_from_row).await
}

// name | type | nullable | default_value | is_primary_key
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
    fn test_serial_key_column() {
        let r = row(vec![
            text("id"),
            text("integer"),
            SqlValue::Bool(false),
            text("nextval('users_id_seq'::regclass)"),
            SqlValue::Bool(true),
        ]);
        let col = column_from_row(&r).unwrap();
        assert_eq!(col.name, "id");
        assert!(!col.nullable);
        assert!(col.is_primary_key);
        assert_eq!(col.default.as_deref(), Some("nextval('users_id_seq'::regclass)"));
    }

    #[test]
    fn test_nullable_without_default() {
        let r = row(vec![text("bio"), text("text"), SqlValue::Bool(true), SqlValue::Null, SqlValue::Bool(false)]);
        let col = column_from_row(&r).unwrap();
        assert!(col.nullable);
        assert_eq!(col.default, None);
    }

    #[test]
    fn test_query_binds_name_and_regclass() {
        assert!(DESCRIBE.contains("$1"));
        assert!(DESCRIBE.contains("$2::text::regclass"));
        assert!(DESCRIBE.contains("ORDER BY ordinal_position"));
    }
}
