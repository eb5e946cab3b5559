//! `SQLite` catalog
//!
//! Column metadata comes from `PRAGMA table_info`, which cannot take bound
//! parameters; the table name is interpolated as a trusted identifier.
//!
//! Besides the canonical describer this module keeps two richer `SQLite`-only
//! views: the raw pragma rows ([`describe_table_raw`]) and a full table schema
//! with indexes and constraints ([`table_schema`], [`database_schema`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{collect_rows, describe_with, run, CanonicalColumn};
use crate::dialect::Dialect;
use crate::driver::{DbConnection, DriverError, Row};
use crate::error::{Result, SchemataError};

pub(crate) const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";

pub(crate) async fn describe(conn: &dyn DbConnection, table: &str) -> Result<Vec<CanonicalColumn>> {
    let sql = format!("PRAGMA table_info({table});");
    describe_with(conn, Dialect::Sqlite, table, &sql, &[], column_from_row).await
}

// cid | name | type | notnull | dflt_value | pk
fn column_from_row(row: &Row) -> std::result::Result<CanonicalColumn, DriverError> {
    Ok(CanonicalColumn {
        name: row.get_string(1)?,
        data_type: row.get_string(2)?,
        nullable: row.get_i64(3)? == 0,
        default: row.get_opt_string(4)?,
        // pk is the column's 1-based position in the key, 0 when not a key column
        is_primary_key: row.get_i64(5)? > 0,
    })
}

/// One `PRAGMA table_info` row as the engine reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PragmaColumn {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub notnull: i64,
    /// Empty string when the column has no default
    pub default: String,
    pub primary_key: i64,
}

/// Raw `PRAGMA table_info` rows, without normalisation
///
/// # Errors
/// Catalog errors as for the canonical describer.
pub async fn describe_table_raw(conn: &dyn DbConnection, table: &str) -> Result<Vec<PragmaColumn>> {
    let sql = format!("PRAGMA table_info({table});");
    let rows = run(conn, Dialect::Sqlite, table, &sql, &[]).await?;
    collect_rows(Dialect::Sqlite, rows, |row| {
        Ok(PragmaColumn {
            cid: row.get_i64(0)?,
            name: row.get_string(1)?,
            data_type: row.get_string(2)?,
            notnull: row.get_i64(3)?,
            default: row.get_opt_string(4)?.unwrap_or_default(),
            primary_key: row.get_i64(5)?,
        })
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDetail {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDetail {
    pub name: String,
    /// `PRIMARY KEY`, `UNIQUE` or `FOREIGN KEY`
    #[serde(rename = "type")]
    pub kind: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatistics {
    pub row_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDetail>,
    pub indexes: Vec<IndexDetail>,
    pub constraints: Vec<ConstraintDetail>,
    pub statistics: TableStatistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub version: String,
    pub size_bytes: i64,
    pub table_count: usize,
    pub tables: Vec<TableSchema>,
}

/// Full schema of one table: columns, indexes, constraints and row count
///
/// # Errors
/// `InvalidInput` when the table does not exist, otherwise catalog errors.
pub async fn table_schema(conn: &dyn DbConnection, table: &str) -> Result<TableSchema> {
    let rows = run(
        conn,
        Dialect::Sqlite,
        table,
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        &[table],
    )
    .await?;
    let exists = collect_rows(Dialect::Sqlite, rows, |r| r.get_i64(0))?;
    if exists.first().copied().unwrap_or(0) == 0 {
        return Err(SchemataError::invalid_input(format!("table {table} does not exist")));
    }

    let pragma = describe_table_raw(conn, table).await?;

    let mut key: Vec<(i64, String)> = pragma
        .iter()
        .filter(|c| c.primary_key > 0)
        .map(|c| (c.primary_key, c.name.clone()))
        .collect();
    key.sort();

    let columns = pragma
        .into_iter()
        .map(|c| ColumnDetail {
            name: c.name,
            data_type: c.data_type,
            nullable: c.notnull == 0,
            default: Some(c.default).filter(|d| !d.is_empty()),
        })
        .collect();

    let indexes = indexes(conn, table).await?;

    let mut constraints = Vec::new();
    if !key.is_empty() {
        constraints.push(ConstraintDetail {
            name: format!("pk_{table}"),
            kind: "PRIMARY KEY".to_string(),
            columns: key.into_iter().map(|(_, name)| name).collect(),
            references: None,
        });
    }
    constraints.extend(indexes.iter().filter(|i| i.unique && !i.primary).map(|i| ConstraintDetail {
        name: i.name.clone(),
        kind: "UNIQUE".to_string(),
        columns: i.columns.clone(),
        references: None,
    }));
    constraints.extend(foreign_keys(conn, table).await?);

    let count_sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
    let rows = run(conn, Dialect::Sqlite, table, &count_sql, &[]).await?;
    let row_count = collect_rows(Dialect::Sqlite, rows, |r| r.get_i64(0))?
        .first()
        .copied()
        .unwrap_or(0);

    Ok(TableSchema {
        name: table.to_string(),
        columns,
        indexes,
        constraints,
        statistics: TableStatistics { row_count },
    })
}

/// Every table's schema plus engine version and file size
///
/// # Errors
/// The first failure from listing or describing a table.
pub async fn database_schema(conn: &dyn DbConnection) -> Result<DatabaseSchema> {
    let rows = run(conn, Dialect::Sqlite, "table list", LIST_TABLES, &[]).await?;
    let names = collect_rows(Dialect::Sqlite, rows, |r| r.get_string(0))?;

    let mut tables = Vec::with_capacity(names.len());
    for name in &names {
        tables.push(table_schema(conn, name).await?);
    }

    let rows = run(
        conn,
        Dialect::Sqlite,
        "database",
        "SELECT sqlite_version(), (SELECT page_count FROM pragma_page_count()) * (SELECT page_size FROM pragma_page_size())",
        &[],
    )
    .await?;
    let info = collect_rows(Dialect::Sqlite, rows, |r| Ok((r.get_string(0)?, r.get_i64(1)?)))?;
    let (version, size_bytes) = info.into_iter().next().unwrap_or_default();

    Ok(DatabaseSchema { version, size_bytes, table_count: tables.len(), tables })
}

async fn indexes(conn: &dyn DbConnection, table: &str) -> Result<Vec<IndexDetail>> {
    // seq | name | unique | origin | partial
    let rows = run(conn, Dialect::Sqlite, table, &format!("PRAGMA index_list({table})"), &[]).await?;
    let list = collect_rows(Dialect::Sqlite, rows, |r| {
        Ok((r.get_string(1)?, r.get_i64(2)? != 0, r.get_string(3)?))
    })?;

    let mut out = Vec::with_capacity(list.len());
    for (name, unique, origin) in list {
        // seqno | cid | name
        let quoted = format!("PRAGMA index_info(\"{}\")", name.replace('"', "\"\""));
        let rows = run(conn, Dialect::Sqlite, &name, &quoted, &[]).await?;
        let columns =
            collect_rows(Dialect::Sqlite, rows, |r| Ok(r.get_opt_string(2)?.unwrap_or_default()))?;
        out.push(IndexDetail { name, columns, unique, primary: origin == "pk" });
    }
    Ok(out)
}

async fn foreign_keys(conn: &dyn DbConnection, table: &str) -> Result<Vec<ConstraintDetail>> {
    // id | seq | table | from | to | on_update | on_delete | match
    let rows =
        run(conn, Dialect::Sqlite, table, &format!("PRAGMA foreign_key_list({table})"), &[]).await?;
    let entries = collect_rows(Dialect::Sqlite, rows, |r| {
        Ok((r.get_i64(0)?, r.get_string(2)?, r.get_string(3)?, r.get_opt_string(4)?))
    })?;

    // Composite keys arrive as several rows sharing an id.
    let mut grouped: BTreeMap<i64, (String, Vec<String>, Vec<String>)> = BTreeMap::new();
    for (id, target, from, to) in entries {
        let entry = grouped.entry(id).or_insert_with(|| (target, Vec::new(), Vec::new()));
        entry.1.push(from);
        if let Some(to) = to {
            entry.2.push(to);
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(id, (target, from, to))| ConstraintDetail {
            name: format!("fk_{table}_{id}"),
            kind: "FOREIGN KEY".to_string(),
            columns: from,
            references: Some(if to.is_empty() { target } else { format!("{target}({})", to.join(", ")) }),
        })
        .collect())
}
