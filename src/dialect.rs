//! Dialect identification
//!
//! Maps the driver token carried by a connection string onto one of the eight
//! SQL dialect families the catalog layer knows how to introspect. Tokens that
//! match none of them are kept verbatim in [`DialectIdentity::Unknown`] so the
//! caller can report exactly what was rejected.

use serde::{Deserialize, Serialize};

/// The closed set of dialect families with catalog support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `SQLite` (embedded file database)
    Sqlite,
    /// `PostgreSQL`
    Postgres,
    /// `MySQL` (includes `MariaDB`)
    MySql,
    /// Microsoft SQL Server
    SqlServer,
    /// Oracle Database
    Oracle,
    /// `ClickHouse` (columnar analytical)
    ClickHouse,
    /// `DuckDB` (embedded analytical)
    DuckDb,
    /// Snowflake (cloud warehouse)
    Snowflake,
}

impl Dialect {
    pub const ALL: [Self; 8] = [
        Self::Sqlite,
        Self::Postgres,
        Self::MySql,
        Self::SqlServer,
        Self::Oracle,
        Self::ClickHouse,
        Self::DuckDb,
        Self::Snowflake,
    ];

    /// Stable machine-readable identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::ClickHouse => "clickhouse",
            Self::DuckDb => "duckdb",
            Self::Snowflake => "snowflake",
        }
    }

    /// Product name as vendors spell it
    #[must_use]
    pub const fn product_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::SqlServer => "SQL Server",
            Self::Oracle => "Oracle",
            Self::ClickHouse => "ClickHouse",
            Self::DuckDb => "DuckDB",
            Self::Snowflake => "Snowflake",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.product_name())
    }
}

/// Result of classifying a driver token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialectIdentity {
    Known(Dialect),
    /// Raw token, exactly as supplied
    Unknown(String),
}

impl DialectIdentity {
    /// Classify a driver token, case-insensitively.
    ///
    /// Several driver implementations share a dialect (`pgx` speaks
    /// `PostgreSQL`, `godror` speaks Oracle). Anything not in the table is
    /// `Unknown`, never a guessed default.
    #[must_use]
    pub fn from_driver_token(token: &str) -> Self {
        let dialect = match token.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" | "moderncsqlite" => Dialect::Sqlite,
            "postgres" | "pgx" => Dialect::Postgres,
            "mysql" | "mymysql" => Dialect::MySql,
            "sqlserver" => Dialect::SqlServer,
            "oracle" | "godror" => Dialect::Oracle,
            "clickhouse" => Dialect::ClickHouse,
            "duckdb" => Dialect::DuckDb,
            "snowflake" => Dialect::Snowflake,
            _ => return Self::Unknown(token.to_string()),
        };
        Self::Known(dialect)
    }

    #[must_use]
    pub const fn dialect(&self) -> Option<Dialect> {
        match self {
            Self::Known(d) => Some(*d),
            Self::Unknown(_) => None,
        }
    }

    /// Label for envelopes and logs: the dialect id, or the raw token
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Known(d) => d.as_str(),
            Self::Unknown(token) => token,
        }
    }
}
