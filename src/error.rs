//! Errors
//!
//! One enum for the whole crate. Each variant has a stable code that ends up
//! in CLI envelopes and MCP error messages.
//!
//! # Categories
//! - `ConnectionStringParse`: the connection string could not be classified
//! - `UnsupportedDialect`: a driver token outside the eight supported dialects
//! - `CatalogQuery`: the catalog query itself was rejected by the engine
//! - `RowScan`: a catalog row could not be decoded into a canonical record
//! - `RowIteration`: the engine reported a failure after rows were consumed
//! - `ConnectionFailed`, `QueryFailed`, `InvalidInput`, `ConfigError`: surface errors

use thiserror::Error;

use crate::dialect::Dialect;

/// Main error type for Schemata operations
#[derive(Error, Debug)]
pub enum SchemataError {
    /// The connection string is malformed or names an unknown scheme
    #[error("failed to parse DSN: {0}")]
    ConnectionStringParse(String),

    /// The driver token is recognised but no introspection exists for it
    #[error("unsupported database driver: {token}")]
    UnsupportedDialect { token: String },

    /// The dialect catalog query failed to execute
    #[error("{dialect} catalog query for '{target}' failed: {detail}")]
    CatalogQuery { dialect: Dialect, target: String, detail: String },

    /// A catalog row could not be decoded
    #[error("failed to scan {dialect} catalog row: {detail}")]
    RowScan { dialect: Dialect, detail: String },

    /// The catalog cursor reported an error once iteration finished
    #[error("error iterating {dialect} catalog rows: {detail}")]
    RowIteration { dialect: Dialect, detail: String },

    /// Opening the connection failed, or no driver is built in
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Passthrough query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Caller-supplied value rejected before reaching the database
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unreadable or unwritable connection registry, or no DSN at all
    #[error("config error: {0}")]
    ConfigError(String),
}

impl SchemataError {
    /// Stable code for envelopes
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionStringParse(_) => "CONNECTION_STRING_PARSE",
            Self::UnsupportedDialect { .. } => "UNSUPPORTED_DIALECT",
            Self::CatalogQuery { .. } => "CATALOG_QUERY_FAILED",
            Self::RowScan { .. } => "ROW_SCAN_FAILED",
            Self::RowIteration { .. } => "ROW_ITERATION_FAILED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Get human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn connection_string_parse(message: impl Into<String>) -> Self {
        Self::ConnectionStringParse(message.into())
    }

    pub fn unsupported_dialect(token: impl Into<String>) -> Self {
        Self::UnsupportedDialect { token: token.into() }
    }

    pub fn catalog_query(
        dialect: Dialect,
        target: impl Into<String>,
        detail: impl ToString,
    ) -> Self {
        Self::CatalogQuery { dialect, target: target.into(), detail: detail.to_string() }
    }

    pub fn row_scan(dialect: Dialect, detail: impl ToString) -> Self {
        Self::RowScan { dialect, detail: detail.to_string() }
    }

    pub fn row_iteration(dialect: Dialect, detail: impl ToString) -> Self {
        Self::RowIteration { dialect, detail: detail.to_string() }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for Schemata operations
pub type Result<T> = std::result::Result<T, SchemataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_code() {
        assert_eq!(
            SchemataError::connection_string_parse("x").error_code(),
            "CONNECTION_STRING_PARSE"
        );
        assert_eq!(SchemataError::unsupported_dialect("adodb").error_code(), "UNSUPPORTED_DIALECT");
        assert_eq!(
            SchemataError::catalog_query(Dialect::Postgres, "users", "boom").error_code(),
            "CATALOG_QUERY_FAILED"
        );
        assert_eq!(SchemataError::row_scan(Dialect::MySql, "bad").error_code(), "ROW_SCAN_FAILED");
        assert_eq!(
            SchemataError::row_iteration(Dialect::Sqlite, "bad").error_code(),
            "ROW_ITERATION_FAILED"
        );
        assert_eq!(SchemataError::connection_failed("test").error_code(), "CONNECTION_FAILED");
        assert_eq!(SchemataError::query_failed("test").error_code(), "QUERY_FAILED");
        assert_eq!(SchemataError::invalid_input("test").error_code(), "INVALID_INPUT");
        assert_eq!(SchemataError::config_error("test").error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_messages_name_the_dialect() {
        let err = SchemataError::unsupported_dialect("adodb");
        assert!(err.message().contains("unsupported database driver"));
        assert!(err.message().contains("adodb"));

        let err = SchemataError::connection_string_parse("unknown scheme 'unsupported'");
        assert!(err.message().starts_with("failed to parse DSN"));

        let err = SchemataError::catalog_query(Dialect::Oracle, "EMP", "ORA-00942");
        assert!(err.message().contains("Oracle"));
        assert!(err.message().contains("EMP"));
        assert!(err.message().contains("ORA-00942"));
    }

    #[test]
    fn test_scan_and_iteration_are_distinct() {
        let scan = SchemataError::row_scan(Dialect::DuckDb, "x");
        let iter = SchemataError::row_iteration(Dialect::DuckDb, "x");
        assert_ne!(scan.error_code(), iter.error_code());
        assert!(matches!(scan, SchemataError::RowScan { .. }));
        assert!(matches!(iter, SchemataError::RowIteration { .. }));
    }
}
