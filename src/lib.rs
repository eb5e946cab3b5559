//! Schemata - database-agnostic schema introspection
//!
//! Given an open connection and a table name, Schemata answers "what columns
//! does this table have?" in one canonical shape across eight SQL dialects:
//! `SQLite`, `PostgreSQL`, `MySQL`, SQL Server, Oracle, `ClickHouse`, `DuckDB`
//! and Snowflake. It also lists tables and forwards arbitrary statements.
//!
//! # Module Organization
//! - [`dialect`] - the closed set of dialects and driver-token classification
//! - [`dsn`] - connection-string parsing and product names
//! - [`driver`] - the [`driver::DbConnection`] seam and per-engine adapters
//! - [`catalog`] - per-dialect describers and table listers
//! - [`query`] - passthrough statement execution
//! - [`mcp`] - MCP server (manual JSON-RPC 2.0 over stdio)
//! - [`config`] - named connections and DSN resolution
//! - [`output`] - JSON envelopes for CLI output
//! - [`logging`] - stderr tracing setup
//! - [`error`] - error types and stable codes
//!
//! # Example
//! ```no_run
//! # async fn demo() -> schemata::Result<()> {
//! let dsn = schemata::dsn::classify("sqlite3://app.db")?;
//! let conn = schemata::driver::connect(&dsn).await?;
//! let columns =
//!     schemata::catalog::describe_table_for_dsn(conn.as_ref(), "sqlite3://app.db", "users").await?;
//! for col in &columns {
//!     println!("{} {} nullable={}", col.name, col.data_type, col.nullable);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod dialect;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod output;
pub mod query;

pub use catalog::{describe_table, describe_table_for_dsn, list_tables, list_tables_for_dsn, CanonicalColumn};
pub use config::{list_connections, resolve_connection, save_connection, ConfigLocation, ConnectionRegistry, StoredConnection};
pub use dialect::{Dialect, DialectIdentity};
pub use driver::{DbConnection, DriverError, Row, Rows, SqlValue};
pub use error::{Result, SchemataError};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use query::{create_table, read_query, write_query, ReadQueryResult, WriteQueryResult};
