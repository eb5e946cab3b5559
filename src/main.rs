//! Schemata CLI Entry Point
//!
//! Without a subcommand the binary runs the MCP server over stdio. The other
//! subcommands run one operation and print a single JSON envelope to stdout.
//! Logs go to stderr.
//!
//! Exit codes: 100 when no DSN is configured, 101 when the DSN cannot be
//! parsed, 102 when the database cannot be opened, 1 when a command fails.

use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use schemata::catalog::{self, sqlite};
use schemata::config::{self, ConfigLocation, ConnectionRegistry, StoredConnection, DSN_ENV_VAR};
use schemata::dialect::{Dialect, DialectIdentity};
use schemata::driver::{self, DbConnection};
use schemata::dsn::{self, Dsn};
use schemata::logging::{self, LogFormat};
use schemata::mcp::McpServer;
use schemata::output::{ErrorEnvelope, Metadata, SuccessEnvelope};
use schemata::SchemataError;

const EXIT_FAILURE: i32 = 1;
const EXIT_MISSING_DSN: i32 = 100;
const EXIT_INVALID_DSN: i32 = 101;
const EXIT_OPEN_FAILED: i32 = 102;

/// Schemata - database-agnostic schema introspection
#[derive(Parser)]
#[command(name = "schemata")]
#[command(about = "Database-agnostic schema introspection over MCP and the command line")]
#[command(version)]
struct Cli {
    /// Database connection string (falls back to the DB_DSN environment variable)
    #[arg(long, global = true)]
    dsn: Option<String>,

    /// Name of a saved connection
    #[arg(long, global = true)]
    connection: Option<String>,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdio (default)
    Serve,

    /// Print the database product named by the DSN
    DbType,

    /// List base tables in the default schema
    Tables,

    /// Describe the columns of a table
    Describe { table: String },

    /// Detailed SQLite schema: one table, or the whole database when omitted
    Schema { table: Option<String> },

    /// Validate the connection and optionally save it under a name
    Connect {
        #[arg(long, default_value = "default")]
        name: String,

        #[arg(long, value_enum)]
        save: Option<SaveLocation>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SaveLocation {
    Local,
    Global,
}

impl From<SaveLocation> for ConfigLocation {
    fn from(loc: SaveLocation) -> Self {
        match loc {
            SaveLocation::Local => Self::Local,
            SaveLocation::Global => Self::Global,
        }
    }
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Serve => "serve",
            Self::DbType => "db-type",
            Self::Tables => "tables",
            Self::Describe { .. } => "describe",
            Self::Schema { .. } => "schema",
            Self::Connect { .. } => "connect",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format);
    process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let command = cli.command.unwrap_or(Commands::Serve);
    let label = command.name();
    let is_serve = matches!(command, Commands::Serve);

    // Startup failures: envelopes for one-shot commands, stderr only for serve.
    let fail = |code: i32, err: &SchemataError| -> i32 {
        tracing::error!(code = err.error_code(), "{err}");
        if !is_serve {
            print_json(&ErrorEnvelope::from_error("", label, err));
        }
        code
    };

    let raw_dsn = match resolve_dsn(cli.dsn.as_deref(), cli.connection.as_deref()) {
        Ok(Some(dsn)) => dsn,
        Ok(None) => {
            let err = SchemataError::config_error(
                "DSN is required. Provide it using --dsn flag or DB_DSN environment variable.",
            );
            return fail(EXIT_MISSING_DSN, &err);
        }
        Err(e) => return fail(EXIT_MISSING_DSN, &e),
    };

    let parsed = match dsn::classify(&raw_dsn) {
        Ok(d) => d,
        Err(e) => return fail(EXIT_INVALID_DSN, &e),
    };
    let identity = DialectIdentity::from_driver_token(parsed.driver());

    if let Commands::DbType = command {
        let start = Instant::now();
        let name = dsn::database_type_name(parsed.driver());
        return print_success(identity.label(), label, name, Metadata::new(elapsed_ms(start)));
    }

    let conn = match driver::connect(&parsed).await {
        Ok(c) => c,
        Err(e) => return fail(EXIT_OPEN_FAILED, &e),
    };

    match command {
        Commands::Serve => serve(&raw_dsn, conn).await,
        Commands::Tables => {
            let start = Instant::now();
            match catalog::list_tables(conn.as_ref(), &identity).await {
                Ok(tables) => {
                    let meta = Metadata::with_rows(elapsed_ms(start), tables.len());
                    print_success(identity.label(), label, tables, meta)
                }
                Err(e) => print_error(identity.label(), label, &e),
            }
        }
        Commands::Describe { table } => {
            let start = Instant::now();
            match catalog::describe_table(conn.as_ref(), &table, &identity).await {
                Ok(columns) => {
                    let meta = Metadata::with_rows(elapsed_ms(start), columns.len());
                    print_success(identity.label(), label, columns, meta)
                }
                Err(e) => print_error(identity.label(), label, &e),
            }
        }
        Commands::Schema { table } => schema(conn.as_ref(), &identity, table.as_deref()).await,
        Commands::Connect { name, save } => connect(conn.as_ref(), &parsed, &identity, &raw_dsn, &name, save).await,
        // answered before connecting
        Commands::DbType => EXIT_FAILURE,
    }
}

fn resolve_dsn(flag: Option<&str>, name: Option<&str>) -> schemata::Result<Option<String>> {
    let env = std::env::var(DSN_ENV_VAR).ok();
    let has_direct = flag.is_some_and(|s| !s.is_empty()) || env.as_deref().is_some_and(|s| !s.is_empty());

    // Config files are only read when neither the flag nor the environment names a DSN.
    let registry = if has_direct { ConnectionRegistry::default() } else { config::load_with_precedence()? };

    let resolved = config::resolve_dsn_from(flag, env.as_deref(), name, &registry)?;
    if let Some((_, source)) = &resolved {
        tracing::debug!(?source, "resolved DSN");
    }
    Ok(resolved.map(|(dsn, _)| dsn))
}

#[allow(clippy::future_not_send)]
async fn serve(raw_dsn: &str, conn: Arc<dyn DbConnection>) -> i32 {
    let server = match McpServer::new(raw_dsn, conn).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{e}");
            return EXIT_INVALID_DSN;
        }
    };

    tracing::info!("MCP server listening on stdio");
    match server.serve().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("server error: {e}");
            EXIT_FAILURE
        }
    }
}

async fn schema(conn: &dyn DbConnection, identity: &DialectIdentity, table: Option<&str>) -> i32 {
    let label = identity.label();
    if identity.dialect() != Some(Dialect::Sqlite) {
        let err = SchemataError::invalid_input(format!(
            "detailed schema is only available for SQLite connections, not {label}"
        ));
        return print_error(label, "schema", &err);
    }

    let start = Instant::now();
    match table {
        Some(table) => match sqlite::table_schema(conn, table).await {
            Ok(schema) => print_success(label, "schema", schema, Metadata::new(elapsed_ms(start))),
            Err(e) => print_error(label, "schema", &e),
        },
        None => match sqlite::database_schema(conn).await {
            Ok(schema) => {
                let meta = Metadata::with_rows(elapsed_ms(start), schema.table_count);
                print_success(label, "schema", schema, meta)
            }
            Err(e) => print_error(label, "schema", &e),
        },
    }
}

#[derive(Serialize)]
struct ConnectReport {
    database_type: String,
    connection: String,
    table_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<String>,
}

async fn connect(
    conn: &dyn DbConnection,
    parsed: &Dsn,
    identity: &DialectIdentity,
    raw_dsn: &str,
    name: &str,
    save: Option<SaveLocation>,
) -> i32 {
    let start = Instant::now();
    let label = identity.label();

    let tables = match catalog::list_tables(conn, identity).await {
        Ok(t) => t,
        Err(e) => return print_error(label, "connect", &e),
    };

    let saved_to = match save {
        Some(loc) => match config::save_connection(name, StoredConnection::literal(raw_dsn), loc.into()) {
            Ok(path) => Some(path.display().to_string()),
            Err(e) => return print_error(label, "connect", &e),
        },
        None => None,
    };

    let report = ConnectReport {
        database_type: dsn::database_type_name(parsed.driver()),
        connection: parsed.redacted(),
        table_count: tables.len(),
        saved_to,
    };
    print_success(label, "connect", report, Metadata::new(elapsed_ms(start)))
}

fn print_success<T: Serialize>(dialect: &str, command: &str, data: T, meta: Metadata) -> i32 {
    print_json(&SuccessEnvelope::new(dialect, command, data, meta));
    0
}

fn print_error(dialect: &str, command: &str, err: &SchemataError) -> i32 {
    tracing::debug!(code = err.error_code(), "{err}");
    print_json(&ErrorEnvelope::from_error(dialect, command, err));
    EXIT_FAILURE
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
