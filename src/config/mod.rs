//! Configuration Management
//!
//! Named connection strings, so a DSN with credentials does not have to be
//! passed on every invocation.
//!
//! # Configuration Locations
//! - Local: `.schemata/config.json` (per project, overrides global)
//! - Global: `<config_dir>/schemata/connections.json` (per user)
//!
//! # DSN Resolution Precedence
//! 1. `--dsn` flag
//! 2. `DB_DSN` environment variable
//! 3. the connection named by `--connection`
//! 4. the registry's default connection
//!
//! Both files share one format:
//! ```json
//! {
//!   "connections": {
//!     "local": { "dsn": "sqlite3://app.db" },
//!     "prod": { "dsn_env": "PROD_DATABASE_URL" }
//!   },
//!   "default": "local"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemataError};

/// Environment variable consulted when `--dsn` is absent
pub const DSN_ENV_VAR: &str = "DB_DSN";

/// Connection registry stored in a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRegistry {
    /// Named connections
    #[serde(default)]
    pub connections: BTreeMap<String, StoredConnection>,

    /// Name of the default connection (must exist in `connections`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A stored connection: either a literal DSN or the name of an environment
/// variable holding one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn_env: Option<String>,
}

impl StoredConnection {
    #[must_use]
    pub fn literal(dsn: impl Into<String>) -> Self {
        Self { dsn: Some(dsn.into()), dsn_env: None }
    }

    #[must_use]
    pub fn from_env(var: impl Into<String>) -> Self {
        Self { dsn: None, dsn_env: Some(var.into()) }
    }

    /// Produce the DSN, reading the environment when the entry references it
    ///
    /// # Errors
    /// `ConfigError` when the variable is unset or the entry has neither field.
    pub fn resolve(&self) -> Result<String> {
        if let Some(var) = &self.dsn_env {
            return std::env::var(var).map_err(|_| {
                SchemataError::config_error(format!("Environment variable {var} not found for DSN"))
            });
        }
        self.dsn
            .clone()
            .ok_or_else(|| SchemataError::config_error("connection entry has neither dsn nor dsn_env"))
    }
}

/// Configuration file location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    Local,
    Global,
}

/// Where a resolved DSN came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsnSource {
    Flag,
    Environment,
    Named(String),
    Default(String),
}

/// Get path to local config file (`.schemata/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        SchemataError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".schemata").join("config.json"))
}

/// Get path to global config file (`<config_dir>/schemata/connections.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SchemataError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("schemata").join("connections.json"))
}

/// Load a registry; a missing file is an empty registry
pub fn load_registry(path: &Path) -> Result<ConnectionRegistry> {
    if !path.exists() {
        return Ok(ConnectionRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| SchemataError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents).map_err(|e| {
        SchemataError::config_error(format!("Invalid config file format in {}: {e}", path.display()))
    })
}

/// Save a registry, creating parent directories as needed
pub fn save_registry(path: &Path, registry: &ConnectionRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SchemataError::config_error(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| SchemataError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| SchemataError::config_error(format!("Could not write config file: {e}")))
}

/// Overlay `local` on `global`: local entries replace global ones with the
/// same name, and a local default wins
#[must_use]
pub fn merge(global: ConnectionRegistry, local: ConnectionRegistry) -> ConnectionRegistry {
    let mut merged = global;
    merged.connections.extend(local.connections);
    if local.default.is_some() {
        merged.default = local.default;
    }
    merged
}

/// Load both config files, local taking precedence
pub fn load_with_precedence() -> Result<ConnectionRegistry> {
    let global = load_registry(&global_config_path()?)?;
    let local = load_registry(&local_config_path()?)?;
    Ok(merge(global, local))
}

/// Look up `name`, or the default connection when `name` is `None`
pub fn resolve_in(registry: &ConnectionRegistry, name: Option<&str>) -> Result<(String, String)> {
    let conn_name = match name {
        Some(n) => n.to_string(),
        None => registry.default.clone().ok_or_else(|| {
            let available: Vec<_> = registry.connections.keys().collect();
            SchemataError::config_error(format!(
                "No default connection set. Available connections: {available:?}"
            ))
        })?,
    };

    let stored = registry.connections.get(&conn_name).ok_or_else(|| {
        let available: Vec<_> = registry.connections.keys().collect();
        SchemataError::config_error(format!(
            "Connection '{conn_name}' not found. Available connections: {available:?}"
        ))
    })?;

    Ok((conn_name, stored.resolve()?))
}

/// Resolve a named (or the default) connection from the merged config files
pub fn resolve_connection(name: Option<&str>) -> Result<String> {
    let registry = load_with_precedence()?;
    resolve_in(&registry, name).map(|(_, dsn)| dsn)
}

/// Apply the full precedence chain. `flag` and `env` are taken as given so
/// the caller controls where they come from. Returns `Ok(None)` when nothing
/// names a DSN at all.
pub fn resolve_dsn_from(
    flag: Option<&str>,
    env: Option<&str>,
    name: Option<&str>,
    registry: &ConnectionRegistry,
) -> Result<Option<(String, DsnSource)>> {
    if let Some(dsn) = flag.filter(|s| !s.is_empty()) {
        return Ok(Some((dsn.to_string(), DsnSource::Flag)));
    }
    if let Some(dsn) = env.filter(|s| !s.is_empty()) {
        return Ok(Some((dsn.to_string(), DsnSource::Environment)));
    }
    if let Some(name) = name {
        let (name, dsn) = resolve_in(registry, Some(name))?;
        return Ok(Some((dsn, DsnSource::Named(name))));
    }
    if registry.default.is_some() {
        let (name, dsn) = resolve_in(registry, None)?;
        return Ok(Some((dsn, DsnSource::Default(name))));
    }
    Ok(None)
}

/// Save a connection. The first connection in a file becomes its default.
pub fn save_connection(name: &str, conn: StoredConnection, location: ConfigLocation) -> Result<PathBuf> {
    if name.trim().is_empty() {
        return Err(SchemataError::invalid_input("connection name must not be empty"));
    }

    let config_path = match location {
        ConfigLocation::Local => local_config_path()?,
        ConfigLocation::Global => global_config_path()?,
    };

    let mut registry = load_registry(&config_path)?;
    insert_connection(&mut registry, name, conn);
    save_registry(&config_path, &registry)?;

    tracing::info!(name, path = %config_path.display(), "saved connection");
    Ok(config_path)
}

fn insert_connection(registry: &mut ConnectionRegistry, name: &str, conn: StoredConnection) {
    let is_first_connection = registry.connections.is_empty();
    registry.connections.insert(name.to_string(), conn);
    if is_first_connection {
        registry.default = Some(name.to_string());
    }
}

/// List connection names from the merged view with their resolved DSNs
///
/// Entries whose environment variable is missing are skipped with a warning.
pub fn list_connections() -> Result<Vec<(String, String)>> {
    let registry = load_with_precedence()?;

    let mut out = Vec::new();
    for (name, stored) in &registry.connections {
        match stored.resolve() {
            Ok(dsn) => out.push((name.clone(), dsn)),
            // Error details not logged; they may name credentials.
            Err(_) => tracing::warn!(connection = %name, "could not resolve connection"),
        }
    }
    Ok(out)
}
