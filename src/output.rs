//! CLI envelopes
//!
//! Every CLI command prints exactly one envelope to stdout.
//!
//! # Shape
//! - Success: `{"ok": true, "dialect": "...", "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "dialect": "...", "command": "...", "error": {"code": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::error::SchemataError;

/// Printed when a command succeeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// `true`
    pub ok: bool,

    /// Dialect the command ran against (`sqlite`, `postgres`, ...)
    pub dialect: String,

    /// Command that was executed (`describe`, `tables`, ...)
    pub command: String,

    pub data: T,

    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(dialect: impl Into<String>, command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, dialect: dialect.into(), command: command.into(), data, meta }
    }
}

/// Printed when a command fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// `false`
    pub ok: bool,

    /// Dialect, or empty when the failure happened before one was known
    pub dialect: String,

    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(dialect: impl Into<String>, command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, dialect: dialect.into(), command: command.into(), error }
    }

    /// Create error envelope from a [`SchemataError`]
    pub fn from_error(dialect: impl Into<String>, command: impl Into<String>, err: &SchemataError) -> Self {
        Self::new(dialect, command, ErrorInfo::new(err.error_code(), err.message()))
    }
}

/// Code and message of a failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g. `UNSUPPORTED_DIALECT`, `ROW_SCAN_FAILED`)
    pub code: String,

    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Timing and row count for a successful command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub execution_ms: u64,

    /// Rows produced by the command, when it produces any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows_returned: None }
    }

    #[must_use]
    pub const fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self { execution_ms, rows_returned: Some(rows_returned) }
    }
}
