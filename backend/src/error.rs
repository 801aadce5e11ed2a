//! Error types for the bike sales assembly pipeline.
//!
//! This module defines one error type per concern:
//!
//! - [`ConnectionError`] - Store open/read/close failures (always fatal)
//! - [`RowError`] - Per-row data-quality failures (schema or parse)
//! - [`AssembleError`] - Outcome of an assembly run under a [`RowPolicy`](crate::transform::RowPolicy)
//! - [`ConfigError`] - Missing or malformed configuration values
//! - [`ImportError`] - Loading raw CSV tables into the store
//! - [`ExportError`] - Writing the assembled table out
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde::Serialize;
use thiserror::Error;

use crate::models::RowKey;
use crate::parser::CsvError;

// =============================================================================
// Connection Errors
// =============================================================================

/// Errors while talking to the storage engine.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The store could not be opened.
    #[error("Cannot open store '{target}': {source}")]
    Open {
        target: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A record set could not be read.
    #[error("Cannot read record set '{table}': {source}")]
    Read {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The named record set does not exist.
    #[error("Record set not found: {0}")]
    MissingTable(String),

    /// The record set name is not a plain identifier.
    #[error("Invalid record set name: '{0}'")]
    InvalidTableName(String),

    /// The store refused the connection.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Closing the connection failed.
    #[error("Cannot close store: {0}")]
    Close(#[source] rusqlite::Error),
}

// =============================================================================
// Row Errors
// =============================================================================

/// A data-quality failure on a single transaction row.
///
/// Both variants carry the [`RowKey`] of the offending transaction so the
/// caller can locate it and decide whether to skip it or abort.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowError {
    /// Expected field absent or of the wrong type.
    #[error("Schema error at {key}: field '{field}' {message}")]
    Schema {
        key: RowKey,
        field: String,
        message: String,
    },

    /// Field present but its text could not be interpreted.
    #[error("Parse error at {key}: field '{field}' (value '{value}') {message}")]
    Parse {
        key: RowKey,
        field: String,
        value: String,
        message: String,
    },
}

impl RowError {
    pub fn schema(key: &RowKey, field: impl Into<String>, message: impl Into<String>) -> Self {
        RowError::Schema {
            key: key.clone(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn parse(
        key: &RowKey,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RowError::Parse {
            key: key.clone(),
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Identity of the row that failed.
    pub fn key(&self) -> &RowKey {
        match self {
            RowError::Schema { key, .. } | RowError::Parse { key, .. } => key,
        }
    }

    /// Output or source field the failure is about.
    pub fn field(&self) -> &str {
        match self {
            RowError::Schema { field, .. } | RowError::Parse { field, .. } => field,
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, RowError::Schema { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, RowError::Parse { .. })
    }
}

// =============================================================================
// Assembly Errors (top-level)
// =============================================================================

/// Top-level error of an assembly run.
///
/// Returned by [`crate::transform::assemble_table`]. A [`RowError`] only
/// shows up here when the caller asked to abort on the first bad row.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The store could not be opened or read.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A row failed and the policy was to abort.
    #[error("Row error: {0}")]
    Row(#[from] RowError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing {0} environment variable")]
    MissingVar(String),

    /// A value could not be interpreted.
    #[error("Invalid value for '{name}': {message}")]
    InvalidValue { name: String, message: String },
}

// =============================================================================
// Import Errors
// =============================================================================

/// Errors while loading a raw CSV table into the store.
#[derive(Debug, Error)]
pub enum ImportError {
    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// The store could not be opened.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Writing the table failed.
    #[error("Cannot write record set '{table}': {source}")]
    Write {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Nothing to import.
    #[error("No columns to import")]
    EmptyInput,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the assembled table.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Assembly failed.
    #[error("Assembly error: {0}")]
    Assemble(#[from] AssembleError),

    /// The blocking assembly task did not complete.
    #[error("Assembly task failed: {0}")]
    Task(String),

    /// Listener or connection I/O failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for store operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Result type for a single row.
pub type RowResult<T> = Result<T, RowError>;

/// Result type for assembly runs.
pub type AssembleResult<T> = Result<T, AssembleError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for imports.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for exports.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
