//! # Bikesales - assembling the bike sales order-line table
//!
//! Bikesales reads three normalized record sets (products, shops, order
//! lines) from a SQLite store and joins them into one flat, typed table that
//! downstream analysis can consume directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ SQLite store│────▶│ 3 raw record│────▶│  Join, parse│────▶│ 13-column   │
//! │ (read-only) │     │    sets     │     │  and split  │     │   table     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bikesales::{assemble_table, AssemblerConfig, RowPolicy, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::new(StoreConfig::from_connection_string("sqlite:///data/bikes.db")?);
//! let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::SkipAndLog)?;
//! println!("Assembled {} order lines", table.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Raw record sets and the assembled record
//! - [`config`] - Store location and record set names
//! - [`store`] - Storage engine boundary (SQLite, in-memory)
//! - [`parser`] - CSV parsing with auto-detection, for imports
//! - [`transform`] - Joins, date parsing, splitting, revenue
//! - [`export`] - CSV and JSON output
//! - [`validation`] - Assembled record schema
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Storage
pub mod store;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod export;
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AssembleError,
    ConfigError,
    ConnectionError,
    ExportError,
    ImportError,
    RowError,
    ServerError,
};

// =============================================================================
// Re-exports - Models and configuration
// =============================================================================

pub use config::{AssemblerConfig, StoreConfig, TableNames};
pub use models::{AssembledRecord, AssembledTable, RawTable, Row, RowKey, OUTPUT_COLUMNS};

// =============================================================================
// Re-exports - Stores
// =============================================================================

pub use store::{MemoryStore, RecordSource, SourceSession, SqliteStore};

// =============================================================================
// Re-exports - Assembly
// =============================================================================

pub use transform::{
    assemble,
    assemble_table,
    normalize_field_name,
    Assembly,
    DataAssembler,
    RowPolicy,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    parse_bytes_auto,
    parse_csv_file_auto,
    detect_encoding,
    detect_delimiter,
    decode_content,
    CsvError,
    ParseResult,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use export::{save_table, write_table, OutputFormat};
pub use validation::{
    is_valid_assembled_record,
    validate_assembled_record,
    validate_records,
    validate_table,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{AssembleResponse, ResponseMetadata, error_response};

// Server
pub mod server {
    pub use crate::api::server::{start_server, AppState};
}
