//! Configuration for the store and the assembler.
//!
//! Nothing here falls back to the current working directory: the database
//! location must be given explicitly, either as a value or through
//! `BIKESALES_DATABASE`.
//!
//! | Variable                        | Meaning                              |
//! |---------------------------------|--------------------------------------|
//! | `BIKESALES_DATABASE`            | SQLite path or `sqlite:///` URL      |
//! | `BIKESALES_BUSY_TIMEOUT_MS`     | Busy timeout for the connection      |
//! | `BIKESALES_TABLE_PRODUCTS`      | Products record set (`bikes`)        |
//! | `BIKESALES_TABLE_SHOPS`         | Shops record set (`bikeshops`)       |
//! | `BIKESALES_TABLE_TRANSACTIONS`  | Transactions record set (`orderlines`) |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

pub const DATABASE_VAR: &str = "BIKESALES_DATABASE";
pub const BUSY_TIMEOUT_VAR: &str = "BIKESALES_BUSY_TIMEOUT_MS";
pub const TABLE_PRODUCTS_VAR: &str = "BIKESALES_TABLE_PRODUCTS";
pub const TABLE_SHOPS_VAR: &str = "BIKESALES_TABLE_SHOPS";
pub const TABLE_TRANSACTIONS_VAR: &str = "BIKESALES_TABLE_TRANSACTIONS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the store lives and how to connect to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub database: PathBuf,
    /// Busy timeout in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl StoreConfig {
    /// Build from a plain path or a `sqlite:///` connection string.
    pub fn from_connection_string(conn: &str) -> ConfigResult<Self> {
        Ok(Self {
            database: parse_connection_string(conn)?,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        })
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            database: path.as_ref().to_path_buf(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Read `BIKESALES_DATABASE` and `BIKESALES_BUSY_TIMEOUT_MS`.
    pub fn from_env() -> ConfigResult<Self> {
        let conn = env::var(DATABASE_VAR)
            .map_err(|_| ConfigError::MissingVar(DATABASE_VAR.to_string()))?;
        let mut config = Self::from_connection_string(&conn)?;
        if let Ok(raw) = env::var(BUSY_TIMEOUT_VAR) {
            config.busy_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: BUSY_TIMEOUT_VAR.to_string(),
                message: format!("'{}' is not a number of milliseconds", raw),
            })?;
        }
        Ok(config)
    }
}

/// Strip a `sqlite:` URL prefix down to a filesystem path.
///
/// URLs follow the SQLAlchemy form: `sqlite:///relative.db` is relative to
/// the working directory and `sqlite:////abs/path.db` is absolute. A host
/// part (`sqlite://host/...`) is rejected, as are in-memory URLs since every
/// connection would see an empty store. Anything without the `sqlite:`
/// prefix is taken as a plain path.
pub fn parse_connection_string(conn: &str) -> ConfigResult<PathBuf> {
    let conn = conn.trim();
    let invalid = |message: &str| ConfigError::InvalidValue {
        name: "database".to_string(),
        message: message.to_string(),
    };

    if conn.is_empty() {
        return Err(invalid("connection string is empty"));
    }

    let path = match conn.strip_prefix("sqlite:") {
        None => conn,
        Some(rest) => {
            let rest = rest
                .strip_prefix("//")
                .ok_or_else(|| invalid("expected sqlite:///<path>"))?;
            let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
            if !host.is_empty() {
                return Err(invalid(
                    "sqlite URLs take no host; use sqlite:///relative.db or sqlite:////absolute.db",
                ));
            }
            if path.is_empty() || path == ":memory:" {
                return Err(invalid("in-memory databases cannot be read across connections"));
            }
            path
        }
    };

    Ok(PathBuf::from(path))
}

/// Names of the three record sets in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    pub products: String,
    pub shops: String,
    pub transactions: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            products: "bikes".to_string(),
            shops: "bikeshops".to_string(),
            transactions: "orderlines".to_string(),
        }
    }
}

/// Options for an assembly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Record set names
    pub tables: TableNames,
    /// Positional index column added by table writers; dropped before joining
    pub index_column: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            tables: TableNames::default(),
            index_column: "index".to_string(),
        }
    }
}

impl AssemblerConfig {
    /// Defaults, with table names overridden from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = env::var(TABLE_PRODUCTS_VAR) {
            config.tables.products = name;
        }
        if let Ok(name) = env::var(TABLE_SHOPS_VAR) {
            config.tables.shops = name;
        }
        if let Ok(name) = env::var(TABLE_TRANSACTIONS_VAR) {
            config.tables.transactions = name;
        }
        config
    }
}
