//! Storage engine boundary.
//!
//! The assembler only needs three things from a store: open a connection,
//! read a named record set in full, close the connection. [`RecordSource`]
//! and [`SourceSession`] capture exactly that.
//!
//! - [`SqliteStore`] - SQLite file opened read-only (plus a write path for imports)
//! - [`MemoryStore`] - Record sets held in memory
//!
//! Sessions release their connection when dropped, so an early return with
//! `?` never leaks one. [`SourceSession::close`] exists so the success path
//! can report a failing close instead of swallowing it.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::{ConnectionError, ConnectionResult};
use crate::models::RawTable;

/// Something that can hand out connections to three named record sets.
pub trait RecordSource {
    /// Human-readable target, used in logs.
    fn describe(&self) -> String;

    /// Open a connection.
    fn open(&self) -> ConnectionResult<Box<dyn SourceSession + '_>>;
}

/// An open connection to a store.
pub trait SourceSession {
    /// Read every row of the named record set.
    fn read_table(&mut self, name: &str) -> ConnectionResult<RawTable>;

    /// Names of the record sets in the store.
    fn list_tables(&mut self) -> ConnectionResult<Vec<String>>;

    /// Release the connection.
    fn close(self: Box<Self>) -> ConnectionResult<()>;
}

/// Check that a record set name is a plain SQL identifier.
pub fn validate_table_name(name: &str) -> ConnectionResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ConnectionError::InvalidTableName(name.to_string()))
    }
}

/// Quote an identifier for SQL, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
