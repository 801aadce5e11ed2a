//! In-memory record sets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{validate_table_name, RecordSource, SourceSession};
use crate::error::{ConnectionError, ConnectionResult};
use crate::models::RawTable;

/// A store whose record sets live in memory.
///
/// Tracks how many sessions were opened and how many are still open.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, RawTable>,
    opened: Arc<AtomicUsize>,
    open_now: Arc<AtomicUsize>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record set, keyed by its name.
    pub fn with_table(mut self, table: RawTable) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&mut self, table: RawTable) {
        self.tables.insert(table.name.clone(), table);
    }

    /// A store that refuses every connection.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions not yet released.
    pub fn sessions_open(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }
}

impl RecordSource for MemoryStore {
    fn describe(&self) -> String {
        format!("memory ({} record sets)", self.tables.len())
    }

    fn open(&self) -> ConnectionResult<Box<dyn SourceSession + '_>> {
        if self.unavailable {
            return Err(ConnectionError::Unavailable(self.describe()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open_now.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            tables: &self.tables,
            open_now: Arc::clone(&self.open_now),
        }))
    }
}

struct MemorySession<'a> {
    tables: &'a HashMap<String, RawTable>,
    open_now: Arc<AtomicUsize>,
}

impl SourceSession for MemorySession<'_> {
    fn read_table(&mut self, name: &str) -> ConnectionResult<RawTable> {
        validate_table_name(name)?;
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectionError::MissingTable(name.to_string()))
    }

    fn list_tables(&mut self) -> ConnectionResult<Vec<String>> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn close(self: Box<Self>) -> ConnectionResult<()> {
        Ok(())
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}
