//! Left joins over raw record sets.

use std::collections::HashMap;

use super::fields::{join_key, lookup};
use crate::models::{RawTable, Row};

/// Rows of a record set indexed by a key field.
///
/// When a key repeats, the first row wins and the key is listed in
/// [`LookupIndex::duplicates`].
#[derive(Debug)]
pub struct LookupIndex<'a> {
    rows: HashMap<String, &'a Row>,
    pub duplicates: Vec<String>,
}

impl<'a> LookupIndex<'a> {
    pub fn build(table: &'a RawTable, key_field: &str) -> Self {
        let mut rows = HashMap::with_capacity(table.len());
        let mut duplicates = Vec::new();

        for row in &table.rows {
            let Some(key) = row.get(key_field).and_then(join_key) else {
                continue;
            };
            if rows.contains_key(&key) {
                duplicates.push(key);
            } else {
                rows.insert(key, row);
            }
        }

        Self { rows, duplicates }
    }

    pub fn get(&self, key: &str) -> Option<&'a Row> {
        self.rows.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// For each left row, in order, the matching right row if any.
///
/// The result always has exactly one entry per left row.
pub fn left_join<'a>(
    left: &RawTable,
    left_keys: &[&str],
    right: &LookupIndex<'a>,
) -> Vec<Option<&'a Row>> {
    left.rows
        .iter()
        .map(|row| {
            lookup(row, left_keys)
                .and_then(join_key)
                .and_then(|key| right.get(&key))
        })
        .collect()
}
