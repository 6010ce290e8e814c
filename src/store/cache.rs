//! Cache store implementation
//!
//! Table name -> table map plus the registered defaults.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Key, Table, TableDefault, Value};
use crate::error::{CacheError, Result};

/// All tables of one server plus their default content
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Materialized tables, never empty
    tables: HashMap<String, Table>,

    /// Defaults by table name, applied on reset only
    defaults: BTreeMap<String, TableDefault>,
}

impl CacheStore {
    /// Create an empty store with no defaults
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Single-key Operations
    // =========================================================================

    /// Look up a key
    ///
    /// Outer `None`: table or key absent. `Some(None)`: key holds an absent value.
    pub fn get(&self, table: &str, key: &[u8]) -> Option<Value> {
        self.tables.get(table).and_then(|t| t.get(key)).cloned()
    }

    /// Insert or overwrite a key, creating the table if needed
    pub fn set(&mut self, table: &str, key: Key, value: Value) {
        self.tables.entry(table.to_string()).or_default().insert(key, value);
    }

    /// Remove a key, returning 1 if it was present
    pub fn delete(&mut self, table: &str, key: &[u8]) -> u64 {
        let Some(content) = self.tables.get_mut(table) else {
            return 0;
        };
        let removed = u64::from(content.remove(key).is_some());
        if content.is_empty() {
            self.tables.remove(table);
        }
        removed
    }

    // =========================================================================
    // Whole-table and Batch Operations
    // =========================================================================

    /// Snapshot of a table (empty if absent)
    pub fn query(&self, table: &str) -> Table {
        self.tables.get(table).cloned().unwrap_or_default()
    }

    /// Look up many keys; every requested key appears in the result
    pub fn get_batch(&self, table: &str, keys: &[Key]) -> BTreeMap<Key, Option<Value>> {
        let content = self.tables.get(table);
        keys.iter()
            .map(|key| (key.clone(), content.and_then(|t| t.get(key)).cloned()))
            .collect()
    }

    /// Merge entries into a table, overwriting existing keys
    pub fn set_batch(&mut self, table: &str, entries: Table) {
        if entries.is_empty() {
            return;
        }
        match self.tables.get_mut(table) {
            Some(content) => content.extend(entries),
            None => {
                self.tables.insert(table.to_string(), entries);
            }
        }
    }

    /// Remove many keys, returning how many were present
    pub fn delete_batch(&mut self, table: &str, keys: &[Key]) -> u64 {
        let Some(content) = self.tables.get_mut(table) else {
            return 0;
        };
        let removed = keys
            .iter()
            .filter(|key| content.remove(key.as_slice()).is_some())
            .count() as u64;
        if content.is_empty() {
            self.tables.remove(table);
        }
        removed
    }

    /// Drop a whole table, returning the size it had
    pub fn delete_all(&mut self, table: &str) -> u64 {
        self.tables.remove(table).map_or(0, |t| t.len() as u64)
    }

    // =========================================================================
    // Resets and Defaults
    // =========================================================================

    /// Register (or replace) the default content of a table
    ///
    /// Takes effect on the next `reset_table` or `reset_all`.
    pub fn set_default(&mut self, table: impl Into<String>, default: TableDefault) {
        self.defaults.insert(table.into(), default);
    }

    /// Registered default of a table, if any
    pub fn default_for(&self, table: &str) -> Option<&TableDefault> {
        self.defaults.get(table)
    }

    /// Drop a table and rebuild it from its default, if one is registered
    pub fn reset_table(&mut self, table: &str) -> Result<()> {
        self.tables.remove(table);
        if let Some(default) = self.defaults.get(table) {
            let content = resolve(table, default)?;
            if !content.is_empty() {
                self.tables.insert(table.to_string(), content);
            }
        }
        Ok(())
    }

    /// Drop every table, then rebuild every table that has a default
    ///
    /// On a provider failure the tables rebuilt so far are kept.
    pub fn reset_all(&mut self) -> Result<()> {
        self.tables.clear();
        for (table, default) in &self.defaults {
            let content = resolve(table, default)?;
            if !content.is_empty() {
                self.tables.insert(table.clone(), content);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Names of the materialized tables
    pub fn list_tables(&self) -> BTreeSet<String> {
        self.tables.keys().cloned().collect()
    }

    /// Entry count of a table, 0 if absent
    pub fn table_size(&self, table: &str) -> u64 {
        self.tables.get(table).map_or(0, |t| t.len() as u64)
    }

    /// Number of materialized tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// True when no table is materialized
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn resolve(table: &str, default: &TableDefault) -> Result<Table> {
    default.resolve().map_err(|e| CacheError::DefaultProvider {
        table: table.to_string(),
        reason: e.to_string(),
    })
}
