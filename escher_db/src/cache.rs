//! Explicit schema-state cache.
//!
//! Catalog probes and table-ensure checks are memoized here instead of in
//! process-wide statics, so ownership is visible at construction sites
//! and invalidation is an explicit call rather than a restart.

use dashmap::{DashMap, DashSet};

#[derive(Debug, Default)]
pub struct SchemaStateCache {
    table_exists: DashMap<String, bool>,
    ensured: DashSet<String>,
}

impl SchemaStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result of an earlier existence probe, if any.
    pub fn table_exists(&self, table: &str) -> Option<bool> {
        self.table_exists.get(table).map(|entry| *entry)
    }

    pub fn record_table_exists(&self, table: &str, exists: bool) {
        self.table_exists.insert(table.to_string(), exists);
    }

    /// Marks a one-time setup step (such as lock table creation) done.
    pub fn mark_ensured(&self, key: &str) {
        self.ensured.insert(key.to_string());
    }

    pub fn is_ensured(&self, key: &str) -> bool {
        self.ensured.contains(key)
    }

    /// Drops every cached fact. Called after any committed DDL, since
    /// schema changes can invalidate existence answers and ensure
    /// markers alike.
    pub fn invalidate_all(&self) {
        self.table_exists.clear();
        self.ensured.clear();
    }
}
