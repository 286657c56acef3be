//! Lookup of shared symbol tables by name and version.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::SharedSymbolTable;

/// Source of shared symbol tables for resolving imports.
///
/// `find` returns the best match: the exact version when available,
/// otherwise any version of the named table (callers check the version).
pub trait Catalog: Send + Sync {
    fn find(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>>;
}

impl<F> Catalog for F
where
    F: Fn(&str, u32) -> Option<Arc<SharedSymbolTable>> + Send + Sync,
{
    fn find(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        self(name, version)
    }
}

/// In-memory catalog: exact version if present, else the highest version.
#[derive(Debug, Default, Clone)]
pub struct SimpleCatalog {
    tables: HashMap<String, BTreeMap<u32, Arc<SharedSymbolTable>>>,
}

impl SimpleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name and version.
    pub fn insert(&mut self, table: Arc<SharedSymbolTable>) {
        self.tables
            .entry(table.name().to_owned())
            .or_default()
            .insert(table.version(), table);
    }

    pub fn with_table(mut self, table: SharedSymbolTable) -> Self {
        self.insert(Arc::new(table));
        self
    }

    pub fn remove(&mut self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        let versions = self.tables.get_mut(name)?;
        let removed = versions.remove(&version);
        if versions.is_empty() {
            self.tables.remove(name);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Catalog for SimpleCatalog {
    fn find(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        let versions = self.tables.get(name)?;
        versions
            .get(&version)
            .or_else(|| versions.values().next_back())
            .cloned()
    }
}
