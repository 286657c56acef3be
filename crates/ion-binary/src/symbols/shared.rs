//! Named, versioned symbol tables that local tables import.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::constants::SYSTEM_SYMBOLS;

/// An immutable shared symbol table.
///
/// Slots holding `None` have unknown text: they still occupy a SID. A
/// substitute stands in for an import the catalog cannot match exactly; it
/// stores only the declared `max_id` and the closest table found, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSymbolTable {
    name: String,
    version: u32,
    max_id: u32,
    symbols: Vec<Option<String>>,
    by_text: HashMap<String, u32>,
    original: Option<Arc<SharedSymbolTable>>,
    is_substitute: bool,
}

impl SharedSymbolTable {
    pub fn new<I, S>(name: impl Into<String>, version: u32, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_slots(
            name.into(),
            version.max(1),
            symbols.into_iter().map(|s| Some(s.into())).collect(),
        )
    }

    /// Builds a table whose slots may have unknown text.
    pub fn with_slots(name: impl Into<String>, version: u32, symbols: Vec<Option<String>>) -> Self {
        Self::from_slots(name.into(), version.max(1), symbols)
    }

    /// Stands in for an import whose declared shape does not match what the
    /// catalog holds. Exactly `max_id` SIDs are exposed; those covered by
    /// `original` keep its text, the rest are unknown. Nothing is allocated
    /// per SID.
    pub fn substitute(
        name: impl Into<String>,
        version: u32,
        max_id: u32,
        original: Option<Arc<SharedSymbolTable>>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.max(1),
            max_id,
            symbols: Vec::new(),
            by_text: HashMap::new(),
            original,
            is_substitute: true,
        }
    }

    fn from_slots(name: String, version: u32, symbols: Vec<Option<String>>) -> Self {
        let mut by_text = HashMap::with_capacity(symbols.len());
        for (i, text) in symbols.iter().enumerate() {
            if let Some(text) = text {
                // Duplicates keep the lowest SID.
                by_text.entry(text.clone()).or_insert(i as u32 + 1);
            }
        }
        Self {
            name,
            version,
            max_id: symbols.len() as u32,
            symbols,
            by_text,
            original: None,
            is_substitute: false,
        }
    }

    /// The `$ion` 1.0 system table.
    pub fn system() -> Arc<SharedSymbolTable> {
        static SYSTEM: OnceLock<Arc<SharedSymbolTable>> = OnceLock::new();
        SYSTEM
            .get_or_init(|| Arc::new(SharedSymbolTable::new("$ion", 1, SYSTEM_SYMBOLS[1..].iter().copied())))
            .clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    pub fn is_substitute(&self) -> bool {
        self.is_substitute
    }

    pub fn is_system(&self) -> bool {
        self.name == "$ion"
    }

    /// Text of a table-relative SID (1-based).
    pub fn text(&self, sid: u32) -> Option<&str> {
        if sid == 0 || sid > self.max_id {
            return None;
        }
        match &self.original {
            Some(original) => original.text(sid),
            None => self.symbols.get(sid as usize - 1)?.as_deref(),
        }
    }

    /// Table-relative SID of `text`.
    pub fn sid(&self, text: &str) -> Option<u32> {
        match &self.original {
            Some(original) => original.sid(text).filter(|sid| *sid <= self.max_id),
            None => self.by_text.get(text).copied(),
        }
    }

    /// Text of every SID from 1 to `max_id`, in order.
    pub fn slots(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        (1..=self.max_id).map(move |sid| self.text(sid))
    }
}
