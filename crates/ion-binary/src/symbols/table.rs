//! The symbol table a stream resolves SIDs against.
//!
//! A table is a chain of imported shared tables (the system table always
//! first) followed by local symbols. Each import occupies a SID range of
//! exactly its `max_id`; local symbols start right after the last import.

use std::collections::HashMap;
use std::sync::Arc;

use super::SharedSymbolTable;
use crate::constants::SYSTEM_MAX_ID;
use crate::error::{IonError, IonResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolTableKind {
    /// Only the system table is visible.
    System,
    /// A per-stream table with imports and/or local symbols.
    Local,
}

/// One imported table and the first SID it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub table: Arc<SharedSymbolTable>,
    pub offset: u32,
}

impl Import {
    pub fn max_id(&self) -> u32 {
        self.offset - 1 + self.table.max_id()
    }
}

/// The current symbol context of a reader or writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    kind: SymbolTableKind,
    imports: Vec<Import>,
    import_max_id: u32,
    symbols: Vec<Option<String>>,
    by_text: HashMap<String, u32>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::system()
    }
}

impl SymbolTable {
    /// The table in effect at the start of a stream and after every IVM.
    pub fn system() -> Self {
        Self {
            kind: SymbolTableKind::System,
            imports: vec![Import {
                table: SharedSymbolTable::system(),
                offset: 1,
            }],
            import_max_id: SYSTEM_MAX_ID,
            symbols: Vec::new(),
            by_text: HashMap::new(),
        }
    }

    /// A local table importing `imports` after the system table. Fails when
    /// the imports declare more SIDs than a `u32` holds.
    pub fn local(imports: impl IntoIterator<Item = Arc<SharedSymbolTable>>) -> IonResult<Self> {
        let mut table = Self::system();
        table.kind = SymbolTableKind::Local;
        for shared in imports {
            table.add_import(shared)?;
        }
        Ok(table)
    }

    /// Appends an import after the existing ones. Only legal before local
    /// symbols are added.
    pub fn add_import(&mut self, table: Arc<SharedSymbolTable>) -> IonResult<()> {
        if !self.symbols.is_empty() {
            return Err(IonError::usage("imports must precede local symbols"));
        }
        let offset = self.import_max_id + 1;
        self.import_max_id = self
            .import_max_id
            .checked_add(table.max_id())
            .ok_or_else(|| sid_space_exhausted(table.name()))?;
        self.kind = SymbolTableKind::Local;
        self.imports.push(Import { table, offset });
        Ok(())
    }

    pub fn kind(&self) -> SymbolTableKind {
        self.kind
    }

    pub fn is_system(&self) -> bool {
        self.kind == SymbolTableKind::System
    }

    /// True when nothing beyond the system table is visible.
    pub fn is_trivial(&self) -> bool {
        self.imports.len() == 1 && self.symbols.is_empty()
    }

    /// Highest SID defined by this table.
    pub fn max_id(&self) -> u32 {
        self.import_max_id + self.symbols.len() as u32
    }

    /// Highest SID contributed by imports (including the system table).
    pub fn import_max_id(&self) -> u32 {
        self.import_max_id
    }

    /// Imports after the system table.
    pub fn imports(&self) -> &[Import] {
        &self.imports[1..]
    }

    /// Local symbols in SID order.
    pub fn local_symbols(&self) -> &[Option<String>] {
        &self.symbols
    }

    /// Resolves a SID. `None` when the SID is 0, out of range or has
    /// unknown text.
    pub fn text(&self, sid: u32) -> Option<&str> {
        if sid == 0 || sid > self.max_id() {
            return None;
        }
        if sid > self.import_max_id {
            let idx = (sid - self.import_max_id - 1) as usize;
            return self.symbols.get(idx)?.as_deref();
        }
        let import = self.imports.iter().rev().find(|i| i.offset <= sid)?;
        import.table.text(sid - import.offset + 1)
    }

    /// Lowest SID whose text is `text`.
    pub fn sid(&self, text: &str) -> Option<u32> {
        for import in &self.imports {
            if let Some(sid) = import.table.sid(text) {
                return Some(import.offset + sid - 1);
            }
        }
        self.by_text.get(text).copied()
    }

    pub fn contains_sid(&self, sid: u32) -> bool {
        sid <= self.max_id()
    }

    /// Returns the SID of `text`, appending it as a local symbol when it
    /// is not yet defined. The second element is true when a symbol was
    /// added.
    pub fn intern(&mut self, text: &str) -> IonResult<(u32, bool)> {
        if let Some(sid) = self.sid(text) {
            return Ok((sid, false));
        }
        Ok((self.add_symbol(Some(text.to_owned()))?, true))
    }

    /// Appends a local symbol slot and returns its SID.
    pub fn add_symbol(&mut self, text: Option<String>) -> IonResult<u32> {
        let sid = self
            .max_id()
            .checked_add(1)
            .ok_or_else(|| sid_space_exhausted("local symbols"))?;
        self.kind = SymbolTableKind::Local;
        if let Some(text) = &text {
            self.by_text.entry(text.clone()).or_insert(sid);
        }
        self.symbols.push(text);
        Ok(sid)
    }
}

fn sid_space_exhausted(what: &str) -> IonError {
    IonError::ResourceLimit(format!("{what}: symbol ids exceed {}", u32::MAX))
}
