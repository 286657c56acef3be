//! Symbol tables: the fixed system table, shared (importable) tables, the
//! per-stream table built from them, and catalogs that supply imports.

mod catalog;
mod shared;
mod table;

pub use catalog::{Catalog, SimpleCatalog};
pub use shared::SharedSymbolTable;
pub use table::{Import, SymbolTable, SymbolTableKind};
