//! Parsing of `$ion_symbol_table` and `$ion_shared_symbol_table` structs.

use std::sync::Arc;

use log::{debug, warn};

use super::{BinaryReader, ByteSource, ReaderOptions, SliceSource};
use crate::constants::{
    MAXIMUM_COPIED_IMPORT_SYMBOLS, SID_IMPORTS, SID_ION_SYMBOL_TABLE, SID_MAX_ID, SID_NAME, SID_SYMBOLS,
    SID_VERSION,
};
use crate::error::{IonError, IonResult};
use crate::symbols::{Catalog, SharedSymbolTable, SymbolTable};
use crate::types::IonType;

enum ImportsField {
    Absent,
    Append,
    List(Vec<Arc<SharedSymbolTable>>),
}

struct TableFields {
    name: Option<String>,
    version: Option<i64>,
    imports: ImportsField,
    symbols: Vec<Option<String>>,
}

/// Builds the symbol table declared by the content of a local symbol table
/// struct. `base` is the stream offset of `content`.
pub(crate) fn load_local_symbol_table(
    content: &[u8],
    base: u64,
    current: &Arc<SymbolTable>,
    catalog: Option<Arc<dyn Catalog>>,
) -> IonResult<SymbolTable> {
    let options = ReaderOptions {
        surface_system_values: false,
        catalog,
    };
    let mut reader = BinaryReader::struct_body(
        SliceSource::with_base(content, base),
        content.len() as u64,
        current.clone(),
        options,
    );
    let fields = read_table_fields(&mut reader)?;
    let too_many = |_: IonError| IonError::format("symbol table declares more symbol ids than fit in 32 bits", base);
    let mut table = match fields.imports {
        ImportsField::Append => {
            debug!("appending {} symbols to the current table", fields.symbols.len());
            SymbolTable::clone(current)
        }
        ImportsField::Absent => SymbolTable::local([]).map_err(too_many)?,
        ImportsField::List(imports) => SymbolTable::local(imports).map_err(too_many)?,
    };
    for text in fields.symbols {
        table.add_symbol(text).map_err(too_many)?;
    }
    Ok(table)
}

/// Reads the shared symbol table struct the reader is positioned on.
///
/// Imports are resolved through the reader's catalog and their symbols are
/// copied ahead of the table's own symbols.
pub fn read_shared_symbol_table<S: ByteSource>(reader: &mut BinaryReader<S>) -> IonResult<SharedSymbolTable> {
    let position = reader.position();
    reader.step_in()?;
    if !reader.is_in_struct() {
        reader.step_out()?;
        return Err(IonError::usage("shared symbol table must be a struct"));
    }
    let fields = read_table_fields(reader)?;
    reader.step_out()?;

    let name = match fields.name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(IonError::format("shared symbol table without a name", position)),
    };
    let version = fields.version.map_or(1, |v| v.clamp(1, u32::MAX as i64) as u32);
    let mut slots = Vec::new();
    if let ImportsField::List(imports) = fields.imports {
        let copied = imports.iter().try_fold(0u32, |total, import| total.checked_add(import.max_id()));
        if copied.map_or(true, |n| n > MAXIMUM_COPIED_IMPORT_SYMBOLS) {
            return Err(IonError::ResourceLimit(format!(
                "shared symbol table {name} imports more than {MAXIMUM_COPIED_IMPORT_SYMBOLS} symbols"
            )));
        }
        for import in imports {
            slots.extend(import.slots().map(|text| text.map(str::to_owned)));
        }
    }
    slots.extend(fields.symbols);
    Ok(SharedSymbolTable::with_slots(name, version, slots))
}

fn read_table_fields<S: ByteSource>(reader: &mut BinaryReader<S>) -> IonResult<TableFields> {
    let mut fields = TableFields {
        name: None,
        version: None,
        imports: ImportsField::Absent,
        symbols: Vec::new(),
    };
    let mut seen_imports = false;
    let mut seen_symbols = false;
    while let Some(ion_type) = reader.next()? {
        let position = reader.position();
        let Some(field) = reader.field_id() else {
            continue;
        };
        if reader.is_null() {
            continue;
        }
        match (field, ion_type) {
            (SID_IMPORTS, _) => {
                if seen_imports {
                    return Err(IonError::format("symbol table with multiple imports fields", position));
                }
                seen_imports = true;
                match ion_type {
                    IonType::Symbol if reader.read_symbol_id()? == SID_ION_SYMBOL_TABLE => {
                        fields.imports = ImportsField::Append;
                    }
                    IonType::List => fields.imports = ImportsField::List(read_imports(reader)?),
                    _ => {}
                }
            }
            (SID_SYMBOLS, _) => {
                if seen_symbols {
                    return Err(IonError::format("symbol table with multiple symbols fields", position));
                }
                seen_symbols = true;
                if ion_type == IonType::List {
                    fields.symbols = read_symbols(reader)?;
                }
            }
            (SID_NAME, IonType::String) => fields.name = Some(reader.read_string()?),
            (SID_VERSION, IonType::Int) => fields.version = reader.read_int()?.as_i64(),
            _ => {}
        }
    }
    Ok(fields)
}

fn read_symbols<S: ByteSource>(reader: &mut BinaryReader<S>) -> IonResult<Vec<Option<String>>> {
    let mut symbols = Vec::new();
    reader.step_in()?;
    while let Some(ion_type) = reader.next()? {
        let text = if ion_type == IonType::String && !reader.is_null() {
            Some(reader.read_string()?).filter(|s| !s.is_empty())
        } else {
            None
        };
        symbols.push(text);
    }
    reader.step_out()?;
    Ok(symbols)
}

fn read_imports<S: ByteSource>(reader: &mut BinaryReader<S>) -> IonResult<Vec<Arc<SharedSymbolTable>>> {
    let mut imports = Vec::new();
    reader.step_in()?;
    while let Some(ion_type) = reader.next()? {
        if ion_type != IonType::Struct || reader.is_null() {
            continue;
        }
        if let Some(import) = read_one_import(reader)? {
            imports.push(import);
        }
    }
    reader.step_out()?;
    Ok(imports)
}

fn read_one_import<S: ByteSource>(reader: &mut BinaryReader<S>) -> IonResult<Option<Arc<SharedSymbolTable>>> {
    let position = reader.position();
    let mut name = None;
    let mut version = 1i64;
    let mut max_id = None;
    reader.step_in()?;
    while let Some(ion_type) = reader.next()? {
        if reader.is_null() {
            continue;
        }
        match (reader.field_id(), ion_type) {
            (Some(SID_NAME), IonType::String) => name = Some(reader.read_string()?),
            (Some(SID_VERSION), IonType::Int) => version = reader.read_int()?.as_i64().unwrap_or(1),
            (Some(SID_MAX_ID), IonType::Int) => max_id = reader.read_int()?.as_i64(),
            _ => {}
        }
    }
    reader.step_out()?;

    let name = match name {
        Some(name) if !name.is_empty() && name != "$ion" => name,
        _ => return Ok(None),
    };
    let version = version.clamp(1, u32::MAX as i64) as u32;
    let max_id = max_id
        .filter(|m| *m >= 0)
        .map(|m| u32::try_from(m).map_err(|_| IonError::format("import max_id too large", position)))
        .transpose()?;
    resolve_import(name, version, max_id, reader.options.catalog.as_deref(), position).map(Some)
}

fn resolve_import(
    name: String,
    version: u32,
    max_id: Option<u32>,
    catalog: Option<&dyn Catalog>,
    position: u64,
) -> IonResult<Arc<SharedSymbolTable>> {
    let found = catalog.and_then(|c| c.find(&name, version));
    let max_id = match max_id {
        Some(max_id) => max_id,
        None => match &found {
            Some(table) if table.version() == version => table.max_id(),
            _ => {
                return Err(IonError::format(
                    format!("import of {name} version {version} has no max_id and no exact match in the catalog"),
                    position,
                ))
            }
        },
    };
    match found {
        None => {
            warn!("shared symbol table {name} version {version} not found; its {max_id} symbols have unknown text");
            Ok(Arc::new(SharedSymbolTable::substitute(name, version, max_id, None)))
        }
        Some(table) if table.version() != version || table.max_id() != max_id => {
            debug!(
                "import {name} version {version} max_id {max_id} substituted from version {} max_id {}",
                table.version(),
                table.max_id()
            );
            Ok(Arc::new(SharedSymbolTable::substitute(name, version, max_id, Some(table))))
        }
        Some(table) => Ok(table),
    }
}
