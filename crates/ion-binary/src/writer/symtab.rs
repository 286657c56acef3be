//! Serialization of symbol table declarations.

use std::io::Write;

use super::{BinaryWriter, WriterOptions};
use crate::constants::{
    SID_IMPORTS, SID_ION_SHARED_SYMBOL_TABLE, SID_ION_SYMBOL_TABLE, SID_MAX_ID, SID_NAME, SID_SYMBOLS,
    SID_VERSION,
};
use crate::error::IonResult;
use crate::symbols::{Import, SharedSymbolTable};
use crate::types::IonType;

/// Renders `$ion_symbol_table::{imports: ..., symbols: [...]}`. An append
/// declaration uses `imports: $ion_symbol_table` instead of an import list.
pub(crate) fn render_local_symbol_table(
    imports: &[Import],
    symbols: &[Option<String>],
    append: bool,
) -> IonResult<Vec<u8>> {
    let mut writer = BinaryWriter::to_vec(WriterOptions::new().with_initial_ivm(false));
    writer.add_annotation_id(SID_ION_SYMBOL_TABLE)?;
    writer.step_in(IonType::Struct)?;
    if append {
        writer.set_field_id(SID_IMPORTS)?;
        writer.write_symbol_id(SID_ION_SYMBOL_TABLE)?;
    } else if !imports.is_empty() {
        writer.set_field_id(SID_IMPORTS)?;
        writer.step_in(IonType::List)?;
        for import in imports {
            write_import(&mut writer, &import.table)?;
        }
        writer.step_out()?;
    }
    write_symbols(&mut writer, symbols.iter().map(Option::as_deref))?;
    writer.step_out()?;
    writer.finish()?;
    Ok(writer.into_inner())
}

fn write_import<W: Write>(writer: &mut BinaryWriter<W>, table: &SharedSymbolTable) -> IonResult<()> {
    writer.step_in(IonType::Struct)?;
    writer.set_field_id(SID_NAME)?;
    writer.write_string(table.name())?;
    writer.set_field_id(SID_VERSION)?;
    writer.write_i64(table.version() as i64)?;
    writer.set_field_id(SID_MAX_ID)?;
    writer.write_i64(table.max_id() as i64)?;
    writer.step_out()
}

fn write_symbols<'a, W: Write>(
    writer: &mut BinaryWriter<W>,
    symbols: impl Iterator<Item = Option<&'a str>>,
) -> IonResult<()> {
    let mut symbols = symbols.peekable();
    if symbols.peek().is_none() {
        return Ok(());
    }
    writer.set_field_id(SID_SYMBOLS)?;
    writer.step_in(IonType::List)?;
    for symbol in symbols {
        match symbol {
            Some(text) => writer.write_string(text)?,
            None => writer.write_null(IonType::String)?,
        }
    }
    writer.step_out()
}

/// Writes `table` as a `$ion_shared_symbol_table` struct. Only system
/// symbols are used, so no local symbol table is declared for it.
pub fn write_shared_symbol_table<W: Write>(
    writer: &mut BinaryWriter<W>,
    table: &SharedSymbolTable,
) -> IonResult<()> {
    writer.add_annotation_id(SID_ION_SHARED_SYMBOL_TABLE)?;
    writer.step_in(IonType::Struct)?;
    writer.set_field_id(SID_NAME)?;
    writer.write_string(table.name())?;
    writer.set_field_id(SID_VERSION)?;
    writer.write_i64(table.version() as i64)?;
    write_symbols(writer, table.slots())?;
    writer.step_out()
}
