//! Binary Ion writer with deferred length headers.
//!
//! Values are written into a content buffer as soon as they are set.
//! Container and wrapper headers are recorded as patches and filled in when
//! the buffered top-level values are serialized on [`BinaryWriter::finish`]
//! or [`BinaryWriter::flush`]. Symbols are interned into a local symbol
//! table whose declaration is injected ahead of the first value that needs
//! it.

mod patch;
mod scalars;
mod symtab;

use std::io::Write;
use std::mem;
use std::sync::Arc;

use ion_buffers::Writer;
use log::{debug, warn};

use crate::constants::{Type, ION_1_0_IVM, MAXIMUM_VALUE_SIZE, SYSTEM_MAX_ID};
use crate::error::{IonError, IonResult};
use crate::symbols::{SharedSymbolTable, SymbolTable};
use crate::type_descriptor::{bool_descriptor, encode_header, null_descriptor};
use crate::types::{Decimal, Int, IonType, Timestamp};
use crate::var_int::encode_var_uint;

use patch::{PatchKind, PatchList};

pub use symtab::write_shared_symbol_table;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Emit a version marker before the first serialized value.
    pub write_initial_ivm: bool,
    /// Shared tables every local symbol table declared by the writer
    /// imports, in order.
    pub imports: Vec<Arc<SharedSymbolTable>>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            write_initial_ivm: true,
            imports: Vec::new(),
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_ivm(mut self, write: bool) -> Self {
        self.write_initial_ivm = write;
        self
    }

    pub fn with_import(mut self, table: Arc<SharedSymbolTable>) -> Self {
        self.imports.push(table);
        self
    }
}

/// A binary Ion writer over any [`Write`] sink.
pub struct BinaryWriter<W: Write> {
    out: W,
    options: WriterOptions,
    buffer: Writer,
    patches: PatchList,
    symbols: SymbolTable,
    /// A declaration of the current symbol context is buffered or emitted.
    declared: bool,
    /// New symbols must go into an appended declaration.
    locked: bool,
    ivm_pending: bool,
    field: Option<PendingSymbol>,
    annotations: Vec<PendingSymbol>,
}

/// A field name or annotation set by text is interned only when the value
/// it applies to is written.
#[derive(Debug, Clone)]
enum PendingSymbol {
    Id(u32),
    Text(String),
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(out: W, options: WriterOptions) -> Self {
        let symbols = fresh_context(&options);
        Self {
            out,
            ivm_pending: options.write_initial_ivm,
            options,
            buffer: Writer::with_alloc_size(8 * 1024),
            patches: PatchList::default(),
            symbols,
            declared: false,
            locked: false,
            field: None,
            annotations: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.patches.depth()
    }

    pub fn is_in_struct(&self) -> bool {
        self.patches
            .innermost()
            .is_some_and(|c| c.type_code == Type::STRUCT)
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Returns the sink. Buffered values that were not finished are lost.
    pub fn into_inner(self) -> W {
        self.out
    }

    // ---------------------------------------------------------------- Symbols

    /// Closes the local symbol table to new symbols. Symbols added later go
    /// into an appended declaration.
    pub fn lock_symbol_table(&mut self) {
        self.locked = true;
    }

    fn intern(&mut self, text: &str) -> IonResult<u32> {
        let (sid, added) = self.symbols.intern(text)?;
        if added && self.declared && self.locked {
            let first_local = self.symbols.local_symbols().len() - 1;
            self.patches
                .insert_symbol_table(self.buffer.len(), first_local, true);
            self.locked = false;
            debug!("appending local symbol table for {text:?} (sid {sid})");
        }
        self.declare_for(sid);
        Ok(sid)
    }

    fn resolve(&mut self, symbol: PendingSymbol) -> IonResult<u32> {
        match symbol {
            PendingSymbol::Id(sid) => {
                self.declare_for(sid);
                Ok(sid)
            }
            PendingSymbol::Text(text) => self.intern(&text),
        }
    }

    fn take_annotations(&mut self) -> IonResult<Vec<u32>> {
        mem::take(&mut self.annotations)
            .into_iter()
            .map(|symbol| self.resolve(symbol))
            .collect()
    }

    /// Makes sure a declaration precedes the first use of a non-system SID.
    fn declare_for(&mut self, sid: u32) {
        if sid > SYSTEM_MAX_ID && !self.declared {
            self.patches.insert_symbol_table(self.buffer.len(), 0, false);
            self.declared = true;
            debug!("injecting local symbol table before sid {sid}");
        }
    }

    fn known_sid(&self, sid: u32) -> IonResult<u32> {
        if sid > self.symbols.max_id() {
            return Err(IonError::usage(format!(
                "symbol id {sid} exceeds max id {}",
                self.symbols.max_id()
            )));
        }
        Ok(sid)
    }

    fn check_sid(&mut self, sid: u32) -> IonResult<u32> {
        let sid = self.known_sid(sid)?;
        self.declare_for(sid);
        Ok(sid)
    }

    /// Names the next value. Outside a struct the name is dropped.
    pub fn set_field_name(&mut self, name: &str) {
        self.field = Some(PendingSymbol::Text(name.to_owned()));
    }

    pub fn set_field_id(&mut self, sid: u32) -> IonResult<()> {
        self.field = Some(PendingSymbol::Id(self.known_sid(sid)?));
        Ok(())
    }

    pub fn add_annotation(&mut self, text: &str) {
        self.annotations.push(PendingSymbol::Text(text.to_owned()));
    }

    pub fn add_annotation_id(&mut self, sid: u32) -> IonResult<()> {
        let sid = self.known_sid(sid)?;
        self.annotations.push(PendingSymbol::Id(sid));
        Ok(())
    }

    // ------------------------------------------------------------- Containers

    pub fn step_in(&mut self, ion_type: IonType) -> IonResult<()> {
        if !ion_type.is_container() {
            return Err(IonError::usage(format!("cannot step into {ion_type}")));
        }
        let field = self.take_field()?;
        if let Some(sid) = field {
            let start = self.buffer.len();
            self.buffer.buf(encode_var_uint(sid as u64).as_slice());
            self.patches.patch(self.buffer.len() - start);
        }
        let annotations = self.take_annotations()?;
        let wrapper = if annotations.is_empty() {
            None
        } else {
            let index = self.patches.open_wrapper(self.buffer.len());
            let start = self.buffer.len();
            self.write_annotation_list(&annotations);
            let written = self.buffer.len() - start;
            if let Some(wrapper) = self.patches.get_mut(index) {
                wrapper.length += written;
            }
            Some(index)
        };
        self.patches
            .open_container(ion_type.type_code(), self.buffer.len(), wrapper);
        Ok(())
    }

    pub fn step_out(&mut self) -> IonResult<()> {
        self.field = None;
        self.annotations.clear();
        self.patches
            .close_container()
            .map(|_| ())
            .ok_or_else(|| IonError::usage("step_out at top level"))
    }

    // ---------------------------------------------------------------- Scalars

    pub fn write_null(&mut self, ion_type: IonType) -> IonResult<()> {
        self.write_value(&[null_descriptor(ion_type.type_code())], &[])
    }

    pub fn write_bool(&mut self, value: bool) -> IonResult<()> {
        self.write_value(&[bool_descriptor(value)], &[])
    }

    pub fn write_i64(&mut self, value: i64) -> IonResult<()> {
        self.write_int(&Int::I64(value))
    }

    pub fn write_int(&mut self, value: &Int) -> IonResult<()> {
        let (type_code, content) = scalars::int(value);
        self.write_scalar(type_code, &content)
    }

    pub fn write_f64(&mut self, value: f64) -> IonResult<()> {
        self.write_scalar(Type::FLOAT, &scalars::float(value))
    }

    pub fn write_decimal(&mut self, value: &Decimal) -> IonResult<()> {
        let content = scalars::decimal(value)?;
        self.write_scalar(Type::DECIMAL, &content)
    }

    pub fn write_timestamp(&mut self, value: &Timestamp) -> IonResult<()> {
        let content = scalars::timestamp(value)?;
        self.write_scalar(Type::TIMESTAMP, &content)
    }

    pub fn write_symbol(&mut self, text: &str) -> IonResult<()> {
        let sid = self.intern(text)?;
        self.write_scalar(Type::SYMBOL, &scalars::symbol_id(sid))
    }

    pub fn write_symbol_id(&mut self, sid: u32) -> IonResult<()> {
        let sid = self.check_sid(sid)?;
        self.write_scalar(Type::SYMBOL, &scalars::symbol_id(sid))
    }

    pub fn write_string(&mut self, value: &str) -> IonResult<()> {
        self.write_scalar(Type::STRING, value.as_bytes())
    }

    pub fn write_clob(&mut self, value: &[u8]) -> IonResult<()> {
        self.write_scalar(Type::CLOB, value)
    }

    pub fn write_blob(&mut self, value: &[u8]) -> IonResult<()> {
        self.write_scalar(Type::BLOB, value)
    }

    /// Writes a complete pre-encoded value (header included). The pending
    /// field name is applied; pending annotations are not, since the raw
    /// bytes may already carry a wrapper.
    pub fn write_raw_value(&mut self, bytes: &[u8]) -> IonResult<()> {
        if !self.annotations.is_empty() {
            return Err(IonError::usage("annotations cannot be added to a raw value"));
        }
        self.write_value(&[], bytes)
    }

    fn write_scalar(&mut self, type_code: u8, content: &[u8]) -> IonResult<()> {
        if content.len() > MAXIMUM_VALUE_SIZE {
            return Err(IonError::ResourceLimit(format!(
                "value of {} bytes exceeds the maximum value size",
                content.len()
            )));
        }
        let header = encode_header(type_code, content.len());
        self.write_value(header.as_slice(), content)
    }

    /// Appends field name, known-length wrapper, header and content, then
    /// patches the enclosing container.
    fn write_value(&mut self, header: &[u8], content: &[u8]) -> IonResult<()> {
        let field = self.take_field()?;
        let start = self.buffer.len();
        if let Some(sid) = field {
            self.buffer.buf(encode_var_uint(sid as u64).as_slice());
        }
        let annotations = self.take_annotations()?;
        if !annotations.is_empty() {
            let list: usize = annotations
                .iter()
                .map(|sid| encode_var_uint(*sid as u64).len())
                .sum();
            let wrapped = encode_var_uint(list as u64).len() + list + header.len() + content.len();
            self.buffer
                .buf(encode_header(Type::ANNOTATION, wrapped).as_slice());
            self.write_annotation_list(&annotations);
        }
        self.buffer.buf(header);
        self.buffer.buf(content);
        self.patches.patch(self.buffer.len() - start);
        Ok(())
    }

    fn write_annotation_list(&mut self, annotations: &[u32]) {
        let list: usize = annotations
            .iter()
            .map(|sid| encode_var_uint(*sid as u64).len())
            .sum();
        self.buffer.buf(encode_var_uint(list as u64).as_slice());
        for sid in annotations {
            self.buffer.buf(encode_var_uint(*sid as u64).as_slice());
        }
    }

    fn take_field(&mut self) -> IonResult<Option<u32>> {
        let field = self.field.take();
        if !self.is_in_struct() {
            return Ok(None);
        }
        let field = field.ok_or_else(|| IonError::usage("value in a struct needs a field name"))?;
        self.resolve(field).map(Some)
    }

    // ---------------------------------------------------------------- Output

    /// Writes a version marker. Buffered values are finished first and the
    /// symbol context is reset.
    pub fn write_ivm(&mut self) -> IonResult<()> {
        self.finish()?;
        self.ivm_pending = false;
        self.out.write_all(&ION_1_0_IVM)?;
        Ok(())
    }

    /// Serializes all buffered values and resets the symbol context, so the
    /// next value needing symbols starts a new local symbol table.
    pub fn finish(&mut self) -> IonResult<()> {
        if self.depth() > 0 {
            return Err(IonError::usage("finish inside a container"));
        }
        self.serialize()?;
        self.out.flush()?;
        self.symbols = fresh_context(&self.options);
        self.declared = false;
        self.locked = false;
        Ok(())
    }

    /// Serializes buffered values while keeping the symbol context. Only
    /// legal once the local symbol table is locked, since symbols added
    /// later could not be declared in the already emitted table.
    pub fn flush(&mut self) -> IonResult<()> {
        if self.depth() > 0 {
            return Err(IonError::usage("flush inside a container"));
        }
        let buffered = !self.buffer.is_empty() || !self.patches.is_empty();
        if buffered && self.declared && !self.locked {
            return Err(IonError::usage(
                "flush with an open local symbol table; lock it or call finish",
            ));
        }
        self.serialize()?;
        self.out.flush()?;
        Ok(())
    }

    fn serialize(&mut self) -> IonResult<()> {
        if self.buffer.is_empty() && self.patches.is_empty() {
            return Ok(());
        }
        if self.ivm_pending {
            self.out.write_all(&ION_1_0_IVM)?;
            self.ivm_pending = false;
        }
        let declarations: Vec<usize> = self
            .patches
            .iter()
            .filter_map(|p| match p.kind {
                PatchKind::SymbolTable { first_local, .. } => Some(first_local),
                _ => None,
            })
            .collect();
        let locals = self.symbols.local_symbols();
        let mut next_declaration = 0;
        let mut at = 0;
        for patch in self.patches.iter() {
            self.out.write_all(self.buffer.range(at..patch.offset))?;
            at = patch.offset;
            match patch.kind {
                PatchKind::SymbolTable { first_local, append } => {
                    next_declaration += 1;
                    let end = declarations
                        .get(next_declaration)
                        .copied()
                        .unwrap_or(locals.len());
                    let imports = if append { &[][..] } else { self.symbols.imports() };
                    let bytes =
                        symtab::render_local_symbol_table(imports, &locals[first_local..end], append)?;
                    self.out.write_all(&bytes)?;
                }
                _ => {
                    if let Some(header) = patch.header() {
                        self.out.write_all(header.as_slice())?;
                    }
                }
            }
        }
        self.out.write_all(self.buffer.range(at..self.buffer.len()))?;
        debug!(
            "serialized {} buffered bytes with {} length patches",
            self.buffer.len(),
            self.patches.iter().count()
        );
        self.buffer.clear();
        self.patches.clear();
        Ok(())
    }
}

impl BinaryWriter<Vec<u8>> {
    /// A writer into a fresh byte vector.
    pub fn to_vec(options: WriterOptions) -> Self {
        Self::new(Vec::new(), options)
    }
}

/// Imports that would push SIDs past `u32::MAX` are left out, so every
/// declaration the writer emits stays readable.
fn fresh_context(options: &WriterOptions) -> SymbolTable {
    let mut table = SymbolTable::system();
    for shared in &options.imports {
        if let Err(e) = table.add_import(shared.clone()) {
            warn!("not importing {} version {}: {e}", shared.name(), shared.version());
        }
    }
    table
}
