//! Pull-based binary Ion reader.
//!
//! The reader walks raw bytes as a state machine:
//!
//! - `BeforeField`: inside a struct, a VarUInt field SID comes next
//! - `BeforeTypeId`: a type descriptor comes next (NOP pads, version
//!   markers and annotation wrappers are consumed here)
//! - `BeforeValue`: positioned on a value whose content is unread
//! - `AfterValue`: the content was consumed by a typed getter
//! - `Eof`: no more values in the current container (or, at top level,
//!   currently available)
//!
//! Version markers and local symbol tables at top level are applied to the
//! symbol context and hidden unless [`ReaderOptions::surface_system_values`]
//! is set.

mod scalars;
mod source;
mod symtab;

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use log::{debug, trace};

use crate::constants::{LengthCode, Type, ION_1_0_IVM, SID_ION_1_0, SID_ION_SYMBOL_TABLE};
use crate::error::{IonError, IonResult};
use crate::symbols::{Catalog, SymbolTable};
use crate::type_descriptor::{LengthKind, TypeDescriptor};
use crate::types::{Decimal, Int, IonType, Timestamp};
use crate::var_int::{Step, VarUIntCursor};

pub(crate) use source::Input;
pub use source::{ByteSource, SliceSource, StreamSource};
pub use symtab::read_shared_symbol_table;

/// Reader configuration.
#[derive(Clone, Default)]
pub struct ReaderOptions {
    /// Surface version markers (as the symbol `$ion_1_0`) and local symbol
    /// table structs instead of hiding them. They are applied either way.
    pub surface_system_values: bool,
    /// Resolves shared symbol table imports.
    pub catalog: Option<Arc<dyn Catalog>>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_values(mut self, surface: bool) -> Self {
        self.surface_system_values = surface;
        self
    }

    pub fn with_catalog(mut self, catalog: impl Catalog + 'static) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("surface_system_values", &self.surface_system_values)
            .field("catalog", &self.catalog.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    BeforeField,
    BeforeTypeId,
    BeforeValue,
    AfterValue,
    Eof,
}

/// Saved context of the container the reader stepped out of.
#[derive(Debug, Clone)]
struct ContainerFrame {
    parent_type: Option<IonType>,
    resume_position: u64,
    /// End of the parent container; `None` at top level.
    parent_end: Option<u64>,
    symbols: Arc<SymbolTable>,
}

/// Header of the value the reader is positioned on.
#[derive(Debug, Clone)]
struct ValueHeader {
    descriptor: TypeDescriptor,
    ion_type: IonType,
    is_null: bool,
    field_id: Option<u32>,
    annotations: Vec<u32>,
    /// First byte of the value, including any annotation wrapper.
    start: u64,
    content_start: u64,
    content_len: u64,
    /// SID of a surfaced version marker, which has no content bytes.
    synthetic_sid: Option<u32>,
}

impl ValueHeader {
    fn end(&self) -> u64 {
        self.content_start + self.content_len
    }
}

enum Prepared {
    Value(ValueHeader),
    Skipped,
    End,
}

/// A binary Ion reader over a [`ByteSource`].
pub struct BinaryReader<S> {
    input: Input<S>,
    options: ReaderOptions,
    state: ReaderState,
    stack: Vec<ContainerFrame>,
    container_type: Option<IonType>,
    container_end: Option<u64>,
    symbols: Arc<SymbolTable>,
    current: Option<ValueHeader>,
    /// `has_next` found a value that `next` has not returned yet.
    pending: bool,
}

impl<'a> BinaryReader<SliceSource<'a>> {
    /// Reads from an in-memory buffer with default options.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(SliceSource::new(bytes), ReaderOptions::default())
    }
}

impl<S: ByteSource> BinaryReader<S> {
    pub fn new(source: S, options: ReaderOptions) -> Self {
        Self {
            input: Input::new(source),
            options,
            state: ReaderState::BeforeTypeId,
            stack: Vec::new(),
            container_type: None,
            container_end: None,
            symbols: Arc::new(SymbolTable::system()),
            current: None,
            pending: false,
        }
    }

    /// A reader positioned inside the body of a struct spanning the whole
    /// source. Used to parse symbol table structs.
    pub(crate) fn struct_body(source: S, len: u64, symbols: Arc<SymbolTable>, options: ReaderOptions) -> Self {
        let mut reader = Self::new(source, options);
        reader.container_end = Some(reader.input.position() + len);
        reader.container_type = Some(IonType::Struct);
        reader.state = ReaderState::BeforeField;
        reader.symbols = symbols;
        reader
    }

    // -------------------------------------------------------------- Accessors

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_in_struct(&self) -> bool {
        self.container_type == Some(IonType::Struct)
    }

    /// The symbol table in effect for the current value.
    pub fn symbol_table(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// Bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.input.position()
    }

    pub fn source(&self) -> &S {
        self.input.source()
    }

    pub fn source_mut(&mut self) -> &mut S {
        self.input.source_mut()
    }

    pub fn into_source(self) -> S {
        self.input.into_source()
    }

    fn header(&self) -> Option<&ValueHeader> {
        if self.pending {
            None
        } else {
            self.current.as_ref()
        }
    }

    pub fn ion_type(&self) -> Option<IonType> {
        self.header().map(|h| h.ion_type)
    }

    pub fn is_null(&self) -> bool {
        self.header().is_some_and(|h| h.is_null)
    }

    pub fn field_id(&self) -> Option<u32> {
        self.header().and_then(|h| h.field_id)
    }

    /// Text of the current field name. `Ok(None)` when there is no field
    /// name or its SID has unknown text.
    pub fn field_name(&self) -> IonResult<Option<&str>> {
        match self.header() {
            Some(ValueHeader {
                field_id: Some(sid),
                start,
                ..
            }) => self.resolve(*sid, *start),
            _ => Ok(None),
        }
    }

    pub fn annotation_ids(&self) -> &[u32] {
        self.header().map_or(&[], |h| h.annotations.as_slice())
    }

    /// Annotation texts; unknown text yields `None` in its slot.
    pub fn annotations(&self) -> IonResult<Vec<Option<&str>>> {
        let Some(header) = self.header() else {
            return Ok(Vec::new());
        };
        header
            .annotations
            .iter()
            .map(|sid| self.resolve(*sid, header.start))
            .collect()
    }

    pub fn has_annotation(&self, text: &str) -> bool {
        self.annotations()
            .map(|a| a.iter().any(|t| *t == Some(text)))
            .unwrap_or(false)
    }

    /// Byte span of the current value, annotation wrapper included.
    pub fn value_range(&self) -> Option<Range<u64>> {
        self.header().map(|h| h.start..h.end())
    }

    fn resolve(&self, sid: u32, position: u64) -> IonResult<Option<&str>> {
        if !self.symbols.contains_sid(sid) {
            return Err(IonError::format(
                format!("symbol id {sid} exceeds max id {}", self.symbols.max_id()),
                position,
            ));
        }
        Ok(self.symbols.text(sid))
    }

    // ------------------------------------------------------------- Navigation

    /// Positions on the next value header without returning it. Unread
    /// content of the previous value is skipped.
    pub fn has_next(&mut self) -> IonResult<bool> {
        if self.pending {
            return Ok(true);
        }
        if self.state == ReaderState::Eof && self.container_type.is_some() {
            return Ok(false);
        }
        self.finish_current()?;
        loop {
            match self.prepare_next()? {
                Prepared::Value(header) => {
                    self.current = Some(header);
                    self.pending = true;
                    return Ok(true);
                }
                Prepared::Skipped => continue,
                Prepared::End => {
                    self.state = ReaderState::Eof;
                    return Ok(false);
                }
            }
        }
    }

    /// Advances to the next value and returns its type, or `None` at the
    /// end of the current container or of the available input.
    pub fn next(&mut self) -> IonResult<Option<IonType>> {
        if !self.has_next()? {
            return Ok(None);
        }
        self.pending = false;
        self.state = ReaderState::BeforeValue;
        Ok(self.current.as_ref().map(|h| h.ion_type))
    }

    pub fn step_in(&mut self) -> IonResult<()> {
        let header = match self.header() {
            Some(h) if self.state == ReaderState::BeforeValue => h,
            _ => return Err(IonError::usage("step_in requires a current container value")),
        };
        if !header.ion_type.is_container() || header.is_null {
            return Err(IonError::usage(format!(
                "cannot step into {}{}",
                if header.is_null { "null." } else { "" },
                header.ion_type
            )));
        }
        let ion_type = header.ion_type;
        let end = header.end();
        self.stack.push(ContainerFrame {
            parent_type: self.container_type,
            resume_position: end,
            parent_end: self.container_end,
            symbols: self.symbols.clone(),
        });
        self.container_type = Some(ion_type);
        self.container_end = Some(end);
        self.current = None;
        self.state = if ion_type == IonType::Struct {
            ReaderState::BeforeField
        } else {
            ReaderState::BeforeTypeId
        };
        trace!("step_in {ion_type} at depth {}", self.stack.len());
        Ok(())
    }

    pub fn step_out(&mut self) -> IonResult<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(IonError::usage("step_out at top level"));
        };
        let position = self.input.position();
        if position > frame.resume_position {
            return Err(IonError::format(
                "container end lies before the current position",
                position,
            ));
        }
        self.skip_exact(frame.resume_position - position)?;
        self.container_type = frame.parent_type;
        self.container_end = frame.parent_end;
        self.symbols = frame.symbols;
        self.current = None;
        self.pending = false;
        self.state = ReaderState::AfterValue;
        trace!("step_out to depth {}", self.stack.len());
        Ok(())
    }

    fn finish_current(&mut self) -> IonResult<()> {
        if let Some(header) = self.current.take() {
            if header.synthetic_sid.is_none() {
                let position = self.input.position();
                if header.end() > position {
                    self.skip_exact(header.end() - position)?;
                }
            }
        }
        Ok(())
    }

    fn at_top_level(&self) -> bool {
        self.container_type.is_none()
    }

    fn prepare_next(&mut self) -> IonResult<Prepared> {
        let start = self.input.position();
        if let Some(end) = self.container_end {
            if start >= end {
                return Ok(Prepared::End);
            }
        }
        let field_id = if self.is_in_struct() {
            self.state = ReaderState::BeforeField;
            Some(self.read_var_uint()?)
        } else {
            None
        };
        self.state = ReaderState::BeforeTypeId;
        let Some(byte) = self.next_header_byte(field_id.is_none())? else {
            return Ok(Prepared::End);
        };
        let descriptor = TypeDescriptor::decode(byte);

        if descriptor.is_nop_pad() {
            let len = self.read_length(&descriptor)?;
            let position = self.input.position();
            self.check_bound(position + len, position)?;
            self.skip_exact(len)?;
            trace!("skipped {len} bytes of padding at {start}");
            return Ok(Prepared::Skipped);
        }
        if descriptor.is_ivm_start() && self.at_top_level() && field_id.is_none() {
            return self.read_version_marker(start);
        }
        if !descriptor.is_valid {
            return Err(IonError::format(
                format!("invalid type descriptor 0x{byte:02x}"),
                self.input.position() - 1,
            ));
        }

        let mut annotations = Vec::new();
        let mut wrapper_end = None;
        let descriptor = if descriptor.is_annotation_wrapper() {
            let (inner, end) = self.read_annotation_wrapper(&descriptor, &mut annotations)?;
            wrapper_end = Some(end);
            inner
        } else {
            descriptor
        };

        let len = self.read_length(&descriptor)?;
        let content_start = self.input.position();
        let end = content_start + len;
        if let Some(wrapper_end) = wrapper_end {
            if wrapper_end != end {
                return Err(IonError::format(
                    format!("annotation wrapper ends at {wrapper_end} but its value ends at {end}"),
                    start,
                ));
            }
        }
        self.check_bound(end, start)?;
        let ion_type = descriptor.ion_type().ok_or_else(|| {
            IonError::format(format!("invalid type descriptor 0x{:02x}", descriptor.byte), start)
        })?;
        let header = ValueHeader {
            descriptor,
            ion_type,
            is_null: descriptor.is_null(),
            field_id,
            annotations,
            start,
            content_start,
            content_len: len,
            synthetic_sid: None,
        };

        if self.at_top_level()
            && ion_type == IonType::Struct
            && !header.is_null
            && header.annotations.first() == Some(&SID_ION_SYMBOL_TABLE)
        {
            return self.install_local_symbol_table(header);
        }
        Ok(Prepared::Value(header))
    }

    fn read_version_marker(&mut self, start: u64) -> IonResult<Prepared> {
        let mut rest = [0u8; 3];
        if self.input.read_bytes(&mut rest)? < rest.len() {
            return Err(IonError::Truncated {
                position: self.input.position(),
            });
        }
        if rest != ION_1_0_IVM[1..] {
            return Err(IonError::format(
                format!("unsupported version marker e0 {:02x} {:02x} {:02x}", rest[0], rest[1], rest[2]),
                start,
            ));
        }
        debug!("version marker at {start}; symbol table reset to system");
        self.symbols = Arc::new(SymbolTable::system());
        if !self.options.surface_system_values {
            return Ok(Prepared::Skipped);
        }
        Ok(Prepared::Value(ValueHeader {
            descriptor: TypeDescriptor::decode(Type::SYMBOL << 4),
            ion_type: IonType::Symbol,
            is_null: false,
            field_id: None,
            annotations: Vec::new(),
            start,
            content_start: start + 4,
            content_len: 0,
            synthetic_sid: Some(SID_ION_1_0),
        }))
    }

    fn read_annotation_wrapper(
        &mut self,
        wrapper: &TypeDescriptor,
        annotations: &mut Vec<u32>,
    ) -> IonResult<(TypeDescriptor, u64)> {
        let wrapper_len = self.read_length(wrapper)?;
        let wrapper_start = self.input.position();
        let wrapper_end = wrapper_start + wrapper_len;
        self.check_bound(wrapper_end, wrapper_start)?;
        let annot_len = self.read_var_uint()? as u64;
        let annot_start = self.input.position();
        if annot_len == 0 {
            return Err(IonError::format("annotation wrapper without annotations", annot_start));
        }
        let annot_end = annot_start + annot_len;
        if annot_end >= wrapper_end {
            return Err(IonError::format(
                "annotations overrun their wrapper",
                annot_start,
            ));
        }
        while self.input.position() < annot_end {
            annotations.push(self.read_var_uint()?);
        }
        if self.input.position() != annot_end {
            return Err(IonError::format(
                "annotation list length does not match its SIDs",
                annot_start,
            ));
        }
        let Some(byte) = self.next_header_byte(false)? else {
            return Err(IonError::Truncated {
                position: self.input.position(),
            });
        };
        let inner = TypeDescriptor::decode(byte);
        if inner.type_code == Type::ANNOTATION {
            return Err(IonError::format("nested annotation wrapper", annot_end));
        }
        if inner.is_nop_pad() {
            return Err(IonError::format("annotation wrapper around padding", annot_end));
        }
        if !inner.is_valid {
            return Err(IonError::format(
                format!("invalid type descriptor 0x{byte:02x}"),
                annot_end,
            ));
        }
        Ok((inner, wrapper_end))
    }

    fn install_local_symbol_table(&mut self, header: ValueHeader) -> IonResult<Prepared> {
        let bytes = self.read_exact_vec(header.content_len, header.content_start)?;
        let table = symtab::load_local_symbol_table(
            &bytes,
            header.content_start,
            &self.symbols,
            self.options.catalog.clone(),
        )?;
        debug!(
            "installed local symbol table at {} (max id {})",
            header.start,
            table.max_id()
        );
        self.symbols = Arc::new(table);
        if !self.options.surface_system_values {
            return Ok(Prepared::Skipped);
        }
        self.input.push_back(bytes);
        Ok(Prepared::Value(header))
    }

    // ------------------------------------------------------------ Byte level

    /// Reads a header byte. End of input is legal only at top level before
    /// a value starts.
    fn next_header_byte(&mut self, eof_allowed: bool) -> IonResult<Option<u8>> {
        let position = self.input.position();
        if let Some(end) = self.container_end {
            if position >= end {
                return Err(IonError::format("value overruns its container", position));
            }
        }
        match self.input.next_byte()? {
            Some(b) => Ok(Some(b)),
            None if eof_allowed && self.at_top_level() => Ok(None),
            None => Err(IonError::Truncated { position }),
        }
    }

    fn read_var_uint(&mut self) -> IonResult<u32> {
        let start = self.input.position();
        let mut cursor = VarUIntCursor::new();
        loop {
            let Some(byte) = self.next_header_byte(false)? else {
                return Err(IonError::Truncated {
                    position: self.input.position(),
                });
            };
            match cursor.push(byte) {
                Step::Continue => {}
                Step::Complete => return Ok(cursor.value as u32),
                Step::Overflow => return Err(IonError::IntegerOverflow { position: start }),
            }
        }
    }

    fn read_length(&mut self, descriptor: &TypeDescriptor) -> IonResult<u64> {
        match descriptor.length {
            LengthKind::Null => Ok(0),
            LengthKind::Inline(n) => Ok(n as u64),
            LengthKind::VarUInt => {
                let position = self.input.position();
                let len = self.read_var_uint()? as u64;
                if descriptor.type_code == Type::STRUCT
                    && descriptor.length_code == LengthCode::ORDERED_STRUCT
                    && len == 0
                {
                    return Err(IonError::format("ordered struct must not be empty", position));
                }
                Ok(len)
            }
        }
    }

    fn check_bound(&self, end: u64, position: u64) -> IonResult<()> {
        match self.container_end {
            Some(container_end) if end > container_end => Err(IonError::format(
                format!("value ending at {end} overruns its container ending at {container_end}"),
                position,
            )),
            _ => Ok(()),
        }
    }

    fn skip_exact(&mut self, n: u64) -> IonResult<()> {
        let skipped = self.input.skip_bytes(n)?;
        if skipped < n {
            return Err(IonError::Truncated {
                position: self.input.position(),
            });
        }
        Ok(())
    }

    fn read_exact_vec(&mut self, len: u64, position: u64) -> IonResult<Vec<u8>> {
        let len = usize::try_from(len)
            .map_err(|_| IonError::ResourceLimit(format!("value of {len} bytes at {position}")))?;
        let mut bytes = vec![0u8; len];
        if self.input.read_bytes(&mut bytes)? < len {
            return Err(IonError::Truncated {
                position: self.input.position(),
            });
        }
        Ok(bytes)
    }

    // ---------------------------------------------------------- Typed getters

    fn expect(&self, expected: &[IonType]) -> IonResult<&ValueHeader> {
        let header = self
            .header()
            .ok_or_else(|| IonError::usage("no current value; call next() first"))?;
        if !expected.contains(&header.ion_type) {
            return Err(IonError::usage(format!(
                "current value is {}, not {}",
                header.ion_type, expected[0]
            )));
        }
        if header.is_null {
            return Err(IonError::usage(format!("current value is null.{}", header.ion_type)));
        }
        Ok(header)
    }

    fn take_content(&mut self, expected: &[IonType]) -> IonResult<(Vec<u8>, u64, u8)> {
        let header = self.expect(expected)?;
        if self.state != ReaderState::BeforeValue {
            return Err(IonError::usage("value content was already read"));
        }
        let (len, position, type_code) = (
            header.content_len,
            header.content_start,
            header.descriptor.type_code,
        );
        let bytes = self.read_exact_vec(len, position)?;
        self.state = ReaderState::AfterValue;
        Ok((bytes, position, type_code))
    }

    pub fn read_bool(&mut self) -> IonResult<bool> {
        let header = self.expect(&[IonType::Bool])?;
        let value = header.descriptor.bool_value().ok_or_else(|| {
            IonError::format(
                format!("invalid bool descriptor 0x{:02x}", header.descriptor.byte),
                header.start,
            )
        })?;
        self.state = ReaderState::AfterValue;
        Ok(value)
    }

    pub fn read_int(&mut self) -> IonResult<Int> {
        let (bytes, position, type_code) = self.take_content(&[IonType::Int])?;
        scalars::int(type_code, &bytes, position)
    }

    pub fn read_i64(&mut self) -> IonResult<i64> {
        let value = self.read_int()?;
        value
            .as_i64()
            .ok_or_else(|| IonError::usage(format!("int {value} does not fit in i64")))
    }

    pub fn read_f64(&mut self) -> IonResult<f64> {
        let (bytes, position, _) = self.take_content(&[IonType::Float])?;
        scalars::float(&bytes, position)
    }

    pub fn read_decimal(&mut self) -> IonResult<Decimal> {
        let (bytes, position, _) = self.take_content(&[IonType::Decimal])?;
        scalars::decimal(&bytes, position)
    }

    pub fn read_timestamp(&mut self) -> IonResult<Timestamp> {
        let (bytes, position, _) = self.take_content(&[IonType::Timestamp])?;
        scalars::timestamp(&bytes, position)
    }

    pub fn read_symbol_id(&mut self) -> IonResult<u32> {
        let synthetic = self.expect(&[IonType::Symbol])?.synthetic_sid;
        if let Some(sid) = synthetic {
            self.state = ReaderState::AfterValue;
            return Ok(sid);
        }
        let (bytes, position, _) = self.take_content(&[IonType::Symbol])?;
        scalars::symbol_id(&bytes, position)
    }

    /// Text of the current symbol value; `None` for unknown text.
    pub fn read_symbol(&mut self) -> IonResult<Option<String>> {
        let position = self.expect(&[IonType::Symbol])?.content_start;
        let sid = self.read_symbol_id()?;
        Ok(self.resolve(sid, position)?.map(str::to_owned))
    }

    pub fn read_string(&mut self) -> IonResult<String> {
        let (bytes, position, _) = self.take_content(&[IonType::String])?;
        scalars::string(bytes, position)
    }

    pub fn read_clob(&mut self) -> IonResult<Vec<u8>> {
        Ok(self.take_content(&[IonType::Clob])?.0)
    }

    pub fn read_blob(&mut self) -> IonResult<Vec<u8>> {
        Ok(self.take_content(&[IonType::Blob])?.0)
    }

    /// Content of the current clob or blob.
    pub fn read_lob(&mut self) -> IonResult<Vec<u8>> {
        Ok(self.take_content(&[IonType::Blob, IonType::Clob])?.0)
    }

    /// Byte length of the current clob or blob without reading it.
    pub fn lob_size(&self) -> IonResult<u64> {
        Ok(self.expect(&[IonType::Blob, IonType::Clob])?.content_len)
    }
}
