//! Incremental buffering of top-level values from a non-blocking input.
//!
//! A [`LookaheadBuffer`] pulls bytes from its input into a
//! [`ResizingPipe`] and only makes them visible once a complete top-level
//! user value (and any system values before it) has arrived. Callers alternate
//! [`fill_input`](LookaheadBuffer::fill_input) with reading, and may only
//! read once [`more_data_required`](LookaheadBuffer::more_data_required)
//! returns `false`. The buffer itself implements [`ByteSource`], so a
//! [`BinaryReader`](crate::reader::BinaryReader) can sit on top of it for the
//! lifetime of the stream.
//!
//! Values larger than the maximum buffer size are skipped straight from the
//! input and reported once through the configured handler. NOP padding is
//! reclaimed before concluding that a value does not fit.

mod config;

pub use config::{
    BufferConfiguration, OversizedHandler, DEFAULT_INITIAL_BUFFER_SIZE, MINIMUM_BUFFER_SIZE,
};

use std::io::{self, Read};
use std::ops::Range;

use ion_buffers::ResizingPipe;
use log::{debug, warn};

use crate::constants::{Type, MAXIMUM_VALUE_SIZE, SID_ION_SYMBOL_TABLE};
use crate::error::{IonError, IonResult};
use crate::reader::ByteSource;
use crate::type_descriptor::{LengthKind, TypeDescriptor};
use crate::var_int::{Step, VarUIntCursor};

/// Progress through the current top-level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadState {
    /// Between values.
    BeforeTypeId,
    ReadingTypeId,
    /// Reading a VarUInt length or annotation header field.
    ReadingHeader,
    /// Waiting for the rest of a value's bytes.
    SkippingValue,
    /// Inside a wrapper whose first annotation is `$ion_symbol_table`.
    ReadingValueWithSymbolTableAnnotation,
    ReadingSymbolTableLength,
    /// A symbol table was too large to buffer. Nothing more is read.
    Done,
}

/// Which header field the in-progress VarUInt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarUIntLocation {
    ValueLength,
    AnnotationWrapperLength,
    AnnotationWrapperSidsLength,
    AnnotationWrapperSid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeIdResult {
    NoData,
    Struct,
    NotStruct,
}

/// Buffers complete top-level values from `R`.
///
/// Reading from the input returning `Ok(0)` is taken to mean "no data
/// available yet", so the same buffer can be filled again once more bytes
/// arrive.
pub struct LookaheadBuffer<R> {
    input: R,
    pipe: ResizingPipe,
    page_size: usize,
    maximum_size: usize,
    oversized_value_handler: Option<OversizedHandler>,
    oversized_symbol_table_handler: Option<OversizedHandler>,
    state: LookaheadState,
    cursor: VarUIntCursor,
    location: VarUIntLocation,
    additional_bytes_needed: u64,
    annotation_sid_bytes_remaining: u64,
    is_system_value: bool,
    descriptor: Option<TypeDescriptor>,
    /// Index the pipe is truncated back to when the value is skipped.
    value_start: usize,
    value_pre_header: Option<usize>,
    value_post_header: Option<usize>,
    value_end: Option<usize>,
    nop_pad_start: Option<usize>,
    symbol_table_markers: Vec<Range<usize>>,
    /// Next byte index the header parser will look at; tracks the boundary.
    peek_index: usize,
    skipping: bool,
    notify_pending: bool,
    consumed: u64,
}

impl<R> std::fmt::Debug for LookaheadBuffer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookaheadBuffer")
            .field("state", &self.state)
            .field("available", &self.pipe.available())
            .field("capacity", &self.pipe.capacity())
            .field("skipping", &self.skipping)
            .finish_non_exhaustive()
    }
}

impl<R: Read> LookaheadBuffer<R> {
    pub fn new(config: BufferConfiguration, input: R) -> IonResult<Self> {
        config.validate()?;
        let page_size = config.initial_buffer_size();
        let maximum_size = config.maximum_buffer_size();
        let (oversized_value_handler, oversized_symbol_table_handler) = config.into_handlers();
        Ok(Self {
            input,
            pipe: ResizingPipe::with_limits(page_size, maximum_size, true),
            page_size,
            maximum_size,
            oversized_value_handler,
            oversized_symbol_table_handler,
            state: LookaheadState::BeforeTypeId,
            cursor: VarUIntCursor::new(),
            location: VarUIntLocation::ValueLength,
            additional_bytes_needed: 0,
            annotation_sid_bytes_remaining: 0,
            is_system_value: false,
            descriptor: None,
            value_start: 0,
            value_pre_header: None,
            value_post_header: None,
            value_end: None,
            nop_pad_start: None,
            symbol_table_markers: Vec::new(),
            peek_index: 0,
            skipping: false,
            notify_pending: true,
            consumed: 0,
        })
    }

    pub fn state(&self) -> LookaheadState {
        self.state
    }

    /// True until a complete top-level value is buffered and unread.
    pub fn more_data_required(&self) -> bool {
        self.pipe.available() == 0 || self.state != LookaheadState::BeforeTypeId
    }

    /// Buffered bytes visible to readers.
    pub fn available(&self) -> usize {
        self.pipe.available()
    }

    pub fn capacity(&self) -> usize {
        self.pipe.capacity()
    }

    /// Buffer indices of the most recently completed value, header included.
    pub fn value_range(&self) -> Option<Range<usize>> {
        Some(self.value_pre_header?..self.value_end?)
    }

    /// Buffer index where the current value's content starts.
    pub fn value_content_start(&self) -> Option<usize> {
        self.value_post_header
    }

    /// Content ranges of symbol tables seen since the last version marker.
    pub fn symbol_table_ranges(&self) -> &[Range<usize>] {
        &self.symbol_table_markers
    }

    pub fn input(&self) -> &R {
        &self.input
    }

    /// Gives access to the input, e.g. to append newly arrived bytes.
    pub fn input_mut(&mut self) -> &mut R {
        &mut self.input
    }

    pub fn into_input(self) -> R {
        self.input
    }

    /// Reads from the input until a complete top-level value is buffered or
    /// the input has no more bytes for now.
    pub fn fill_input(&mut self) -> IonResult<()> {
        if self.state == LookaheadState::Done {
            return Ok(());
        }
        if matches!(self.nop_pad_start, Some(start) if start < self.pipe.read_index()) {
            self.nop_pad_start = None;
        }
        loop {
            if matches!(
                self.state,
                LookaheadState::BeforeTypeId | LookaheadState::ReadingTypeId
            ) {
                self.reset();
                self.state = LookaheadState::ReadingTypeId;
                if self.read_type_id(true)? != TypeIdResult::NoData {
                    let header = self.peek_index.saturating_sub(1);
                    self.value_pre_header = Some(header);
                    self.value_post_header = Some(self.peek_index);
                    self.value_start = header;
                }
            }
            if self.state == LookaheadState::ReadingHeader {
                self.read_header()?;
                if !self.cursor.complete {
                    return Ok(());
                }
                self.value_post_header = Some(self.peek_index);
            }
            if self.state == LookaheadState::ReadingValueWithSymbolTableAnnotation {
                while self.annotation_sid_bytes_remaining > 0 {
                    let skipped = self.skip(self.annotation_sid_bytes_remaining)?;
                    if skipped < 1 {
                        return Ok(());
                    }
                    self.annotation_sid_bytes_remaining -= skipped;
                    self.additional_bytes_needed =
                        self.additional_bytes_needed.saturating_sub(skipped);
                }
                let result = self.read_type_id(false)?;
                if result == TypeIdResult::NoData {
                    return Ok(());
                }
                self.additional_bytes_needed = self.additional_bytes_needed.saturating_sub(1);
                self.state = if result == TypeIdResult::Struct {
                    LookaheadState::ReadingSymbolTableLength
                } else {
                    LookaheadState::SkippingValue
                };
            }
            if self.state == LookaheadState::ReadingSymbolTableLength {
                self.is_system_value = true;
                if self.location == VarUIntLocation::ValueLength {
                    self.read_var_uint()?;
                    if !self.cursor.complete {
                        return Ok(());
                    }
                    self.additional_bytes_needed = self.cursor.value;
                }
                let start = self.peek_index;
                self.symbol_table_markers
                    .push(start..start + self.additional_bytes_needed as usize);
                self.state = LookaheadState::SkippingValue;
            }
            if self.state == LookaheadState::SkippingValue {
                let is_nop_pad = self.descriptor.is_some_and(|d| d.is_nop_pad());
                let staged = self.pipe.available_beyond_boundary() as u64;
                if is_nop_pad && staged <= self.additional_bytes_needed {
                    // Padding is dropped rather than buffered.
                    self.additional_bytes_needed -= staged;
                    self.start_skipping_value();
                    self.notify_pending = false;
                }
                while self.additional_bytes_needed > 0 {
                    let skipped = self.skip(self.additional_bytes_needed)?;
                    if skipped < 1 {
                        return Ok(());
                    }
                    self.additional_bytes_needed -= skipped;
                }
                self.state = LookaheadState::BeforeTypeId;
            }
            if self.state == LookaheadState::BeforeTypeId {
                self.value_end = Some(self.peek_index);
                let is_nop_pad = self.descriptor.is_some_and(|d| d.is_nop_pad());
                if self.is_system_value || self.skipping || is_nop_pad {
                    if is_nop_pad && self.nop_pad_start.is_none() {
                        self.nop_pad_start = self.value_pre_header;
                    }
                    if self.is_system_value && self.skipping {
                        warn!("symbol table exceeds the maximum buffer size; stopping");
                        self.reset();
                        self.state = LookaheadState::Done;
                    } else {
                        if self.is_system_value && self.nop_pad_start.is_some() {
                            self.reclaim_nop_padding()?;
                        }
                        continue;
                    }
                }
            }
            return Ok(());
        }
    }

    fn reset(&mut self) {
        self.additional_bytes_needed = 0;
        self.annotation_sid_bytes_remaining = 0;
        self.is_system_value = false;
        self.descriptor = None;
        self.value_pre_header = None;
        self.value_post_header = None;
        self.value_end = None;
        self.value_start = self.peek_index;
        self.skipping = false;
    }

    fn initialize_var_uint(&mut self, location: VarUIntLocation) {
        self.cursor.reset();
        self.location = location;
        self.state = LookaheadState::ReadingHeader;
    }

    fn read_type_id(&mut self, unannotated: bool) -> IonResult<TypeIdResult> {
        let Some(byte) = self.read_byte()? else {
            return Ok(TypeIdResult::NoData);
        };
        let descriptor = TypeDescriptor::decode(byte);
        self.descriptor = Some(descriptor);
        if descriptor.is_ivm_start() {
            if !unannotated {
                return Err(self.format_error("version marker inside an annotation wrapper"));
            }
            self.additional_bytes_needed = 3;
            self.is_system_value = true;
            self.symbol_table_markers.clear();
            self.state = LookaheadState::SkippingValue;
        } else if !descriptor.is_valid {
            return Err(self.format_error(format!("invalid type descriptor 0x{byte:02x}")));
        } else if !unannotated && (descriptor.is_nop_pad() || descriptor.is_annotation_wrapper()) {
            return Err(self.format_error("invalid value inside an annotation wrapper"));
        } else if descriptor.type_code == Type::BOOL || descriptor.is_null() {
            self.state = LookaheadState::BeforeTypeId;
        } else if descriptor.is_annotation_wrapper() {
            match descriptor.length {
                LengthKind::Inline(length) => {
                    self.additional_bytes_needed = length as u64;
                    self.initialize_var_uint(VarUIntLocation::AnnotationWrapperSidsLength);
                }
                _ => self.initialize_var_uint(VarUIntLocation::AnnotationWrapperLength),
            }
        } else {
            match descriptor.length {
                LengthKind::Inline(length) => {
                    if unannotated {
                        self.additional_bytes_needed = length as u64;
                    }
                    self.state = LookaheadState::SkippingValue;
                }
                _ => self.initialize_var_uint(VarUIntLocation::ValueLength),
            }
        }
        Ok(
            if descriptor.type_code == Type::STRUCT && !descriptor.is_null() {
                TypeIdResult::Struct
            } else {
                TypeIdResult::NotStruct
            },
        )
    }

    fn read_header(&mut self) -> IonResult<()> {
        if self.location == VarUIntLocation::ValueLength {
            self.read_var_uint()?;
            if self.cursor.complete {
                self.additional_bytes_needed = self.cursor.value;
                self.state = LookaheadState::SkippingValue;
            }
            return Ok(());
        }
        if self.location == VarUIntLocation::AnnotationWrapperLength {
            self.read_var_uint()?;
            if !self.cursor.complete {
                return Ok(());
            }
            self.additional_bytes_needed = self.cursor.value;
            self.initialize_var_uint(VarUIntLocation::AnnotationWrapperSidsLength);
        }
        if self.location == VarUIntLocation::AnnotationWrapperSidsLength {
            self.read_var_uint()?;
            if !self.cursor.complete {
                return Ok(());
            }
            self.consume_wrapper_bytes(self.cursor.bytes_read as u64)?;
            self.annotation_sid_bytes_remaining = self.cursor.value;
            self.initialize_var_uint(VarUIntLocation::AnnotationWrapperSid);
        }
        if self.location == VarUIntLocation::AnnotationWrapperSid {
            self.read_var_uint()?;
            if !self.cursor.complete {
                return Ok(());
            }
            let bytes_read = self.cursor.bytes_read as u64;
            self.annotation_sid_bytes_remaining = self
                .annotation_sid_bytes_remaining
                .checked_sub(bytes_read)
                .ok_or_else(|| self.format_error("annotation exceeds its declared length"))?;
            self.consume_wrapper_bytes(bytes_read)?;
            self.state = if self.cursor.value == SID_ION_SYMBOL_TABLE as u64 {
                LookaheadState::ReadingValueWithSymbolTableAnnotation
            } else {
                LookaheadState::SkippingValue
            };
        }
        Ok(())
    }

    fn consume_wrapper_bytes(&mut self, n: u64) -> IonResult<()> {
        self.additional_bytes_needed = self
            .additional_bytes_needed
            .checked_sub(n)
            .ok_or_else(|| self.format_error("annotation wrapper too short"))?;
        Ok(())
    }

    fn read_var_uint(&mut self) -> IonResult<()> {
        while let Some(byte) = self.read_byte()? {
            match self.cursor.push(byte) {
                Step::Continue => {}
                Step::Complete => break,
                Step::Overflow => {
                    return Err(IonError::IntegerOverflow {
                        position: self.peek_index as u64,
                    })
                }
            }
        }
        Ok(())
    }

    /// Reads one header byte, filling the pipe if needed. While skipping,
    /// header bytes come straight from the input.
    fn read_byte(&mut self) -> IonResult<Option<u8>> {
        if !self.skipping && self.pipe.available_beyond_boundary() == 0 {
            self.fill_page(1)?;
        }
        if self.skipping {
            return self.read_input_byte();
        }
        let Some(byte) = self.pipe.peek(self.peek_index) else {
            return Ok(None);
        };
        self.pipe.extend_boundary(1);
        self.peek_index += 1;
        Ok(Some(byte))
    }

    /// Passes over up to `n` bytes of the current value, making them visible
    /// or, when the value is being skipped, discarding them. Never passes
    /// over more than `n`; the count includes staged bytes dropped when
    /// skipping starts.
    fn skip(&mut self, n: u64) -> IonResult<u64> {
        if self.skipping {
            return self.skip_oversized(0, n);
        }
        let staged = self.pipe.available_beyond_boundary() as u64;
        if staged < n {
            if self.additional_bytes_needed > MAXIMUM_VALUE_SIZE as u64 {
                return Err(IonError::ResourceLimit(format!(
                    "value of {} bytes exceeds the maximum value size",
                    self.additional_bytes_needed
                )));
            }
            self.fill_page(self.additional_bytes_needed.saturating_sub(staged) as usize)?;
            if self.skipping {
                // The truncation dropped exactly the staged bytes.
                return self.skip_oversized(staged, n);
            }
        }
        let visible = (self.pipe.available_beyond_boundary() as u64).min(n);
        self.pipe.extend_boundary(visible as usize);
        self.peek_index += visible as usize;
        Ok(visible)
    }

    fn skip_oversized(&mut self, dropped: u64, n: u64) -> IonResult<u64> {
        let passed = dropped + self.skip_input(n - dropped)?;
        if passed > 0 {
            self.notify_oversized()?;
        }
        Ok(passed)
    }

    /// Reads a page from the input into the pipe. When the pipe is full and
    /// cannot grow enough for `requested` bytes, reclaims padding or starts
    /// skipping the current value, in which case nothing is read.
    fn fill_page(&mut self, requested: usize) -> IonResult<usize> {
        let mut amount = self.pipe.capacity() - self.pipe.size();
        if amount == 0 {
            let growth = self.maximum_size.saturating_sub(self.pipe.capacity());
            if requested > growth {
                match (self.nop_pad_start, self.value_pre_header) {
                    (Some(nop), Some(header)) if header.saturating_sub(nop) >= requested => {
                        self.reclaim_nop_padding()?;
                    }
                    _ => {
                        self.start_skipping_value();
                        return Ok(0);
                    }
                }
                amount = requested;
            } else {
                amount = self.page_size.min(growth);
            }
        }
        let received = self.pipe.receive_from(&mut self.input, amount)?;
        self.rebase();
        Ok(received)
    }

    fn read_input_byte(&mut self) -> IonResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            return match self.input.read(&mut byte) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
                Err(e) => Err(e.into()),
            };
        }
    }

    fn skip_input(&mut self, n: u64) -> IonResult<u64> {
        match io::copy(&mut (&mut self.input).take(n), &mut io::sink()) {
            Ok(skipped) => Ok(skipped),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Drops the current value's buffered bytes; the rest is skipped from
    /// the input. Callers credit the dropped staged bytes against
    /// `additional_bytes_needed`.
    fn start_skipping_value(&mut self) {
        debug!(
            "skipping value starting at buffer index {} that exceeds {} bytes",
            self.value_start, self.maximum_size
        );
        self.skipping = true;
        self.peek_index = self.value_start;
        let available = self.value_start.saturating_sub(self.pipe.read_index());
        self.pipe.truncate(self.value_start, available);
        self.notify_pending = true;
    }

    fn notify_oversized(&mut self) -> IonResult<()> {
        if !self.notify_pending {
            return Ok(());
        }
        self.notify_pending = false;
        let (handler, what) = if self.is_system_value {
            (&mut self.oversized_symbol_table_handler, "symbol table")
        } else {
            (&mut self.oversized_value_handler, "value")
        };
        match handler {
            Some(handler) => {
                warn!("{what} exceeds the maximum buffer size of {} bytes", self.maximum_size);
                handler();
                Ok(())
            }
            None => Err(IonError::ResourceLimit(format!(
                "{what} exceeds the maximum buffer size of {} bytes",
                self.maximum_size
            ))),
        }
    }

    /// Removes unread NOP padding preceding the current value.
    fn reclaim_nop_padding(&mut self) -> IonResult<()> {
        let (Some(nop), Some(header)) = (self.nop_pad_start, self.value_pre_header) else {
            return Ok(());
        };
        let nop = nop.max(self.pipe.read_index());
        if header > nop {
            self.pipe.consolidate(header, nop)?;
            self.shift_indices_left(Some(nop), header - nop);
        }
        self.nop_pad_start = None;
        Ok(())
    }

    /// Applies a left shift of `shift` bytes to every held index past
    /// `after` (all indices when `after` is `None`).
    fn shift_indices_left(&mut self, after: Option<usize>, shift: usize) {
        let moves = |index: usize| after.map_or(true, |after| index > after);
        let shifted = |index: usize| {
            if moves(index) {
                index.saturating_sub(shift)
            } else {
                index
            }
        };
        self.peek_index = self.peek_index.saturating_sub(shift);
        self.value_start = self.value_start.saturating_sub(shift);
        self.value_pre_header = self.value_pre_header.map(|i| i.saturating_sub(shift));
        self.value_post_header = self.value_post_header.map(|i| i.saturating_sub(shift));
        self.value_end = self.value_end.map(shifted);
        if after.is_none() {
            self.nop_pad_start = self.nop_pad_start.map(|i| i.saturating_sub(shift));
        }
        for marker in &mut self.symbol_table_markers {
            if moves(marker.start) {
                *marker = marker.start.saturating_sub(shift)..marker.end.saturating_sub(shift);
            }
        }
    }

    /// Rebases held indices after the pipe compacted its store.
    fn rebase(&mut self) {
        let shift = self.pipe.take_shift();
        if shift > 0 {
            self.shift_indices_left(None, shift);
        }
    }

    fn format_error(&self, message: impl Into<String>) -> IonError {
        IonError::format(message, self.peek_index as u64)
    }
}

impl<R: Read> ByteSource for LookaheadBuffer<R> {
    fn next_byte(&mut self) -> IonResult<Option<u8>> {
        let byte = self.pipe.read_byte();
        if byte.is_some() {
            self.consumed += 1;
        }
        Ok(byte)
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> IonResult<usize> {
        let n = self.pipe.read(dst);
        self.consumed += n as u64;
        Ok(n)
    }

    fn skip_bytes(&mut self, n: u64) -> IonResult<u64> {
        let n = self.pipe.skip(usize::try_from(n).unwrap_or(usize::MAX)) as u64;
        self.consumed += n;
        Ok(n)
    }

    fn position(&self) -> u64 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::reader::{BinaryReader, ReaderOptions};
    use crate::types::IonType;

    /// An input that yields whatever has been pushed so far.
    #[derive(Clone, Default)]
    struct Feed(Rc<RefCell<VecDeque<u8>>>);

    impl Feed {
        fn push(&self, bytes: &[u8]) {
            self.0.borrow_mut().extend(bytes);
        }
    }

    impl Read for Feed {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut queue = self.0.borrow_mut();
            let n = buf.len().min(queue.len());
            for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    fn counter() -> (Rc<Cell<usize>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = count.clone();
        (count, move || handle.set(handle.get() + 1))
    }

    fn string_value(len: usize) -> Vec<u8> {
        assert!(len < 128);
        let mut bytes = vec![0x8e, 0x80 | len as u8];
        bytes.extend(vec![b'a'; len]);
        bytes
    }

    /// 50 bytes of padding: a descriptor, a one-byte length and 48 zeros.
    fn nop_pad() -> Vec<u8> {
        let mut bytes = vec![0x0e, 0xb0];
        bytes.extend([0u8; 48]);
        bytes
    }

    fn bounded(max: usize) -> BufferConfiguration {
        BufferConfiguration::new()
            .with_initial_buffer_size(max)
            .with_maximum_buffer_size(max)
    }

    #[test]
    fn complete_value_becomes_visible() {
        let data = [0xe0, 0x01, 0x00, 0xea, 0x21, 0x05, 0x21, 0x06];
        let mut lookahead = LookaheadBuffer::new(BufferConfiguration::default(), &data[..]).unwrap();
        assert!(lookahead.more_data_required());
        lookahead.fill_input().unwrap();
        assert!(!lookahead.more_data_required());
        assert_eq!(lookahead.available(), 6);
        assert_eq!(lookahead.value_range(), Some(4..6));

        let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 5);
        assert_eq!(reader.next().unwrap(), None);
        assert!(reader.source().more_data_required());

        reader.source_mut().fill_input().unwrap();
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 6);
    }

    #[test]
    fn partial_value_stays_hidden() {
        let feed = Feed::default();
        let mut lookahead = LookaheadBuffer::new(BufferConfiguration::default(), feed.clone()).unwrap();
        feed.push(&[0xe0, 0x01, 0x00, 0xea, 0x83, b'a']);
        lookahead.fill_input().unwrap();
        assert!(lookahead.more_data_required());
        assert_eq!(lookahead.state(), LookaheadState::SkippingValue);
        feed.push(b"bc");
        lookahead.fill_input().unwrap();
        assert!(!lookahead.more_data_required());
        assert_eq!(lookahead.available(), 8);
    }

    #[test]
    fn nop_pad_is_reclaimed_before_version_marker() {
        // Only ten bytes fit; the padding must go for the int to be buffered.
        let data = [0xe0, 0x01, 0x00, 0xea, 0x03, 0x00, 0x00, 0x00, 0xe0, 0x01, 0x00, 0xea, 0x21, 0x01];
        let (count, handler) = counter();
        let config = bounded(10).on_oversized_value(handler);
        let mut lookahead = LookaheadBuffer::new(config, &data[..]).unwrap();
        lookahead.fill_input().unwrap();
        assert!(!lookahead.more_data_required());
        assert_eq!(count.get(), 0);

        let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 1);
    }

    #[test]
    fn nop_pad_is_reclaimed_for_value_that_fits() {
        let mut data = nop_pad();
        data.extend(string_value(20));
        let (count, handler) = counter();
        let config = bounded(64).on_oversized_value(handler);
        let mut lookahead = LookaheadBuffer::new(config, &data[..]).unwrap();
        lookahead.fill_input().unwrap();
        assert!(!lookahead.more_data_required());
        assert_eq!(count.get(), 0);
        assert_eq!(lookahead.available(), 22);

        let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
        assert_eq!(reader.next().unwrap(), Some(IonType::String));
        assert_eq!(reader.read_string().unwrap(), "a".repeat(20));
    }

    #[test]
    fn oversized_value_is_skipped_and_reported_once() {
        let mut data = nop_pad();
        data.extend(string_value(100));
        data.extend([0x21, 0x07]);
        let (count, handler) = counter();
        let config = bounded(64).on_oversized_value(handler);
        let mut lookahead = LookaheadBuffer::new(config, &data[..]).unwrap();
        lookahead.fill_input().unwrap();
        assert!(!lookahead.more_data_required());
        assert_eq!(count.get(), 1);

        let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 7);
    }

    #[test]
    fn oversized_value_without_handler_fails() {
        let mut data = string_value(100);
        data.extend([0x21, 0x07]);
        let mut lookahead = LookaheadBuffer::new(bounded(16), &data[..]).unwrap();
        assert!(matches!(
            lookahead.fill_input(),
            Err(IonError::ResourceLimit(_))
        ));
    }

    #[test]
    fn oversized_symbol_table_stops_reading() {
        // $ion_symbol_table::{symbols: ["aaaaaaaaaaaaaaaaaaaa"]}, then 7.
        let mut data = vec![0xe0, 0x01, 0x00, 0xea, 0xee, 0x9c, 0x81, 0x83, 0xde, 0x98, 0x87, 0xbe, 0x95];
        data.extend(string_value(19));
        data.extend([0x21, 0x07]);
        let (tables, table_handler) = counter();
        let (values, value_handler) = counter();
        let config = bounded(16)
            .on_oversized_symbol_table(table_handler)
            .on_oversized_value(value_handler);
        let mut lookahead = LookaheadBuffer::new(config, &data[..]).unwrap();
        lookahead.fill_input().unwrap();
        assert_eq!(lookahead.state(), LookaheadState::Done);
        assert_eq!(tables.get(), 1);
        assert_eq!(values.get(), 0);
        assert!(lookahead.more_data_required());
    }

    #[test]
    fn symbol_table_ranges_are_recorded() {
        // $ion_symbol_table::{symbols: ["x"]} then $10.
        let data = [
            0xe0, 0x01, 0x00, 0xea, 0xe7, 0x81, 0x83, 0xd4, 0x87, 0xb2, 0x81, b'x', 0x71, 0x0a,
        ];
        let mut lookahead = LookaheadBuffer::new(BufferConfiguration::default(), &data[..]).unwrap();
        lookahead.fill_input().unwrap();
        assert!(!lookahead.more_data_required());
        assert_eq!(lookahead.symbol_table_ranges(), &[8..12]);

        let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.read_symbol().unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn invalid_descriptor_is_a_format_error() {
        let data = [0xe0, 0x01, 0x00, 0xea, 0xf0];
        let mut lookahead = LookaheadBuffer::new(BufferConfiguration::default(), &data[..]).unwrap();
        assert!(matches!(
            lookahead.fill_input(),
            Err(IonError::Format { .. })
        ));
    }
}
