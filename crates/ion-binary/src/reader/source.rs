//! Byte sources the binary reader pulls from.

use std::io::{self, BufReader, Read};

use ion_buffers::Reader;

use crate::error::IonResult;

/// A forward-only byte stream with position tracking.
///
/// `next_byte` returning `Ok(None)` means no more bytes are available right
/// now; a source backed by an incrementally filled buffer may have more
/// later.
pub trait ByteSource {
    fn next_byte(&mut self) -> IonResult<Option<u8>>;

    /// Fills as much of `dst` as possible and returns the count.
    fn read_bytes(&mut self, dst: &mut [u8]) -> IonResult<usize>;

    /// Discards up to `n` bytes and returns the count.
    fn skip_bytes(&mut self, n: u64) -> IonResult<u64>;

    /// Number of bytes consumed since the start of the stream.
    fn position(&self) -> u64;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> IonResult<Option<u8>> {
        (**self).next_byte()
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> IonResult<usize> {
        (**self).read_bytes(dst)
    }

    fn skip_bytes(&mut self, n: u64) -> IonResult<u64> {
        (**self).skip_bytes(n)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }
}

/// A source over an in-memory byte slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    reader: Reader<'a>,
    base: u64,
}

impl<'a> SliceSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_base(bytes, 0)
    }

    /// A source whose reported positions start at `base`. Used when the
    /// slice was cut out of a larger stream.
    pub fn with_base(bytes: &'a [u8], base: u64) -> Self {
        Self {
            reader: Reader::new(bytes),
            base,
        }
    }

    pub fn remaining(&self) -> usize {
        self.reader.size()
    }
}

impl ByteSource for SliceSource<'_> {
    fn next_byte(&mut self) -> IonResult<Option<u8>> {
        Ok(self.reader.u8().ok())
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> IonResult<usize> {
        Ok(self.reader.copy_to(dst))
    }

    fn skip_bytes(&mut self, n: u64) -> IonResult<u64> {
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        Ok(self.reader.skip_at_most(n) as u64)
    }

    fn position(&self) -> u64 {
        self.base + self.reader.x as u64
    }
}

/// A source over any [`Read`] implementation. Reads block until the
/// underlying reader yields data or reports end of stream.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: BufReader<R>,
    position: u64,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            position: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn next_byte(&mut self) -> IonResult<Option<u8>> {
        let mut byte = [0u8; 1];
        Ok(match self.read_bytes(&mut byte)? {
            0 => None,
            _ => Some(byte[0]),
        })
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> IonResult<usize> {
        let mut filled = 0;
        while filled < dst.len() {
            match self.inner.read(&mut dst[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn skip_bytes(&mut self, n: u64) -> IonResult<u64> {
        let skipped = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        self.position += skipped;
        Ok(skipped)
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// A source with a pushback region served before the wrapped source.
///
/// The reader consumes a local symbol table struct in order to install it,
/// then pushes its content back so the struct can still be surfaced.
#[derive(Debug)]
pub(crate) struct Input<S> {
    source: S,
    pending: Vec<u8>,
    pending_pos: usize,
}

impl<S: ByteSource> Input<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            pending: Vec::new(),
            pending_pos: 0,
        }
    }

    pub(crate) fn push_back(&mut self, bytes: Vec<u8>) {
        debug_assert!(self.pending_pos >= self.pending.len());
        self.pending = bytes;
        self.pending_pos = 0;
    }

    fn pending_len(&self) -> usize {
        self.pending.len() - self.pending_pos
    }

    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub(crate) fn into_source(self) -> S {
        self.source
    }
}

impl<S: ByteSource> ByteSource for Input<S> {
    fn next_byte(&mut self) -> IonResult<Option<u8>> {
        if self.pending_len() > 0 {
            let b = self.pending[self.pending_pos];
            self.pending_pos += 1;
            return Ok(Some(b));
        }
        self.source.next_byte()
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> IonResult<usize> {
        let from_pending = self.pending_len().min(dst.len());
        dst[..from_pending]
            .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + from_pending]);
        self.pending_pos += from_pending;
        if from_pending == dst.len() {
            return Ok(from_pending);
        }
        Ok(from_pending + self.source.read_bytes(&mut dst[from_pending..])?)
    }

    fn skip_bytes(&mut self, n: u64) -> IonResult<u64> {
        let from_pending = (self.pending_len() as u64).min(n);
        self.pending_pos += from_pending as usize;
        if from_pending == n {
            return Ok(n);
        }
        Ok(from_pending + self.source.skip_bytes(n - from_pending)?)
    }

    fn position(&self) -> u64 {
        self.source.position() - self.pending_len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reports_base_offset() {
        let mut source = SliceSource::with_base(&[1, 2, 3], 100);
        assert_eq!(source.next_byte().unwrap(), Some(1));
        assert_eq!(source.position(), 101);
        assert_eq!(source.skip_bytes(5).unwrap(), 2);
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn stream_source_counts_bytes() {
        let data: &[u8] = &[1, 2, 3, 4];
        let mut source = StreamSource::new(data);
        let mut buf = [0u8; 2];
        assert_eq!(source.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(source.skip_bytes(1).unwrap(), 1);
        assert_eq!(source.position(), 3);
        assert_eq!(source.next_byte().unwrap(), Some(4));
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn pushback_is_served_first() {
        let mut input = Input::new(SliceSource::new(&[9, 9, 7, 8]));
        input.skip_bytes(2).unwrap();
        input.push_back(vec![1, 2]);
        assert_eq!(input.position(), 0);
        let mut buf = [0u8; 3];
        assert_eq!(input.read_bytes(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 7]);
        assert_eq!(input.position(), 3);
    }
}
