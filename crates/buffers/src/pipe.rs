//! Growable byte pipe with a consumer-visible boundary.
//!
//! Bytes enter at the write index and leave at the read index. Only bytes
//! below the *boundary* are visible to consumers (`read`, `skip`,
//! `available`); bytes received beyond it are staged until the producer
//! decides they form a complete unit and extends the boundary over them.

use std::io::{self, Read};
use std::ops::Range;

use crate::BufferError;

/// A resizable in-memory pipe.
///
/// Indices returned by [`read_index`](Self::read_index),
/// [`write_index`](Self::write_index) and [`boundary`](Self::boundary) are
/// physical offsets into the backing store. Whenever unread bytes are moved
/// to the front of the store, the amount of the left shift is accumulated and
/// can be collected with [`take_shift`](Self::take_shift) so that callers can
/// rebase any indices they hold.
#[derive(Debug, Clone)]
pub struct ResizingPipe {
    buffer: Vec<u8>,
    initial_size: usize,
    maximum_size: usize,
    use_boundary: bool,
    read_index: usize,
    write_index: usize,
    available: usize,
    size: usize,
    boundary: usize,
    shifted: usize,
}

impl ResizingPipe {
    /// Creates a pipe whose boundary always follows the write index.
    pub fn new(initial_size: usize) -> Self {
        Self::with_limits(initial_size, usize::MAX, false)
    }

    /// Creates a pipe with an explicit maximum capacity.
    ///
    /// When `use_boundary` is true received bytes stay invisible to readers
    /// until [`extend_boundary`](Self::extend_boundary) is called.
    pub fn with_limits(initial_size: usize, maximum_size: usize, use_boundary: bool) -> Self {
        let initial_size = initial_size.max(1);
        Self {
            buffer: vec![0u8; initial_size],
            initial_size,
            maximum_size: maximum_size.max(initial_size),
            use_boundary,
            read_index: 0,
            write_index: 0,
            available: 0,
            size: 0,
            boundary: 0,
            shifted: 0,
        }
    }

    /// Moves unread bytes to the front of `destination`, which becomes the
    /// backing store. Passing the current store (taken out of `self`)
    /// compacts in place.
    fn move_bytes_to_start(&mut self, mut destination: Vec<u8>) {
        if self.size > 0 {
            if self.buffer.is_empty() {
                destination.copy_within(self.read_index..self.read_index + self.size, 0);
            } else {
                destination[..self.size]
                    .copy_from_slice(&self.buffer[self.read_index..self.read_index + self.size]);
            }
        }
        self.shifted += self.read_index;
        self.read_index = 0;
        self.boundary = self.available;
        self.write_index = self.size;
        self.buffer = destination;
    }

    fn free_space_at_end(&self) -> usize {
        self.buffer.len() - self.write_index
    }

    fn ensure_space(&mut self, required: usize) -> Result<(), BufferError> {
        if self.size > 0 && self.free_space_at_end() >= required {
            return Ok(());
        }
        let reclaimable = self.free_space_at_end() + self.read_index;
        if required <= reclaimable {
            let buffer = std::mem::take(&mut self.buffer);
            self.move_bytes_to_start(buffer);
            return Ok(());
        }
        let shortfall = required - reclaimable;
        let capacity = self.buffer.len();
        let mut grow_by = self.initial_size.max(shortfall);
        if capacity + grow_by > self.maximum_size {
            grow_by = shortfall;
            if capacity + grow_by > self.maximum_size {
                return Err(BufferError::CapacityExceeded);
            }
        }
        self.move_bytes_to_start(vec![0u8; capacity + grow_by]);
        Ok(())
    }

    /// Appends bytes to the pipe.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.ensure_space(bytes.len())?;
        let start = self.write_index;
        self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
        self.write_index += bytes.len();
        self.size += bytes.len();
        if !self.use_boundary {
            self.extend_boundary(bytes.len());
        }
        Ok(())
    }

    /// Reads at most `len` bytes from `input` into the pipe.
    ///
    /// Returns the number of bytes received; zero means the input is
    /// exhausted for now. An input reporting `UnexpectedEof` counts as
    /// exhausted.
    pub fn receive_from<R: Read + ?Sized>(&mut self, input: &mut R, len: usize) -> io::Result<usize> {
        self.ensure_space(len)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        let start = self.write_index;
        let received = loop {
            match input.read(&mut self.buffer[start..start + len]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break 0,
                Err(e) => return Err(e),
            }
        };
        self.write_index += received;
        self.size += received;
        if !self.use_boundary {
            self.extend_boundary(received);
        }
        Ok(received)
    }

    /// Consumes up to `dst.len()` visible bytes.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.available);
        dst[..n].copy_from_slice(&self.buffer[self.read_index..self.read_index + n]);
        self.consume(n);
        n
    }

    /// Consumes one visible byte.
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.available == 0 {
            return None;
        }
        let b = self.buffer[self.read_index];
        self.consume(1);
        Some(b)
    }

    /// Discards up to `n` visible bytes and returns how many were discarded.
    pub fn skip(&mut self, n: usize) -> usize {
        let n = n.min(self.available);
        self.consume(n);
        n
    }

    fn consume(&mut self, n: usize) {
        self.read_index += n;
        self.available -= n;
        self.size -= n;
    }

    /// Moves the read index forward to `index`, which must not cross the boundary.
    pub fn seek_to(&mut self, index: usize) {
        let index = index.clamp(self.read_index, self.boundary);
        self.consume(index - self.read_index);
    }

    /// Returns the byte at a physical index, visible or not.
    pub fn peek(&self, index: usize) -> Option<u8> {
        if index >= self.read_index && index < self.write_index {
            Some(self.buffer[index])
        } else {
            None
        }
    }

    /// Bytes at the given physical range.
    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        let start = range.start.clamp(self.read_index, self.write_index);
        let end = range.end.clamp(start, self.write_index);
        &self.buffer[start..end]
    }

    /// Makes `n` more received bytes visible to consumers.
    pub fn extend_boundary(&mut self, n: usize) {
        self.boundary += n;
        self.available += n;
    }

    /// Rolls the write side back to `write_index`, discarding staged bytes.
    pub fn truncate(&mut self, write_index: usize, available: usize) {
        self.write_index = write_index;
        self.available = available;
        self.boundary = write_index;
        self.size = available;
    }

    /// Moves the read index back to a previous position.
    pub fn rewind(&mut self, read_index: usize, available: usize) {
        self.read_index = read_index;
        self.available = available;
        self.boundary = read_index + available;
        self.size = self.write_index - read_index;
    }

    /// Moves every byte from `from` onwards down to `to`, dropping the bytes
    /// in between. Used to reclaim unread filler that precedes staged data.
    pub fn consolidate(&mut self, from: usize, to: usize) -> Result<(), BufferError> {
        if from > self.write_index || from > self.boundary || to < self.read_index || to > from {
            return Err(BufferError::InvalidRange);
        }
        let shift = from - to;
        self.buffer.copy_within(from..self.write_index, to);
        self.size -= shift;
        self.available -= shift;
        self.write_index -= shift;
        self.boundary -= shift;
        Ok(())
    }

    /// Returns and resets the accumulated left shift caused by compaction.
    pub fn take_shift(&mut self) -> usize {
        std::mem::take(&mut self.shifted)
    }

    /// Empties the pipe.
    pub fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
        self.available = 0;
        self.boundary = 0;
        self.size = 0;
    }

    /// Bytes visible to consumers.
    pub fn available(&self) -> usize {
        self.available
    }

    /// Bytes held, visible or staged.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes received but not yet made visible.
    pub fn available_beyond_boundary(&self) -> usize {
        self.size - self.available
    }

    /// Current capacity of the backing store.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Configured maximum capacity.
    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    /// Configured growth step.
    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn boundary(&self) -> usize {
        self.boundary
    }
}
