//! Byte buffer utilities for the Ion binary codec.
//!
//! # Overview
//!
//! - [`Reader`] - Reads binary data from a byte slice with cursor tracking
//! - [`Writer`] - Writes binary data to an auto-growing buffer
//! - [`ResizingPipe`] - A growable byte pipe with a consumer-visible boundary,
//!   used to stage input until a complete value is available
//!
//! # Example
//!
//! ```
//! use ion_buffers::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.u8(0x01);
//! writer.u16(0x0203);
//! writer.utf8("hello");
//! let data = writer.flush();
//!
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.u8(), Ok(0x01));
//! assert_eq!(reader.u16(), Ok(0x0203));
//! assert_eq!(reader.buf(5), Ok(&b"hello"[..]));
//! ```

mod pipe;
mod reader;
mod writer;

pub use pipe::ResizingPipe;
pub use reader::Reader;
pub use writer::Writer;

/// Error type for buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    EndOfBuffer,
    /// Invalid UTF-8 sequence.
    InvalidUtf8,
    /// Growing would exceed the configured maximum capacity.
    CapacityExceeded,
    /// An index range violates the buffer's read/write constraints.
    InvalidRange,
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::EndOfBuffer => write!(f, "end of buffer"),
            BufferError::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            BufferError::CapacityExceeded => write!(f, "maximum buffer capacity exceeded"),
            BufferError::InvalidRange => write!(f, "index range violates buffer constraints"),
        }
    }
}

impl std::error::Error for BufferError {}
