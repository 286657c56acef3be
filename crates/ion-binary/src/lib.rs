//! Binary Ion 1.0 codec: a pull reader, a writer with deferred length
//! headers, and a lookahead buffer for streams that arrive in pieces.
//!
//! # Overview
//!
//! - [`BinaryReader`] - Walks values over any [`ByteSource`], resolving
//!   symbols through local symbol tables found in the stream
//! - [`BinaryWriter`] - Buffers values, back-patches container lengths and
//!   injects local symbol table declarations before the values using them
//! - [`LookaheadBuffer`] - Stages input until a whole top-level value has
//!   arrived, skipping values that exceed the configured maximum
//!
//! # Example
//!
//! ```
//! use ion_binary::{BinaryReader, BinaryWriter, IonType, WriterOptions};
//!
//! let mut writer = BinaryWriter::to_vec(WriterOptions::default());
//! writer.step_in(IonType::Struct).unwrap();
//! writer.set_field_name("greeting");
//! writer.write_string("hello").unwrap();
//! writer.step_out().unwrap();
//! writer.finish().unwrap();
//! let bytes = writer.into_inner();
//!
//! let mut reader = BinaryReader::from_slice(&bytes);
//! assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
//! reader.step_in().unwrap();
//! assert_eq!(reader.next().unwrap(), Some(IonType::String));
//! assert_eq!(reader.field_name().unwrap(), Some("greeting"));
//! assert_eq!(reader.read_string().unwrap(), "hello");
//! ```

pub mod constants;
pub mod error;
pub mod int_codec;
pub mod lookahead;
pub mod reader;
pub mod symbols;
pub mod type_descriptor;
pub mod types;
pub mod var_int;
pub mod writer;

pub use error::{IonError, IonResult};
pub use lookahead::{BufferConfiguration, LookaheadBuffer, LookaheadState};
pub use reader::{
    read_shared_symbol_table, BinaryReader, ByteSource, ReaderOptions, ReaderState, SliceSource,
    StreamSource,
};
pub use symbols::{Catalog, Import, SharedSymbolTable, SimpleCatalog, SymbolTable, SymbolTableKind};
pub use types::{Decimal, Int, IonType, Timestamp, TimestampPrecision};
pub use writer::{write_shared_symbol_table, BinaryWriter, WriterOptions};
