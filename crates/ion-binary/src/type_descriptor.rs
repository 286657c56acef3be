//! Type descriptor byte codec.
//!
//! A descriptor splits into a 4-bit type code and a 4-bit length nibble.
//! Nibbles 0..=13 are a literal content length, 14 means a VarUInt length
//! follows and 15 marks a typed null. Two types overload the nibble: bools
//! carry their value in it, and a struct with nibble 1 has sorted fields and
//! a VarUInt length (a struct can never be exactly one byte long).

use crate::constants::{LengthCode, Type};
use crate::types::IonType;
use crate::var_int::{encode_var_uint, var_uint_len};

/// How the content length of a value is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthKind {
    /// Length is the given number of bytes and needs nothing further.
    Inline(u8),
    /// Length is a VarUInt following the descriptor.
    VarUInt,
    /// Typed null; no content.
    Null,
}

/// A decoded type descriptor byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub byte: u8,
    pub type_code: u8,
    pub length_code: u8,
    pub length: LengthKind,
    /// False for descriptors that can never appear on the wire.
    pub is_valid: bool,
}

impl TypeDescriptor {
    /// Decodes a descriptor byte. Never fails: invalid descriptors are
    /// reported through [`is_valid`](Self::is_valid).
    pub const fn decode(byte: u8) -> Self {
        let type_code = byte >> 4;
        let length_code = byte & 0x0f;
        let length = if length_code == LengthCode::NULL {
            LengthKind::Null
        } else if length_code == LengthCode::VAR_UINT {
            LengthKind::VarUInt
        } else if type_code == Type::BOOL {
            LengthKind::Inline(0)
        } else if type_code == Type::STRUCT && length_code == LengthCode::ORDERED_STRUCT {
            LengthKind::VarUInt
        } else {
            LengthKind::Inline(length_code)
        };
        let is_valid = match type_code {
            Type::RESERVED => false,
            Type::BOOL => length_code <= LengthCode::BOOL_TRUE || length_code == LengthCode::NULL,
            Type::FLOAT => matches!(length_code, 0 | 4 | 8 | LengthCode::NULL),
            // Only the IVM (0xE0) and wrappers long enough to hold an
            // annotation length, one SID and a value are legal.
            Type::ANNOTATION => {
                length_code == 0 || (length_code >= 3 && length_code != LengthCode::NULL)
            }
            _ => true,
        };
        Self {
            byte,
            type_code,
            length_code,
            length,
            is_valid,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.length, LengthKind::Null)
    }

    /// A null-typed descriptor without the null nibble marks padding.
    pub fn is_nop_pad(&self) -> bool {
        self.type_code == Type::NULL && self.length_code != LengthCode::NULL
    }

    pub fn is_annotation_wrapper(&self) -> bool {
        self.type_code == Type::ANNOTATION && self.length_code != 0
    }

    /// First byte of the version marker.
    pub fn is_ivm_start(&self) -> bool {
        self.byte == 0xe0
    }

    pub fn ion_type(&self) -> Option<IonType> {
        IonType::from_type_code(self.type_code)
    }

    /// Value of a bool descriptor.
    pub fn bool_value(&self) -> Option<bool> {
        match (self.type_code, self.length_code) {
            (Type::BOOL, LengthCode::BOOL_FALSE) => Some(false),
            (Type::BOOL, LengthCode::BOOL_TRUE) => Some(true),
            _ => None,
        }
    }
}

/// Encoded header bytes (descriptor plus optional VarUInt length).
#[derive(Debug, Clone, Copy)]
pub struct EncodedHeader {
    buf: [u8; 11],
    len: usize,
}

impl EncodedHeader {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for EncodedHeader {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Whether a value of `length` content bytes needs a VarUInt length.
#[inline]
fn needs_var_uint(type_code: u8, length: usize) -> bool {
    length > LengthCode::MAX_INLINE as usize || (type_code == Type::STRUCT && length == 1)
}

/// Encodes the smallest header for a value of `type_code` with `length`
/// content bytes.
pub fn encode_header(type_code: u8, length: usize) -> EncodedHeader {
    let mut buf = [0u8; 11];
    if needs_var_uint(type_code, length) {
        buf[0] = (type_code << 4) | LengthCode::VAR_UINT;
        let var_uint = encode_var_uint(length as u64);
        let bytes = var_uint.as_slice();
        buf[1..1 + bytes.len()].copy_from_slice(bytes);
        EncodedHeader {
            buf,
            len: 1 + bytes.len(),
        }
    } else {
        buf[0] = (type_code << 4) | length as u8;
        EncodedHeader { buf, len: 1 }
    }
}

/// Size of the header [`encode_header`] would produce.
pub fn header_len(type_code: u8, length: usize) -> usize {
    if needs_var_uint(type_code, length) {
        1 + var_uint_len(length as u64)
    } else {
        1
    }
}

/// Descriptor byte of a typed null.
pub const fn null_descriptor(type_code: u8) -> u8 {
    (type_code << 4) | LengthCode::NULL
}

/// Descriptor byte of a bool.
pub const fn bool_descriptor(value: bool) -> u8 {
    let nibble = if value {
        LengthCode::BOOL_TRUE
    } else {
        LengthCode::BOOL_FALSE
    };
    (Type::BOOL << 4) | nibble
}
