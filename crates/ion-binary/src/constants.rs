//! Ion 1.0 binary format constants.
#![allow(non_snake_case)]

/// Type codes (high 4 bits of the type descriptor byte).
pub mod Type {
    pub const NULL: u8 = 0x0;
    pub const BOOL: u8 = 0x1;
    pub const POS_INT: u8 = 0x2;
    pub const NEG_INT: u8 = 0x3;
    pub const FLOAT: u8 = 0x4;
    pub const DECIMAL: u8 = 0x5;
    pub const TIMESTAMP: u8 = 0x6;
    pub const SYMBOL: u8 = 0x7;
    pub const STRING: u8 = 0x8;
    pub const CLOB: u8 = 0x9;
    pub const BLOB: u8 = 0xa;
    pub const LIST: u8 = 0xb;
    pub const SEXP: u8 = 0xc;
    pub const STRUCT: u8 = 0xd;
    pub const ANNOTATION: u8 = 0xe;
    /// Reserved; never valid on the wire.
    pub const RESERVED: u8 = 0xf;
}

/// Type code shifted into the high 4 bits of a type descriptor byte.
pub mod TypeOverlay {
    pub const NULL: u8 = super::Type::NULL << 4;
    pub const BOOL: u8 = super::Type::BOOL << 4;
    pub const POS_INT: u8 = super::Type::POS_INT << 4;
    pub const NEG_INT: u8 = super::Type::NEG_INT << 4;
    pub const FLOAT: u8 = super::Type::FLOAT << 4;
    pub const DECIMAL: u8 = super::Type::DECIMAL << 4;
    pub const TIMESTAMP: u8 = super::Type::TIMESTAMP << 4;
    pub const SYMBOL: u8 = super::Type::SYMBOL << 4;
    pub const STRING: u8 = super::Type::STRING << 4;
    pub const CLOB: u8 = super::Type::CLOB << 4;
    pub const BLOB: u8 = super::Type::BLOB << 4;
    pub const LIST: u8 = super::Type::LIST << 4;
    pub const SEXP: u8 = super::Type::SEXP << 4;
    pub const STRUCT: u8 = super::Type::STRUCT << 4;
    pub const ANNOTATION: u8 = super::Type::ANNOTATION << 4;
}

/// Low-nibble values with a fixed meaning.
pub mod LengthCode {
    pub const BOOL_FALSE: u8 = 0;
    pub const BOOL_TRUE: u8 = 1;
    /// Struct whose fields are sorted by SID; a VarUInt length follows.
    pub const ORDERED_STRUCT: u8 = 1;
    /// Largest length that fits in the nibble itself.
    pub const MAX_INLINE: u8 = 13;
    pub const VAR_UINT: u8 = 14;
    pub const NULL: u8 = 15;
}

/// Ion Version Marker: 4 bytes 0xe0 0x01 0x00 0xea.
pub const ION_1_0_IVM: [u8; 4] = [0xe0, 0x01, 0x00, 0xea];

/// Descriptor byte of a `null.null` value.
pub const NULL_NULL: u8 = TypeOverlay::NULL | LengthCode::NULL;

/// System symbol table (1-indexed; index 0 unused).
pub const SYSTEM_SYMBOLS: &[&str] = &[
    "",                         // 0: unknown text
    "$ion",                     // 1
    "$ion_1_0",                 // 2
    "$ion_symbol_table",        // 3
    "name",                     // 4
    "version",                  // 5
    "imports",                  // 6
    "symbols",                  // 7
    "max_id",                   // 8
    "$ion_shared_symbol_table", // 9
];

pub const SID_ION: u32 = 1;
pub const SID_ION_1_0: u32 = 2;
pub const SID_ION_SYMBOL_TABLE: u32 = 3;
pub const SID_NAME: u32 = 4;
pub const SID_VERSION: u32 = 5;
pub const SID_IMPORTS: u32 = 6;
pub const SID_SYMBOLS: u32 = 7;
pub const SID_MAX_ID: u32 = 8;
pub const SID_ION_SHARED_SYMBOL_TABLE: u32 = 9;

/// Highest SID of the system table.
pub const SYSTEM_MAX_ID: u32 = 9;

/// Implementation limit on the size of a single value, in bytes.
pub const MAXIMUM_VALUE_SIZE: usize = i32::MAX as usize;

/// Most symbols a shared symbol table may copy from its imports.
pub const MAXIMUM_COPIED_IMPORT_SYMBOLS: u32 = 1 << 20;
