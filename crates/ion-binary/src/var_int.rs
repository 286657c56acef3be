//! VarUInt / VarInt codec.
//!
//! Both encodings carry 7 payload bits per byte, most significant group
//! first, and set the high bit of the final byte. A VarInt additionally
//! reserves bit 6 of its first byte as the sign, leaving 6 payload bits
//! there. The single byte `0xC0` is the VarInt negative zero, which
//! timestamps use for an unknown local offset.
//!
//! Decoded values are limited to 5 groups and to `i32::MAX`, matching the
//! widths the rest of the engine works with.

use crate::error::{IonError, IonResult};

/// Maximum number of groups a decoded VarUInt/VarInt may span.
pub const MAX_GROUPS: usize = 5;

/// Largest magnitude a decoded VarUInt/VarInt may carry.
pub const MAX_VALUE: u64 = i32::MAX as u64;

/// VarInt encoding of negative zero.
pub const VAR_INT_NEGATIVE_ZERO: u8 = 0xc0;

const END_FLAG: u8 = 0x80;
const SIGN_FLAG: u8 = 0x40;
const PAYLOAD_MASK: u8 = 0x7f;
const FIRST_VAR_INT_MASK: u8 = 0x3f;

/// Encoded bytes of a VarUInt or VarInt, held inline.
#[derive(Debug, Clone, Copy)]
pub struct EncodedVarInt {
    buf: [u8; 10],
    start: usize,
}

impl EncodedVarInt {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AsRef<[u8]> for EncodedVarInt {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Number of bytes needed to encode `value` as a VarUInt.
pub fn var_uint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Number of bytes needed to encode `value` as a VarInt.
pub fn var_int_len(value: i64) -> usize {
    let bits = 64 - value.unsigned_abs().leading_zeros() as usize;
    // One extra bit for the sign.
    (bits + 1).div_ceil(7).max(1)
}

/// Encodes `value` as a minimal VarUInt.
pub fn encode_var_uint(value: u64) -> EncodedVarInt {
    let mut buf = [0u8; 10];
    let mut i = buf.len();
    let mut rest = value;
    loop {
        i -= 1;
        buf[i] = (rest as u8) & PAYLOAD_MASK;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    buf[9] |= END_FLAG;
    EncodedVarInt { buf, start: i }
}

/// Encodes `value` as a minimal VarInt.
pub fn encode_var_int(value: i64) -> EncodedVarInt {
    encode_var_int_parts(value.unsigned_abs(), value < 0)
}

/// Encodes a VarInt from sign and magnitude; `(0, true)` yields `0xC0`.
pub fn encode_var_int_parts(magnitude: u64, negative: bool) -> EncodedVarInt {
    let len = {
        let bits = 64 - magnitude.leading_zeros() as usize;
        (bits + 1).div_ceil(7).max(1)
    };
    let mut buf = [0u8; 10];
    let start = buf.len() - len;
    let mut rest = magnitude;
    for i in (start..buf.len()).rev() {
        buf[i] = (rest as u8) & PAYLOAD_MASK;
        rest >>= 7;
    }
    if negative {
        buf[start] |= SIGN_FLAG;
    }
    buf[9] |= END_FLAG;
    EncodedVarInt { buf, start }
}

/// A decoded VarInt. The sign is kept separately so negative zero is
/// distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt {
    pub magnitude: u64,
    pub negative: bool,
}

impl VarInt {
    pub fn value(self) -> i64 {
        if self.negative {
            -(self.magnitude as i64)
        } else {
            self.magnitude as i64
        }
    }

    pub fn is_negative_zero(self) -> bool {
        self.negative && self.magnitude == 0
    }
}

/// Outcome of feeding one byte to a [`VarUIntCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More bytes are needed.
    Continue,
    /// The terminating byte was seen.
    Complete,
    /// The value needs more than [`MAX_GROUPS`] groups or exceeds [`MAX_VALUE`].
    Overflow,
}

/// Resumable VarUInt decoder: bytes may arrive across any number of calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarUIntCursor {
    pub value: u64,
    pub bytes_read: usize,
    pub complete: bool,
}

impl VarUIntCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn push(&mut self, byte: u8) -> Step {
        if self.complete {
            return Step::Complete;
        }
        if self.bytes_read == MAX_GROUPS {
            return Step::Overflow;
        }
        self.bytes_read += 1;
        self.value = (self.value << 7) | (byte & PAYLOAD_MASK) as u64;
        if self.value > MAX_VALUE {
            return Step::Overflow;
        }
        if byte & END_FLAG != 0 {
            self.complete = true;
            Step::Complete
        } else {
            Step::Continue
        }
    }
}

/// Resumable VarInt decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarIntCursor {
    magnitude: u64,
    negative: bool,
    pub bytes_read: usize,
    pub complete: bool,
}

impl VarIntCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Step {
        if self.complete {
            return Step::Complete;
        }
        if self.bytes_read == MAX_GROUPS {
            return Step::Overflow;
        }
        if self.bytes_read == 0 {
            self.negative = byte & SIGN_FLAG != 0;
            self.magnitude = (byte & FIRST_VAR_INT_MASK) as u64;
        } else {
            self.magnitude = (self.magnitude << 7) | (byte & PAYLOAD_MASK) as u64;
        }
        self.bytes_read += 1;
        if self.magnitude > MAX_VALUE {
            return Step::Overflow;
        }
        if byte & END_FLAG != 0 {
            self.complete = true;
            Step::Complete
        } else {
            Step::Continue
        }
    }

    pub fn value(&self) -> VarInt {
        VarInt {
            magnitude: self.magnitude,
            negative: self.negative,
        }
    }
}

/// Decodes a VarUInt at the start of `bytes`, returning the value and the
/// number of bytes consumed. `position` is the stream offset of `bytes[0]`,
/// used for error reporting.
pub fn decode_var_uint(bytes: &[u8], position: u64) -> IonResult<(u32, usize)> {
    let mut cursor = VarUIntCursor::new();
    for (i, &b) in bytes.iter().enumerate() {
        match cursor.push(b) {
            Step::Continue => {}
            Step::Complete => return Ok((cursor.value as u32, i + 1)),
            Step::Overflow => return Err(IonError::IntegerOverflow { position }),
        }
    }
    Err(IonError::Truncated {
        position: position + bytes.len() as u64,
    })
}

/// Decodes a VarInt at the start of `bytes`.
pub fn decode_var_int(bytes: &[u8], position: u64) -> IonResult<(VarInt, usize)> {
    let mut cursor = VarIntCursor::new();
    for (i, &b) in bytes.iter().enumerate() {
        match cursor.push(b) {
            Step::Continue => {}
            Step::Complete => return Ok((cursor.value(), i + 1)),
            Step::Overflow => return Err(IonError::IntegerOverflow { position }),
        }
    }
    Err(IonError::Truncated {
        position: position + bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_uint_small_values() {
        assert_eq!(encode_var_uint(0).as_slice(), [0x80]);
        assert_eq!(encode_var_uint(127).as_slice(), [0xff]);
        assert_eq!(encode_var_uint(128).as_slice(), [0x01, 0x80]);
        assert_eq!(encode_var_uint(16383).as_slice(), [0x7f, 0xff]);
    }

    #[test]
    fn var_uint_len_matches_encoding() {
        for n in [0u64, 1, 127, 128, 16383, 16384, 2_097_151, 2_097_152, i32::MAX as u64] {
            assert_eq!(var_uint_len(n), encode_var_uint(n).len(), "n = {n}");
        }
    }

    #[test]
    fn var_int_sign_bit() {
        assert_eq!(encode_var_int(0).as_slice(), [0x80]);
        assert_eq!(encode_var_int(-1).as_slice(), [0xc1]);
        assert_eq!(encode_var_int(63).as_slice(), [0xbf]);
        assert_eq!(encode_var_int(64).as_slice(), [0x00, 0xc0]);
        assert_eq!(encode_var_int(-64).as_slice(), [0x40, 0xc0]);
        assert_eq!(encode_var_int_parts(0, true).as_slice(), [VAR_INT_NEGATIVE_ZERO]);
        assert_eq!(var_int_len(64), 2);
        assert_eq!(var_int_len(-63), 1);
    }

    #[test]
    fn decode_negative_zero() {
        let (v, n) = decode_var_int(&[0xc0], 0).unwrap();
        assert_eq!(n, 1);
        assert!(v.is_negative_zero());
        assert_eq!(v.value(), 0);
    }

    #[test]
    fn decode_reports_truncation_and_overflow() {
        assert_eq!(
            decode_var_uint(&[0x01, 0x02], 10),
            Err(IonError::Truncated { position: 12 })
        );
        assert_eq!(
            decode_var_uint(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x81], 0),
            Err(IonError::IntegerOverflow { position: 0 })
        );
        assert_eq!(
            decode_var_uint(&[0x08, 0x00, 0x00, 0x00, 0x80], 0),
            Err(IonError::IntegerOverflow { position: 0 })
        );
        assert_eq!(
            decode_var_uint(&[0x07, 0x7f, 0x7f, 0x7f, 0xff], 0),
            Ok((i32::MAX as u32, 5))
        );
    }

    #[test]
    fn cursor_resumes_across_pushes() {
        let mut cursor = VarUIntCursor::new();
        assert_eq!(cursor.push(0x01), Step::Continue);
        assert_eq!(cursor.push(0x80), Step::Complete);
        assert_eq!(cursor.value, 128);
        assert_eq!(cursor.bytes_read, 2);
    }
}
