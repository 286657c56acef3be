//! Fixed-width UInt and signed-magnitude Int fields.
//!
//! Unlike VarUInt/VarInt these fields have no terminator: their length is
//! given by the enclosing value header. An Int field keeps its sign in the
//! high bit of the first byte.

use num_bigint::BigUint;
use num_traits::Zero;

const SIGN_BIT: u8 = 0x80;

/// Big-endian bytes of `value` without leading zeros (empty for zero).
pub fn uint_bytes(value: u64) -> Vec<u8> {
    let skip = (value.leading_zeros() / 8) as usize;
    value.to_be_bytes()[skip..].to_vec()
}

/// Number of bytes in the minimal UInt encoding of `value`.
pub fn uint_len(value: u64) -> usize {
    8 - (value.leading_zeros() / 8) as usize
}

/// Reads a UInt field as an unsigned big integer.
pub fn decode_uint(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Reads a UInt field that fits in 64 bits.
pub fn decode_uint_u64(bytes: &[u8]) -> Option<u64> {
    let bytes = trim_zeros(bytes);
    if bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Reads an Int field into `(negative, magnitude)`. An empty field is
/// positive zero.
pub fn decode_int(bytes: &[u8]) -> (bool, BigUint) {
    match bytes.split_first() {
        None => (false, BigUint::zero()),
        Some((&first, rest)) => {
            let negative = first & SIGN_BIT != 0;
            let mut magnitude = Vec::with_capacity(bytes.len());
            magnitude.push(first & !SIGN_BIT);
            magnitude.extend_from_slice(rest);
            (negative, BigUint::from_bytes_be(&magnitude))
        }
    }
}

/// Encodes an Int field. Positive zero is the empty field; negative zero is
/// a lone sign byte.
pub fn encode_int(negative: bool, magnitude: &BigUint) -> Vec<u8> {
    if magnitude.is_zero() {
        return if negative { vec![SIGN_BIT] } else { Vec::new() };
    }
    let mut bytes = magnitude.to_bytes_be();
    if bytes[0] & SIGN_BIT != 0 {
        bytes.insert(0, 0);
    }
    if negative {
        bytes[0] |= SIGN_BIT;
    }
    bytes
}

fn trim_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_minimal_bytes() {
        assert!(uint_bytes(0).is_empty());
        assert_eq!(uint_bytes(0x01_00), vec![0x01, 0x00]);
        assert_eq!(uint_len(0), 0);
        assert_eq!(uint_len(255), 1);
        assert_eq!(uint_len(u64::MAX), 8);
    }

    #[test]
    fn uint_u64_tolerates_leading_zeros() {
        assert_eq!(decode_uint_u64(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 7]), Some(7));
        assert_eq!(decode_uint_u64(&[1, 0, 0, 0, 0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn int_sign_handling() {
        assert_eq!(encode_int(false, &BigUint::from(0x80u32)), vec![0x00, 0x80]);
        assert_eq!(encode_int(true, &BigUint::from(0x80u32)), vec![0x80, 0x80]);
        assert_eq!(encode_int(true, &BigUint::from(5u32)), vec![0x85]);
        assert_eq!(encode_int(true, &BigUint::zero()), vec![0x80]);
        assert!(encode_int(false, &BigUint::zero()).is_empty());
        assert_eq!(decode_int(&[0x85]), (true, BigUint::from(5u32)));
        assert_eq!(decode_int(&[0x80]), (true, BigUint::zero()));
        assert_eq!(decode_int(&[]), (false, BigUint::zero()));
    }
}
