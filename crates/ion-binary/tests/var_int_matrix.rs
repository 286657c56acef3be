use ion_binary::var_int::{
    decode_var_int, decode_var_uint, encode_var_int, encode_var_uint, VarUIntCursor,
    MAX_VALUE, VAR_INT_NEGATIVE_ZERO,
};
use ion_binary::IonError;
use proptest::prelude::*;

#[test]
fn var_uint_wire_matrix() {
    let cases: &[(u64, &[u8])] = &[
        (0, &[0x80]),
        (1, &[0x81]),
        (127, &[0xff]),
        (128, &[0x01, 0x80]),
        (300, &[0x02, 0xac]),
        (16_384, &[0x01, 0x00, 0x80]),
        (i32::MAX as u64, &[0x07, 0x7f, 0x7f, 0x7f, 0xff]),
    ];
    for (value, wire) in cases {
        assert_eq!(encode_var_uint(*value).as_slice(), *wire, "encode {value}");
        assert_eq!(
            decode_var_uint(wire, 0).unwrap(),
            (*value as u32, wire.len()),
            "decode {value}"
        );
    }
}

#[test]
fn var_int_wire_matrix() {
    let cases: &[(i64, &[u8])] = &[
        (0, &[0x80]),
        (1, &[0x81]),
        (-1, &[0xc1]),
        (63, &[0xbf]),
        (64, &[0x00, 0xc0]),
        (-64, &[0x40, 0xc0]),
        (-300, &[0x42, 0xac]),
    ];
    for (value, wire) in cases {
        assert_eq!(encode_var_int(*value).as_slice(), *wire, "encode {value}");
        let (decoded, len) = decode_var_int(wire, 0).unwrap();
        assert_eq!((decoded.value(), len), (*value, wire.len()), "decode {value}");
    }
}

#[test]
fn var_int_negative_zero_is_distinct() {
    let (decoded, len) = decode_var_int(&[VAR_INT_NEGATIVE_ZERO], 0).unwrap();
    assert_eq!(len, 1);
    assert!(decoded.is_negative_zero());
    assert_eq!(decoded.value(), 0);
    let (zero, _) = decode_var_int(&[0x80], 0).unwrap();
    assert!(!zero.is_negative_zero());
}

#[test]
fn var_uint_error_matrix() {
    // Sixth group.
    let six_groups = [0x00, 0x00, 0x00, 0x00, 0x01, 0x80];
    assert!(matches!(
        decode_var_uint(&six_groups, 7),
        Err(IonError::IntegerOverflow { position: 7 })
    ));
    // 2^31 needs five groups but exceeds the value limit.
    assert!(matches!(
        decode_var_uint(&[0x08, 0x00, 0x00, 0x00, 0x80], 0),
        Err(IonError::IntegerOverflow { .. })
    ));
    assert!(matches!(
        decode_var_uint(&[0x01, 0x02], 10),
        Err(IonError::Truncated { position: 12 })
    ));
    assert!(matches!(
        decode_var_int(&[], 3),
        Err(IonError::Truncated { position: 3 })
    ));
}

#[test]
fn cursor_resumes_across_chunks() {
    let wire = encode_var_uint(1_000_000);
    let mut cursor = VarUIntCursor::new();
    for byte in wire.as_slice() {
        assert!(!cursor.complete);
        cursor.push(*byte);
    }
    assert!(cursor.complete);
    assert_eq!(cursor.value, 1_000_000);
    assert_eq!(cursor.bytes_read, wire.len());
}

proptest! {
    #[test]
    fn var_uint_encoding_is_idempotent(value in 0..=MAX_VALUE) {
        let wire = encode_var_uint(value);
        let (decoded, len) = decode_var_uint(wire.as_slice(), 0).unwrap();
        prop_assert_eq!(len, wire.len());
        let reencoded = encode_var_uint(decoded as u64);
        prop_assert_eq!(reencoded.as_slice(), wire.as_slice());
    }

    #[test]
    fn var_int_decodes_what_it_encodes(value in -(MAX_VALUE as i64)..=(MAX_VALUE as i64)) {
        let wire = encode_var_int(value);
        let (decoded, len) = decode_var_int(wire.as_slice(), 0).unwrap();
        prop_assert_eq!(len, wire.len());
        prop_assert_eq!(decoded.value(), value);
    }
}
