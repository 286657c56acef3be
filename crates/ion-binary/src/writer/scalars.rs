//! Content bytes of scalar values; headers are added by the writer.

use crate::constants::Type;
use crate::error::{IonError, IonResult};
use crate::int_codec::{encode_int, uint_bytes};
use crate::types::{Decimal, Int, Timestamp, TimestampPrecision};
use crate::var_int::{encode_var_int, encode_var_uint, MAX_VALUE, VAR_INT_NEGATIVE_ZERO};

/// Type code and magnitude bytes of an int.
pub(crate) fn int(value: &Int) -> (u8, Vec<u8>) {
    let type_code = if value.is_negative() {
        Type::NEG_INT
    } else {
        Type::POS_INT
    };
    (type_code, value.magnitude_bytes())
}

pub(crate) fn float(value: f64) -> Vec<u8> {
    if value.to_bits() == 0 {
        return Vec::new();
    }
    value.to_be_bytes().to_vec()
}

fn exponent(value: i64) -> IonResult<i64> {
    if value.unsigned_abs() > MAX_VALUE {
        return Err(IonError::usage(format!("decimal exponent {value} out of range")));
    }
    Ok(value)
}

fn decimal_into(value: &Decimal, out: &mut Vec<u8>) -> IonResult<()> {
    out.extend_from_slice(encode_var_int(exponent(value.exponent())?).as_slice());
    out.extend_from_slice(&encode_int(value.is_negative(), value.magnitude()));
    Ok(())
}

/// Positive zero with a zero exponent is the empty decimal.
pub(crate) fn decimal(value: &Decimal) -> IonResult<Vec<u8>> {
    if value.exponent() == 0 && value.is_zero() && !value.is_negative() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    decimal_into(value, &mut out)?;
    Ok(out)
}

pub(crate) fn timestamp(value: &Timestamp) -> IonResult<Vec<u8>> {
    value.validate().map_err(IonError::Usage)?;
    let mut out = Vec::new();
    match value.offset_minutes {
        None => out.push(VAR_INT_NEGATIVE_ZERO),
        Some(minutes) => out.extend_from_slice(encode_var_int(minutes as i64).as_slice()),
    }
    out.extend_from_slice(encode_var_uint(value.year as u64).as_slice());
    let fields = [
        (TimestampPrecision::Month, value.month),
        (TimestampPrecision::Day, value.day),
        (TimestampPrecision::Minute, value.hour),
        (TimestampPrecision::Minute, value.minute),
        (TimestampPrecision::Second, value.second),
    ];
    for (precision, field) in fields {
        if value.precision >= precision {
            out.extend_from_slice(encode_var_uint(field as u64).as_slice());
        }
    }
    if let Some(fraction) = &value.fraction {
        // Always explicit: an empty fraction would read back as absent.
        decimal_into(fraction, &mut out)?;
    }
    Ok(out)
}

pub(crate) fn symbol_id(sid: u32) -> Vec<u8> {
    uint_bytes(sid as u64)
}
