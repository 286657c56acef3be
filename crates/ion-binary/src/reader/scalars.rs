//! Decoding of scalar content bytes once their length is known.

use crate::constants::Type;
use crate::error::{IonError, IonResult};
use crate::int_codec::{decode_int, decode_uint_u64};
use crate::types::{Decimal, Int, Timestamp, TimestampPrecision};
use crate::var_int::{decode_var_int, decode_var_uint};

pub(crate) fn int(type_code: u8, bytes: &[u8], position: u64) -> IonResult<Int> {
    let negative = type_code == Type::NEG_INT;
    if negative && bytes.iter().all(|b| *b == 0) {
        return Err(IonError::format("negative zero int", position));
    }
    Ok(Int::from_sign_magnitude(negative, bytes))
}

pub(crate) fn float(bytes: &[u8], position: u64) -> IonResult<f64> {
    match bytes.len() {
        0 => Ok(0.0),
        4 => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(bytes);
            Ok(f32::from_be_bytes(raw) as f64)
        }
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(f64::from_be_bytes(raw))
        }
        n => Err(IonError::format(format!("float of length {n}"), position)),
    }
}

pub(crate) fn decimal(bytes: &[u8], position: u64) -> IonResult<Decimal> {
    if bytes.is_empty() {
        return Ok(Decimal::new(0, 0));
    }
    let (exponent, used) = decode_var_int(bytes, position)?;
    let (negative, magnitude) = decode_int(&bytes[used..]);
    Ok(Decimal::from_parts(negative, magnitude, exponent.value()))
}

pub(crate) fn symbol_id(bytes: &[u8], position: u64) -> IonResult<u32> {
    decode_uint_u64(bytes)
        .and_then(|sid| u32::try_from(sid).ok())
        .ok_or_else(|| IonError::format("symbol id too large", position))
}

pub(crate) fn string(bytes: Vec<u8>, position: u64) -> IonResult<String> {
    String::from_utf8(bytes).map_err(|e| {
        IonError::format("invalid UTF-8 in string", position + e.utf8_error().valid_up_to() as u64)
    })
}

/// Cursor over timestamp content; each field is optional from the end.
struct Fields<'a> {
    bytes: &'a [u8],
    at: usize,
    base: u64,
}

impl Fields<'_> {
    fn has_more(&self) -> bool {
        self.at < self.bytes.len()
    }

    fn position(&self) -> u64 {
        self.base + self.at as u64
    }

    fn var_uint(&mut self) -> IonResult<u32> {
        let (value, used) = decode_var_uint(&self.bytes[self.at..], self.position())?;
        self.at += used;
        Ok(value)
    }

    fn small(&mut self, what: &str) -> IonResult<u8> {
        let position = self.position();
        let value = self.var_uint()?;
        u8::try_from(value).map_err(|_| IonError::format(format!("timestamp {what} out of range"), position))
    }
}

pub(crate) fn timestamp(bytes: &[u8], position: u64) -> IonResult<Timestamp> {
    let mut fields = Fields {
        bytes,
        at: 0,
        base: position,
    };
    if !fields.has_more() {
        return Err(IonError::format("empty timestamp", position));
    }
    let (offset, used) = decode_var_int(bytes, position)?;
    fields.at = used;
    let offset_minutes = if offset.is_negative_zero() {
        None
    } else {
        Some(offset.value() as i32)
    };
    if !fields.has_more() {
        return Err(IonError::format("timestamp without a year", position));
    }
    let mut ts = Timestamp::with_year(fields.var_uint()?);
    ts.offset_minutes = offset_minutes;
    if fields.has_more() {
        ts.month = fields.small("month")?;
        ts.precision = TimestampPrecision::Month;
    }
    if fields.has_more() {
        ts.day = fields.small("day")?;
        ts.precision = TimestampPrecision::Day;
    }
    if fields.has_more() {
        ts.hour = fields.small("hour")?;
        if !fields.has_more() {
            return Err(IonError::format("timestamp hour without minute", fields.position()));
        }
        ts.minute = fields.small("minute")?;
        ts.precision = TimestampPrecision::Minute;
    }
    if fields.has_more() {
        ts.second = fields.small("second")?;
        ts.precision = TimestampPrecision::Second;
    }
    if fields.has_more() {
        let at = fields.position();
        let fraction = decimal(&bytes[fields.at..], at)?;
        ts.fraction = Some(fraction);
    }
    ts.validate().map_err(|message| IonError::format(message, position))?;
    Ok(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_zero_int_is_rejected() {
        assert!(int(Type::NEG_INT, &[], 7).is_err());
        assert!(int(Type::NEG_INT, &[0, 0], 7).is_err());
        assert_eq!(int(Type::NEG_INT, &[1], 7).unwrap(), Int::I64(-1));
        assert_eq!(int(Type::POS_INT, &[], 7).unwrap(), Int::I64(0));
    }

    #[test]
    fn float_lengths() {
        assert_eq!(float(&[], 0).unwrap(), 0.0);
        assert_eq!(float(&[0x3f, 0x80, 0, 0], 0).unwrap(), 1.0);
        assert!(float(&[0; 3], 0).is_err());
    }

    #[test]
    fn decimal_forms() {
        assert_eq!(decimal(&[], 0).unwrap(), Decimal::new(0, 0));
        // exponent -1, coefficient -0
        let d = decimal(&[0xc1, 0x80], 0).unwrap();
        assert!(d.is_negative_zero());
        assert_eq!(d.exponent(), -1);
        // 1.5 = 15 * 10^-1
        assert_eq!(decimal(&[0xc1, 0x0f], 0).unwrap(), Decimal::new(15, -1));
    }

    #[test]
    fn timestamp_precisions() {
        // unknown offset, year 2000
        let ts = timestamp(&[0xc0, 0x0f, 0xd0], 0).unwrap();
        assert_eq!(ts.precision, TimestampPrecision::Year);
        assert_eq!(ts.offset_minutes, None);
        assert_eq!(ts.year, 2000);

        // UTC, 2000-01-02T03:04:05.6Z
        let ts = timestamp(
            &[0x80, 0x0f, 0xd0, 0x81, 0x82, 0x83, 0x84, 0x85, 0xc1, 0x06],
            0,
        )
        .unwrap();
        assert_eq!(ts.precision, TimestampPrecision::Second);
        assert_eq!(ts.offset_minutes, Some(0));
        assert_eq!((ts.hour, ts.minute, ts.second), (3, 4, 5));
        assert_eq!(ts.fraction, Some(Decimal::new(6, -1)));
    }

    #[test]
    fn timestamp_rejects_bad_shapes() {
        assert!(timestamp(&[], 0).is_err());
        assert!(timestamp(&[0x80], 0).is_err());
        // hour without minute
        assert!(timestamp(&[0x80, 0x0f, 0xd0, 0x81, 0x82, 0x83], 0).is_err());
        // fraction of 1.0
        assert!(timestamp(
            &[0x80, 0x0f, 0xd0, 0x81, 0x82, 0x83, 0x84, 0x85, 0x80, 0x01],
            0
        )
        .is_err());
        // month 13
        assert!(timestamp(&[0x80, 0x0f, 0xd0, 0x8d], 0).is_err());
    }
}
