//! Value-level types produced by the reader and accepted by the writer.

use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::constants::Type;

/// The Ion data model types visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    SExp,
    Struct,
}

impl IonType {
    /// Maps a wire type code to its data model type. Annotation wrappers and
    /// the reserved code have no data model type.
    pub fn from_type_code(code: u8) -> Option<IonType> {
        Some(match code {
            Type::NULL => IonType::Null,
            Type::BOOL => IonType::Bool,
            Type::POS_INT | Type::NEG_INT => IonType::Int,
            Type::FLOAT => IonType::Float,
            Type::DECIMAL => IonType::Decimal,
            Type::TIMESTAMP => IonType::Timestamp,
            Type::SYMBOL => IonType::Symbol,
            Type::STRING => IonType::String,
            Type::CLOB => IonType::Clob,
            Type::BLOB => IonType::Blob,
            Type::LIST => IonType::List,
            Type::SEXP => IonType::SExp,
            Type::STRUCT => IonType::Struct,
            _ => return None,
        })
    }

    /// The type code used when writing a value of this type. Ints use the
    /// positive code; the sign picks the final code at write time.
    pub fn type_code(self) -> u8 {
        match self {
            IonType::Null => Type::NULL,
            IonType::Bool => Type::BOOL,
            IonType::Int => Type::POS_INT,
            IonType::Float => Type::FLOAT,
            IonType::Decimal => Type::DECIMAL,
            IonType::Timestamp => Type::TIMESTAMP,
            IonType::Symbol => Type::SYMBOL,
            IonType::String => Type::STRING,
            IonType::Clob => Type::CLOB,
            IonType::Blob => Type::BLOB,
            IonType::List => Type::LIST,
            IonType::SExp => Type::SEXP,
            IonType::Struct => Type::STRUCT,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, IonType::List | IonType::SExp | IonType::Struct)
    }

    pub fn is_lob(self) -> bool {
        matches!(self, IonType::Clob | IonType::Blob)
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::SExp => "sexp",
            IonType::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// An Ion integer: a 64-bit fast path with an arbitrary-precision fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Int {
    I64(i64),
    Big(BigInt),
}

impl Int {
    /// Builds an `Int` from a sign and big-endian magnitude bytes, choosing
    /// the smallest representation.
    pub fn from_sign_magnitude(negative: bool, magnitude: &[u8]) -> Int {
        if magnitude.len() <= 8 {
            let mut value: u64 = 0;
            for &b in magnitude {
                value = (value << 8) | b as u64;
            }
            if !negative && value <= i64::MAX as u64 {
                return Int::I64(value as i64);
            }
            if negative && value <= i64::MAX as u64 + 1 {
                return Int::I64((value as i128).wrapping_neg() as i64);
            }
        }
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Int::Big(BigInt::from_bytes_be(sign, magnitude))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Int::I64(v) => Some(*v),
            Int::Big(v) => v.to_i64(),
        }
    }

    pub fn to_bigint(&self) -> BigInt {
        match self {
            Int::I64(v) => BigInt::from(*v),
            Int::Big(v) => v.clone(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Int::I64(v) => *v < 0,
            Int::Big(v) => v.sign() == Sign::Minus,
        }
    }

    /// Big-endian magnitude bytes without leading zeros (empty for zero).
    pub fn magnitude_bytes(&self) -> Vec<u8> {
        let bytes = match self {
            Int::I64(v) => v.unsigned_abs().to_be_bytes().to_vec(),
            Int::Big(v) => v.magnitude().to_bytes_be(),
        };
        strip_leading_zeros(bytes)
    }
}

impl From<i64> for Int {
    fn from(value: i64) -> Self {
        Int::I64(value)
    }
}

impl From<i32> for Int {
    fn from(value: i32) -> Self {
        Int::I64(value as i64)
    }
}

impl From<BigInt> for Int {
    fn from(value: BigInt) -> Self {
        match value.to_i64() {
            Some(v) => Int::I64(v),
            None => Int::Big(value),
        }
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int::I64(v) => write!(f, "{v}"),
            Int::Big(v) => write!(f, "{v}"),
        }
    }
}

pub(crate) fn strip_leading_zeros(mut bytes: Vec<u8>) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.drain(..first);
    bytes
}

/// An Ion decimal: `(-1)^negative * magnitude * 10^exponent`.
///
/// Sign and magnitude are kept apart so that negative zero survives a
/// round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    magnitude: BigUint,
    negative: bool,
    exponent: i64,
}

impl Decimal {
    pub fn new(coefficient: impl Into<BigInt>, exponent: i64) -> Self {
        let coefficient = coefficient.into();
        Self {
            negative: coefficient.sign() == Sign::Minus,
            magnitude: coefficient.magnitude().clone(),
            exponent,
        }
    }

    pub fn negative_zero(exponent: i64) -> Self {
        Self {
            magnitude: BigUint::zero(),
            negative: true,
            exponent,
        }
    }

    pub(crate) fn from_parts(negative: bool, magnitude: BigUint, exponent: i64) -> Self {
        Self {
            magnitude,
            negative,
            exponent,
        }
    }

    pub fn coefficient(&self) -> BigInt {
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.magnitude.clone())
    }

    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative_zero(&self) -> bool {
        self.negative && self.magnitude.is_zero()
    }

    /// True when the value lies in `[0, 1)`, the legal range of a
    /// timestamp's fractional seconds.
    pub fn is_unit_fraction(&self) -> bool {
        if self.is_zero() {
            return true;
        }
        if self.negative || self.exponent >= 0 {
            return false;
        }
        let digits = self.magnitude.to_string().len() as i64;
        digits <= -self.exponent
    }

    /// Decimal text in Ion notation, e.g. `-1.50` or `12d-5`.
    pub fn to_text(&self) -> String {
        let sign = if self.negative { "-" } else { "" };
        let digits = self.magnitude.to_string();
        if self.exponent == 0 {
            return format!("{sign}{digits}.");
        }
        if self.exponent < 0 {
            let scale = (-self.exponent) as usize;
            if scale < digits.len() {
                let (int, frac) = digits.split_at(digits.len() - scale);
                return format!("{sign}{int}.{frac}");
            }
            if scale - digits.len() < 6 {
                return format!("{sign}0.{}{digits}", "0".repeat(scale - digits.len()));
            }
        }
        format!("{sign}{digits}d{}", self.exponent)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::new(value, 0)
    }
}

/// How much of a timestamp is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimestampPrecision {
    Year,
    Month,
    Day,
    Minute,
    Second,
}

/// An Ion timestamp as carried on the wire: UTC fields plus an optional
/// local offset in minutes (`None` is the unknown offset `-00:00`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub precision: TimestampPrecision,
    pub offset_minutes: Option<i32>,
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Fractional seconds in `[0, 1)`, only meaningful at second precision.
    pub fraction: Option<Decimal>,
}

impl Timestamp {
    pub fn with_year(year: u32) -> Self {
        Self {
            precision: TimestampPrecision::Year,
            offset_minutes: None,
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fraction: None,
        }
    }

    pub fn with_month(year: u32, month: u8) -> Self {
        Self {
            precision: TimestampPrecision::Month,
            month,
            ..Self::with_year(year)
        }
    }

    pub fn with_day(year: u32, month: u8, day: u8) -> Self {
        Self {
            precision: TimestampPrecision::Day,
            day,
            ..Self::with_month(year, month)
        }
    }

    pub fn with_minute(year: u32, month: u8, day: u8, hour: u8, minute: u8) -> Self {
        Self {
            precision: TimestampPrecision::Minute,
            hour,
            minute,
            ..Self::with_day(year, month, day)
        }
    }

    pub fn with_second(year: u32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            precision: TimestampPrecision::Second,
            second,
            ..Self::with_minute(year, month, day, hour, minute)
        }
    }

    pub fn with_fraction(mut self, fraction: Decimal) -> Self {
        self.fraction = Some(fraction);
        self
    }

    pub fn with_offset(mut self, offset_minutes: i32) -> Self {
        self.offset_minutes = Some(offset_minutes);
        self
    }

    /// Checks field ranges. Returns a description of the first bad field.
    pub fn validate(&self) -> Result<(), String> {
        if self.year < 1 || self.year > 9999 {
            return Err(format!("year {} out of range", self.year));
        }
        if self.precision >= TimestampPrecision::Month && !(1..=12).contains(&self.month) {
            return Err(format!("month {} out of range", self.month));
        }
        if self.precision >= TimestampPrecision::Day
            && (self.day < 1 || self.day > days_in_month(self.year, self.month))
        {
            return Err(format!("day {} out of range", self.day));
        }
        if self.precision >= TimestampPrecision::Minute && (self.hour > 23 || self.minute > 59) {
            return Err(format!("time {}:{} out of range", self.hour, self.minute));
        }
        if self.precision >= TimestampPrecision::Second && self.second > 59 {
            return Err(format!("second {} out of range", self.second));
        }
        if let Some(fraction) = &self.fraction {
            if self.precision < TimestampPrecision::Second {
                return Err("fractional seconds without seconds".to_owned());
            }
            if !fraction.is_unit_fraction() {
                return Err(format!("fractional seconds {} not in [0, 1)", fraction.to_text()));
            }
        }
        Ok(())
    }

    /// ISO-8601 style text of the wire fields.
    pub fn to_text(&self) -> String {
        let mut out = format!("{:04}", self.year);
        if self.precision == TimestampPrecision::Year {
            out.push('T');
            return out;
        }
        out.push_str(&format!("-{:02}", self.month));
        if self.precision == TimestampPrecision::Month {
            out.push('T');
            return out;
        }
        out.push_str(&format!("-{:02}", self.day));
        if self.precision == TimestampPrecision::Day {
            return out;
        }
        out.push_str(&format!("T{:02}:{:02}", self.hour, self.minute));
        if self.precision == TimestampPrecision::Second {
            out.push_str(&format!(":{:02}", self.second));
            if let Some(fraction) = &self.fraction {
                let text = fraction.to_text();
                if let Some(idx) = text.find('.') {
                    out.push_str(&text[idx..]);
                }
            }
        }
        match self.offset_minutes {
            None => out.push_str("-00:00"),
            Some(0) => out.push('Z'),
            Some(m) => {
                let sign = if m < 0 { '-' } else { '+' };
                let m = m.unsigned_abs();
                out.push_str(&format!("{sign}{:02}:{:02}", m / 60, m % 60));
            }
        }
        out
    }
}

fn days_in_month(year: u32, month: u8) -> u8 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_picks_fast_path() {
        assert_eq!(Int::from_sign_magnitude(false, &[0x01, 0x00]), Int::I64(256));
        assert_eq!(
            Int::from_sign_magnitude(true, &[0x80, 0, 0, 0, 0, 0, 0, 0]),
            Int::I64(i64::MIN)
        );
        let big = Int::from_sign_magnitude(false, &[0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(big, Int::Big(_)));
        assert_eq!(big.magnitude_bytes(), vec![0x80, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn bigint_normalizes_to_i64() {
        assert_eq!(Int::from(BigInt::from(-5)), Int::I64(-5));
        assert_eq!(Int::I64(-5).magnitude_bytes(), vec![5]);
        assert!(Int::I64(0).magnitude_bytes().is_empty());
    }

    #[test]
    fn decimal_negative_zero() {
        let d = Decimal::negative_zero(-2);
        assert!(d.is_negative_zero());
        assert_ne!(d, Decimal::new(0, -2));
        assert_eq!(d.to_text(), "-0.00");
    }

    #[test]
    fn decimal_unit_fraction() {
        assert!(Decimal::new(5, -1).is_unit_fraction());
        assert!(Decimal::new(999, -3).is_unit_fraction());
        assert!(!Decimal::new(1000, -3).is_unit_fraction());
        assert!(!Decimal::new(1, 0).is_unit_fraction());
        assert!(Decimal::new(0, 3).is_unit_fraction());
    }

    #[test]
    fn timestamp_validation() {
        assert!(Timestamp::with_day(2024, 2, 29).validate().is_ok());
        assert!(Timestamp::with_day(2023, 2, 29).validate().is_err());
        assert!(Timestamp::with_minute(2000, 1, 1, 24, 0).validate().is_err());
        let ts = Timestamp::with_second(2000, 1, 1, 0, 0, 0).with_fraction(Decimal::new(15, -1));
        assert!(ts.validate().is_err());
    }

    #[test]
    fn timestamp_text() {
        let ts = Timestamp::with_second(2007, 2, 23, 12, 14, 33)
            .with_fraction(Decimal::new(79, -3))
            .with_offset(-60);
        assert_eq!(ts.to_text(), "2007-02-23T12:14:33.079-01:00");
        assert_eq!(Timestamp::with_year(2007).to_text(), "2007T");
    }
}
