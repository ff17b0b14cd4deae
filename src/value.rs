//! The tagged value model.
//!
//! [`Value`] is the codec's universal representation of a serializable value:
//! a discriminated union over scalars, text/binary payloads, temporal values,
//! precision numerics, identifiers, and composites. The encoder walks a
//! `Value` tree; the decoder rebuilds one. Values form trees, never cycles,
//! and a decoded value is owned exclusively by the caller.
//!
//! The numeric support types here do no arithmetic beyond what callers need
//! to construct them: [`BigInt`] is a sign plus base-256 magnitude and
//! [`Decimal`] is a sign plus decimal digit string and exponent, so the codec
//! itself only ever marshals bytes.

pub use uuid::Uuid;

/// An arbitrary-precision signed integer: sign plus big-endian base-256
/// magnitude with no leading zero bytes. An empty magnitude is zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigInt {
    /// The integer zero.
    pub fn zero() -> Self {
        Self {
            negative: false,
            magnitude: Vec::new(),
        }
    }

    /// Build from a sign and big-endian magnitude bytes.
    ///
    /// Leading zero bytes are stripped; a zero magnitude ignores the sign.
    pub fn from_sign_magnitude(negative: bool, magnitude: Vec<u8>) -> Self {
        let first = magnitude.iter().position(|&b| b != 0);
        match first {
            Some(0) => Self {
                negative,
                magnitude,
            },
            Some(i) => Self {
                negative,
                magnitude: magnitude[i..].to_vec(),
            },
            None => Self::zero(),
        }
    }

    /// Parse a base-10 string with an optional leading sign.
    ///
    /// Returns `None` on an empty or non-digit body. This is a construction
    /// helper for callers; the wire format never carries decimal text.
    pub fn from_decimal_str(s: &str) -> Option<Self> {
        let (negative, body) = match s.as_bytes().first()? {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        if body.is_empty() {
            return None;
        }
        // Schoolbook base conversion: magnitude = magnitude * 10 + digit.
        let mut magnitude: Vec<u8> = Vec::new();
        for ch in body.bytes() {
            if !ch.is_ascii_digit() {
                return None;
            }
            let mut carry = u16::from(ch - b'0');
            for byte in magnitude.iter_mut().rev() {
                let v = u16::from(*byte) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            while carry > 0 {
                magnitude.insert(0, (carry & 0xff) as u8);
                carry >>= 8;
            }
        }
        Some(Self::from_sign_magnitude(negative, magnitude))
    }

    /// True if this integer is zero.
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// True if this integer is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// The big-endian magnitude bytes (empty for zero).
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    /// Convert to `i64` if the value fits.
    pub fn to_i64(&self) -> Option<i64> {
        if self.magnitude.len() > 8 {
            return None;
        }
        let mut abs: u64 = 0;
        for &b in &self.magnitude {
            abs = (abs << 8) | u64::from(b);
        }
        let signed = if self.negative {
            -(abs as i128)
        } else {
            abs as i128
        };
        i64::try_from(signed).ok()
    }
}

impl From<i64> for BigInt {
    fn from(v: i64) -> Self {
        let negative = v < 0;
        let abs = v.unsigned_abs();
        Self::from_sign_magnitude(negative, abs.to_be_bytes().to_vec())
    }
}

impl From<u64> for BigInt {
    fn from(v: u64) -> Self {
        Self::from_sign_magnitude(false, v.to_be_bytes().to_vec())
    }
}

impl From<i32> for BigInt {
    fn from(v: i32) -> Self {
        Self::from(i64::from(v))
    }
}

impl From<u32> for BigInt {
    fn from(v: u32) -> Self {
        Self::from(u64::from(v))
    }
}

/// An exact decimal number: sign, decimal coefficient digits, and a base-10
/// exponent. `digits` holds one digit (0–9) per byte, most significant
/// first, kept verbatim so the coefficient round-trips exactly — including
/// leading zeros a caller considers significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    /// Whether the value is negative.
    pub negative: bool,
    /// Coefficient digits, one per byte, each in `0..=9`.
    pub digits: Vec<u8>,
    /// Base-10 exponent applied to the coefficient.
    pub exponent: i64,
}

impl Decimal {
    /// Build from parts, rejecting empty or non-decimal digit sequences.
    pub fn new(negative: bool, digits: Vec<u8>, exponent: i64) -> Option<Self> {
        if digits.is_empty() || digits.iter().any(|&d| d > 9) {
            return None;
        }
        Some(Self {
            negative,
            digits,
            exponent,
        })
    }

    /// Parse decimal text like `-12.345e-7`.
    ///
    /// Accepts an optional sign, an integer part, an optional fraction, and
    /// an optional `e`/`E` exponent. Returns `None` on anything else.
    pub fn from_str(s: &str) -> Option<Self> {
        let (negative, rest) = match s.as_bytes().first()? {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let (body, exp_part) = match rest.find(['e', 'E']) {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        let mut digits = Vec::new();
        let mut exponent: i64 = 0;
        let mut seen_dot = false;
        let mut seen_digit = false;
        for ch in body.bytes() {
            match ch {
                b'0'..=b'9' => {
                    digits.push(ch - b'0');
                    seen_digit = true;
                    if seen_dot {
                        exponent -= 1;
                    }
                }
                b'.' if !seen_dot => seen_dot = true,
                _ => return None,
            }
        }
        if !seen_digit {
            return None;
        }
        if let Some(e) = exp_part {
            exponent = exponent.checked_add(e.parse::<i64>().ok()?)?;
        }
        Self::new(negative, digits, exponent)
    }
}

/// A calendar date and wall-clock time with microsecond precision and an
/// optional UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    /// Calendar year (may be negative).
    pub year: i32,
    /// Month, `1..=12`.
    pub month: u8,
    /// Day of month, `1..=31`.
    pub day: u8,
    /// Hour, `0..24`.
    pub hour: u8,
    /// Minute, `0..60`.
    pub minute: u8,
    /// Second, `0..60`.
    pub second: u8,
    /// Microsecond, `0..1_000_000`.
    pub microsecond: u32,
    /// UTC offset in seconds, if the value is offset-aware.
    pub offset_secs: Option<i32>,
}

impl DateTime {
    /// Whether every component is within its calendar/clock range.
    pub fn in_range(&self) -> bool {
        (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
            && self.microsecond < 1_000_000
    }
}

/// A calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    /// Calendar year (may be negative).
    pub year: i32,
    /// Month, `1..=12`.
    pub month: u8,
    /// Day of month, `1..=31`.
    pub day: u8,
}

impl Date {
    /// Whether every component is within its calendar range.
    pub fn in_range(&self) -> bool {
        (1..=12).contains(&self.month) && (1..=31).contains(&self.day)
    }
}

/// A wall-clock time with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    /// Hour, `0..24`.
    pub hour: u8,
    /// Minute, `0..60`.
    pub minute: u8,
    /// Second, `0..60`.
    pub second: u8,
    /// Microsecond, `0..1_000_000`.
    pub microsecond: u32,
}

impl Time {
    /// Whether every component is within its clock range.
    pub fn in_range(&self) -> bool {
        self.hour < 24 && self.minute < 60 && self.second < 60 && self.microsecond < 1_000_000
    }
}

/// An elapsed-time span as three independent signed components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    /// Whole days.
    pub days: i64,
    /// Seconds.
    pub seconds: i64,
    /// Microseconds.
    pub microseconds: i64,
}

/// A view descriptor over a byte payload: a window of `len` bytes starting
/// at `offset`, read in `item_size`-byte elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct View {
    /// The underlying bytes.
    pub payload: Vec<u8>,
    /// Window start, in bytes.
    pub offset: u64,
    /// Window length, in bytes.
    pub len: u64,
    /// Element size, in bytes.
    pub item_size: u64,
}

impl View {
    /// A view spanning the whole payload with 1-byte elements.
    pub fn whole(payload: Vec<u8>) -> Self {
        let len = payload.len() as u64;
        Self {
            payload,
            offset: 0,
            len,
            item_size: 1,
        }
    }
}

/// A serializable value.
///
/// Leaves are scalars, text/binary payloads, temporal values, precision
/// numerics, and identifiers; composites hold further values. Mapping kinds
/// preserve insertion order and require unique keys; sets require unique
/// elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null/absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An arbitrary-precision integer.
    Int(BigInt),
    /// A 64-bit IEEE-754 float.
    Float(f64),
    /// A complex number (real and imaginary doubles).
    Complex {
        /// Real part.
        re: f64,
        /// Imaginary part.
        im: f64,
    },
    /// The ellipsis placeholder marker.
    Ellipsis,
    /// A UTF-8 string.
    Str(String),
    /// An immutable byte sequence.
    Bytes(Vec<u8>),
    /// A mutable byte sequence.
    ByteArray(Vec<u8>),
    /// A window over a byte payload.
    View(View),
    /// A date and time, optionally offset-aware.
    DateTime(DateTime),
    /// A calendar date.
    Date(Date),
    /// A wall-clock time.
    Time(Time),
    /// An elapsed-time span.
    Duration(Duration),
    /// An exact decimal number.
    Decimal(Decimal),
    /// A 128-bit unique identifier.
    Uid(Uuid),
    /// An ordered, mutable, heterogeneous sequence.
    List(Vec<Value>),
    /// An ordered, immutable sequence.
    Tuple(Vec<Value>),
    /// An integer range.
    Range {
        /// First value produced.
        start: BigInt,
        /// Exclusive upper bound.
        stop: BigInt,
        /// Stride between values.
        step: BigInt,
    },
    /// A named record: a type name plus ordered (field, value) pairs.
    Struct {
        /// Type name of the record.
        name: String,
        /// Fields in declaration order.
        fields: Vec<(String, Value)>,
    },
    /// An insertion-ordered mapping with unique keys.
    Map(Vec<(Value, Value)>),
    /// A chain of mappings consulted in priority order.
    MultiMap(Vec<Vec<(Value, Value)>>),
    /// A mapping whose values are non-negative integer counts.
    CountMap(Vec<(Value, BigInt)>),
    /// A collection of unique elements.
    Set(Vec<Value>),
    /// An immutable collection of unique elements.
    FrozenSet(Vec<Value>),
    /// A filesystem path: an optional root anchor plus ordered segments.
    Path {
        /// Root/anchor marker (e.g. `/`), if the path is absolute.
        anchor: Option<String>,
        /// Path segments in order.
        segments: Vec<String>,
    },
}

impl Value {
    /// A short name for the value's kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::Ellipsis => "ellipsis",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::ByteArray(_) => "bytearray",
            Value::View(_) => "view",
            Value::DateTime(_) => "datetime",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Decimal(_) => "decimal",
            Value::Uid(_) => "uid",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Range { .. } => "range",
            Value::Struct { .. } => "struct",
            Value::Map(_) => "map",
            Value::MultiMap(_) => "multimap",
            Value::CountMap(_) => "countmap",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Path { .. } => "path",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(BigInt::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(BigInt::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(BigInt::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bigint_small_values() {
        assert_eq!(BigInt::from(0i64), BigInt::zero());
        assert_eq!(BigInt::from(1i64).magnitude(), &[1]);
        assert_eq!(BigInt::from(256i64).magnitude(), &[1, 0]);
        assert_eq!(BigInt::from(-256i64).magnitude(), &[1, 0]);
        assert!(BigInt::from(-256i64).is_negative());
        assert!(!BigInt::from(256i64).is_negative());
    }

    #[test]
    fn test_bigint_to_i64_roundtrip() {
        for v in [0i64, 1, -1, 127, -128, 255, 256, i64::MAX, i64::MIN + 1] {
            assert_eq!(BigInt::from(v).to_i64(), Some(v));
        }
        // i64::MIN's magnitude is 2^63, which still fits the i128 check.
        assert_eq!(BigInt::from(i64::MIN).to_i64(), Some(i64::MIN));
    }

    #[test]
    fn test_bigint_from_decimal_str() {
        assert_eq!(
            BigInt::from_decimal_str("256"),
            Some(BigInt::from(256i64))
        );
        assert_eq!(
            BigInt::from_decimal_str("-65536"),
            Some(BigInt::from(-65536i64))
        );
        assert_eq!(BigInt::from_decimal_str("0"), Some(BigInt::zero()));
        assert_eq!(BigInt::from_decimal_str(""), None);
        assert_eq!(BigInt::from_decimal_str("12x"), None);

        let big = BigInt::from_decimal_str("18446744073709551616").unwrap(); // 2^64
        assert_eq!(big.magnitude(), &[1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(big.to_i64(), None);
    }

    #[test]
    fn test_bigint_normalizes_leading_zeros() {
        let a = BigInt::from_sign_magnitude(false, vec![0, 0, 1, 0]);
        assert_eq!(a, BigInt::from(256i64));
        let z = BigInt::from_sign_magnitude(true, vec![0, 0]);
        assert_eq!(z, BigInt::zero());
        assert!(!z.is_negative());
    }

    #[test]
    fn test_decimal_from_str() {
        let d = Decimal::from_str("-12.345e-7").unwrap();
        assert!(d.negative);
        assert_eq!(d.digits, vec![1, 2, 3, 4, 5]);
        assert_eq!(d.exponent, -10);

        let d = Decimal::from_str("0.00").unwrap();
        assert_eq!(d.digits, vec![0, 0, 0]);
        assert_eq!(d.exponent, -2);

        assert!(Decimal::from_str("").is_none());
        assert!(Decimal::from_str(".").is_none());
        assert!(Decimal::from_str("1.2.3").is_none());
    }

    #[test]
    fn test_temporal_range_checks() {
        let ok = DateTime {
            year: 2024,
            month: 2,
            day: 29,
            hour: 23,
            minute: 59,
            second: 59,
            microsecond: 999_999,
            offset_secs: Some(3600),
        };
        assert!(ok.in_range());
        let bad = DateTime { month: 13, ..ok };
        assert!(!bad.in_range());
    }
}
