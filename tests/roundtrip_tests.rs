//! Round-trip tests for the SBS codec.
//!
//! Every representable value must decode back to a structurally equal
//! value, and encodings must be self-delimiting.

use bytebridge::value::{BigInt, Date, DateTime, Decimal, Duration, Time, Uuid, View};
use bytebridge::{decode, decode_prefix, encode, Value};

fn roundtrip(value: Value) {
    let bytes = encode(&value).expect("encode failed");
    let back = decode(&bytes).expect("decode failed");
    assert_eq!(back, value);
}

fn int(v: i64) -> Value {
    Value::from(v)
}

fn str_val(s: &str) -> Value {
    Value::from(s)
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_roundtrip_scalars() {
    roundtrip(Value::Null);
    roundtrip(Value::Bool(true));
    roundtrip(Value::Bool(false));
    roundtrip(Value::Ellipsis);
    roundtrip(Value::Complex { re: 1.5, im: -2.5 });
}

#[test]
fn test_roundtrip_floats() {
    for v in [
        0.0,
        -0.0,
        1.5,
        -1e300,
        f64::MAX,
        f64::MIN_POSITIVE,
        f64::INFINITY,
        f64::NEG_INFINITY,
    ] {
        let bytes = encode(&Value::Float(v)).unwrap();
        match decode(&bytes).unwrap() {
            Value::Float(back) => assert_eq!(back.to_bits(), v.to_bits()),
            other => panic!("expected float, got {other:?}"),
        }
    }
}

#[test]
fn test_roundtrip_integers() {
    for v in [
        0i64,
        1,
        -1,
        127,
        -128,
        255,
        256,
        -256,
        65_535,
        1 << 40,
        i64::MAX,
        i64::MIN,
    ] {
        roundtrip(int(v));
    }
    roundtrip(Value::Int(BigInt::from(u64::MAX)));
}

#[test]
fn test_roundtrip_thousand_digit_integer() {
    // 1000 decimal digits, both signs; exact value and sign must survive.
    let digits: String = "1234567890".repeat(100);
    let pos = BigInt::from_decimal_str(&digits).unwrap();
    let neg = BigInt::from_decimal_str(&format!("-{digits}")).unwrap();
    assert!(neg.is_negative());
    roundtrip(Value::Int(pos.clone()));
    roundtrip(Value::Int(neg.clone()));
    assert_ne!(pos, neg);
}

// ============================================================================
// Text and binary
// ============================================================================

#[test]
fn test_roundtrip_strings() {
    roundtrip(str_val(""));
    roundtrip(str_val("hello"));
    roundtrip(str_val("héllo wörld — 日本語 🦀"));
    roundtrip(str_val(&"x".repeat(10_000)));
}

#[test]
fn test_roundtrip_binary() {
    roundtrip(Value::Bytes(Vec::new()));
    roundtrip(Value::Bytes(vec![0, 1, 2, 255]));
    roundtrip(Value::ByteArray(Vec::new()));
    roundtrip(Value::ByteArray((0..=255).collect()));
    roundtrip(Value::View(View::whole(vec![1, 2, 3, 4])));
    roundtrip(Value::View(View {
        payload: vec![0; 64],
        offset: 8,
        len: 32,
        item_size: 4,
    }));
}

// ============================================================================
// Temporal
// ============================================================================

#[test]
fn test_roundtrip_temporal() {
    roundtrip(Value::DateTime(DateTime {
        year: 2024,
        month: 2,
        day: 29,
        hour: 23,
        minute: 59,
        second: 59,
        microsecond: 999_999,
        offset_secs: Some(-5 * 3600),
    }));
    roundtrip(Value::DateTime(DateTime {
        year: -44,
        month: 3,
        day: 15,
        hour: 12,
        minute: 0,
        second: 0,
        microsecond: 0,
        offset_secs: None,
    }));
    roundtrip(Value::Date(Date {
        year: 1970,
        month: 1,
        day: 1,
    }));
    roundtrip(Value::Time(Time {
        hour: 0,
        minute: 0,
        second: 0,
        microsecond: 1,
    }));
    roundtrip(Value::Duration(Duration {
        days: -3,
        seconds: 86_399,
        microseconds: -1,
    }));
}

// ============================================================================
// Precision numerics and identifiers
// ============================================================================

#[test]
fn test_roundtrip_decimals() {
    roundtrip(Value::Decimal(Decimal::from_str("0").unwrap()));
    roundtrip(Value::Decimal(Decimal::from_str("-12.345e-7").unwrap()));
    roundtrip(Value::Decimal(Decimal::from_str("0.00").unwrap()));

    // 120 significant digits; coefficient and exponent must be exact.
    let coefficient = "987654321012".repeat(10);
    let text = format!("-{coefficient}e-55");
    let d = Decimal::from_str(&text).unwrap();
    assert_eq!(d.digits.len(), 120);
    assert_eq!(d.exponent, -55);
    roundtrip(Value::Decimal(d));
}

#[test]
fn test_roundtrip_uid() {
    roundtrip(Value::Uid(Uuid::from_bytes([
        0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab,
        0xcd, 0xef,
    ])));
    roundtrip(Value::Uid(Uuid::nil()));
}

// ============================================================================
// Sequences and records
// ============================================================================

#[test]
fn test_roundtrip_sequences() {
    roundtrip(Value::List(Vec::new()));
    roundtrip(Value::List(vec![int(1), str_val("two"), Value::Null]));
    roundtrip(Value::Tuple(vec![Value::Bool(true), Value::Float(2.5)]));
    roundtrip(Value::Range {
        start: BigInt::from(0i64),
        stop: BigInt::from(1_000_000i64),
        step: BigInt::from(-7i64),
    });
}

#[test]
fn test_roundtrip_struct() {
    roundtrip(Value::Struct {
        name: "Point".into(),
        fields: vec![("x".into(), int(3)), ("y".into(), int(-4))],
    });
    roundtrip(Value::Struct {
        name: "Unit".into(),
        fields: Vec::new(),
    });
}

// ============================================================================
// Mappings and sets
// ============================================================================

#[test]
fn test_roundtrip_mappings() {
    roundtrip(Value::Map(Vec::new()));
    // Insertion order must be preserved, including non-string keys.
    roundtrip(Value::Map(vec![
        (str_val("b"), int(2)),
        (str_val("a"), int(1)),
        (int(3), Value::List(vec![Value::Null])),
    ]));
    roundtrip(Value::MultiMap(vec![
        vec![(str_val("k"), int(1))],
        vec![(str_val("k"), int(2)), (str_val("other"), Value::Null)],
        Vec::new(),
    ]));
    roundtrip(Value::CountMap(vec![
        (str_val("apple"), BigInt::from(3i64)),
        (str_val("pear"), BigInt::zero()),
    ]));
}

#[test]
fn test_roundtrip_sets() {
    roundtrip(Value::Set(Vec::new()));
    roundtrip(Value::Set(vec![int(1), int(2), str_val("three")]));
    roundtrip(Value::FrozenSet(vec![Value::Bool(false), Value::Null]));
}

#[test]
fn test_roundtrip_paths() {
    roundtrip(Value::Path {
        anchor: Some("/".into()),
        segments: vec!["usr".into(), "local".into(), "bin".into()],
    });
    roundtrip(Value::Path {
        anchor: None,
        segments: vec!["relative".into(), "file.txt".into()],
    });
}

// ============================================================================
// Nesting and framing
// ============================================================================

#[test]
fn test_roundtrip_deeply_nested_within_limit() {
    let mut value = int(7);
    for _ in 0..500 {
        value = Value::List(vec![value]);
    }
    roundtrip(value);
}

#[test]
fn test_roundtrip_kitchen_sink() {
    let value = Value::Map(vec![
        (
            str_val("meta"),
            Value::Struct {
                name: "Header".into(),
                fields: vec![
                    ("version".into(), int(2)),
                    (
                        "id".into(),
                        Value::Uid(Uuid::from_bytes([9; 16])),
                    ),
                ],
            },
        ),
        (
            str_val("rows"),
            Value::List(vec![
                Value::Tuple(vec![int(1), Value::Decimal(Decimal::from_str("1.5").unwrap())]),
                Value::Tuple(vec![int(2), Value::Null]),
            ]),
        ),
        (
            str_val("tags"),
            Value::FrozenSet(vec![str_val("a"), str_val("b")]),
        ),
        (
            str_val("raw"),
            Value::ByteArray(vec![0xde, 0xad, 0xbe, 0xef]),
        ),
    ]);
    roundtrip(value);
}

#[test]
fn test_self_delimiting_back_to_back() {
    let first = Value::List(vec![int(1), str_val("one")]);
    let second = Value::Map(vec![(str_val("k"), int(2))]);

    let mut joined = encode(&first).unwrap();
    let first_len = joined.len();
    joined.extend_from_slice(&encode(&second).unwrap());

    let (got_first, consumed) = decode_prefix(&joined).unwrap();
    assert_eq!(got_first, first);
    assert_eq!(consumed, first_len);

    let got_second = decode(&joined[consumed..]).unwrap();
    assert_eq!(got_second, second);
}

#[test]
fn test_encode_is_deterministic() {
    let value = Value::Map(vec![
        (str_val("a"), int(1)),
        (str_val("b"), Value::List(vec![int(2), int(3)])),
    ]);
    assert_eq!(encode(&value).unwrap(), encode(&value).unwrap());
}
