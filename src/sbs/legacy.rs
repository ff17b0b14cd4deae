//! Legacy-format decoder (first generation, frozen).
//!
//! The first-generation layout multiplexes each kind with a length family:
//! `E` (empty payload), `1` (one size byte), `2` (two little-endian size
//! bytes), `D` (a size-byte count, then that many little-endian size
//! bytes). Integers are little-endian two's-complement with the byte count
//! in the tag or a dynamic prefix; temporal values are ISO-8601 text;
//! identifiers are 32 hex characters; decimals are decimal text.
//!
//! This module only decodes. The encoder never emits these tags, and the
//! table takes no new entries. Constructs without a lossless mapping into
//! the current model — a counter entry with a negative count — fail with
//! `UnsupportedLegacyConstruct` rather than being approximated.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sbs::primitive::Reader;
use crate::sbs::tags::legacy as tag;
use crate::sbs::CodecConfig;
use crate::value::{BigInt, Date, DateTime, Decimal, Duration, Time, Value, View};

/// Decode one legacy-format value from the cursor (marker already read).
pub(crate) fn decode_value(r: &mut Reader<'_>, config: &CodecConfig) -> Result<Value> {
    let dec = Decoder {
        max_depth: config.max_depth,
    };
    dec.read_value(r, 0)
}

/// How a legacy tag encodes its payload size.
#[derive(Clone, Copy)]
enum LenForm {
    Empty,
    One,
    Two,
    Dynamic,
}

impl LenForm {
    /// The form for `tag` within a four-tag `E/1/2/D` family at `base`.
    fn in_family(base: u8, t: u8) -> Self {
        match t - base {
            0 => Self::Empty,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Dynamic,
        }
    }
}

struct Decoder {
    max_depth: usize,
}

impl Decoder {
    /// Read a size in the given form as little-endian bytes.
    fn read_size(&self, r: &mut Reader<'_>, form: LenForm) -> Result<usize> {
        let width = match form {
            LenForm::Empty => return Ok(0),
            LenForm::One => 1,
            LenForm::Two => 2,
            LenForm::Dynamic => {
                let w = r.read_u8()? as usize;
                if w == 0 || w > 8 {
                    return Err(r.malformed(format!("invalid size width {w}")));
                }
                w
            }
        };
        let bytes = r.read_exact(width)?;
        let mut size: u64 = 0;
        for (i, &b) in bytes.iter().enumerate() {
            size |= u64::from(b) << (i * 8);
        }
        usize::try_from(size).map_err(|_| r.malformed("size overflows usize"))
    }

    /// Read a payload-sized size and check the bytes are actually present.
    fn read_checked_size(&self, r: &mut Reader<'_>, form: LenForm) -> Result<usize> {
        let size = self.read_size(r, form)?;
        if size > r.remaining() {
            return Err(Error::TruncatedInput {
                offset: r.position(),
                needed: size - r.remaining(),
            });
        }
        Ok(size)
    }

    fn read_str(&self, r: &mut Reader<'_>, form: LenForm) -> Result<String> {
        let len = self.read_checked_size(r, form)?;
        let offset = r.position();
        let bytes = r.read_exact(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedInput {
            offset,
            reason: "string is not valid UTF-8".into(),
        })
    }

    fn read_blob(&self, r: &mut Reader<'_>, form: LenForm) -> Result<Vec<u8>> {
        let len = self.read_checked_size(r, form)?;
        Ok(r.read_exact(len)?.to_vec())
    }

    fn read_int(&self, r: &mut Reader<'_>, width: usize) -> Result<BigInt> {
        let bytes = r.read_exact(width)?;
        Ok(bigint_from_twos_complement_le(bytes))
    }

    fn read_elements(&self, r: &mut Reader<'_>, form: LenForm, depth: usize) -> Result<Vec<Value>> {
        let count = self.read_checked_size(r, form)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_value(r, depth + 1)?);
        }
        Ok(items)
    }

    fn read_pairs(
        &self,
        r: &mut Reader<'_>,
        form: LenForm,
        depth: usize,
    ) -> Result<Vec<(Value, Value)>> {
        let count = self.read_checked_size(r, form)?;
        let mut pairs = Vec::with_capacity(count);
        let mut seen: HashSet<&[u8]> = HashSet::with_capacity(count);
        for _ in 0..count {
            let start = r.position();
            let key = self.read_value(r, depth + 1)?;
            if !seen.insert(r.window(start)) {
                return Err(Error::DuplicateKey {
                    location: format!("offset {start}"),
                });
            }
            let value = self.read_value(r, depth + 1)?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    fn read_value(&self, r: &mut Reader<'_>, depth: usize) -> Result<Value> {
        if depth >= self.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.max_depth,
            });
        }
        let tag_offset = r.position();
        let t = r.read_u8()?;
        let value = match t {
            tag::STR_E..=tag::STR_D => {
                Value::Str(self.read_str(r, LenForm::in_family(tag::STR_E, t))?)
            }
            tag::INT_1..=tag::INT_5 => {
                Value::Int(self.read_int(r, usize::from(t - tag::INT_1) + 1)?)
            }
            tag::INT_D1 => {
                let width = r.read_u8()? as usize;
                Value::Int(self.read_int(r, width)?)
            }
            tag::INT_D2 => {
                let width = self.read_checked_size(r, LenForm::Dynamic)?;
                Value::Int(self.read_int(r, width)?)
            }
            tag::FLOAT_S => Value::Float(r.read_f64()?),
            tag::BOOL_T => Value::Bool(true),
            tag::BOOL_F => Value::Bool(false),
            tag::COMPLEX_S => Value::Complex {
                re: r.read_f64()?,
                im: r.read_f64()?,
            },
            tag::NONE_S => Value::Null,
            tag::ELLIPSIS_S => Value::Ellipsis,
            tag::BYTES_E..=tag::BYTES_D => {
                Value::Bytes(self.read_blob(r, LenForm::in_family(tag::BYTES_E, t))?)
            }
            tag::BYTEARR_E..=tag::BYTEARR_D => {
                Value::ByteArray(self.read_blob(r, LenForm::in_family(tag::BYTEARR_E, t))?)
            }
            tag::LIST_E..=tag::LIST_D => {
                Value::List(self.read_elements(r, LenForm::in_family(tag::LIST_E, t), depth)?)
            }
            tag::SET_E..=tag::SET_D => {
                Value::Set(self.read_elements(r, LenForm::in_family(tag::SET_E, t), depth)?)
            }
            tag::TUPLE_E..=tag::TUPLE_D => {
                Value::Tuple(self.read_elements(r, LenForm::in_family(tag::TUPLE_E, t), depth)?)
            }
            tag::DICT_E..=tag::DICT_D => {
                Value::Map(self.read_pairs(r, LenForm::in_family(tag::DICT_E, t), depth)?)
            }
            tag::FSET_E..=tag::FSET_D => {
                Value::FrozenSet(self.read_elements(r, LenForm::in_family(tag::FSET_E, t), depth)?)
            }
            tag::DATETIME_DT => {
                let text = self.read_str(r, LenForm::One)?;
                let dt = parse_iso_datetime(&text).ok_or_else(|| Error::MalformedInput {
                    offset: tag_offset,
                    reason: format!("invalid datetime text '{text}'"),
                })?;
                Value::DateTime(dt)
            }
            tag::DATETIME_TD => {
                let days = read_i32_le(r)?;
                let seconds = read_i32_le(r)?;
                let microseconds = read_i32_le(r)?;
                Value::Duration(Duration {
                    days: i64::from(days),
                    seconds: i64::from(seconds),
                    microseconds: i64::from(microseconds),
                })
            }
            tag::DATETIME_D => {
                let text = self.read_str(r, LenForm::One)?;
                let d = parse_iso_date(&text).ok_or_else(|| Error::MalformedInput {
                    offset: tag_offset,
                    reason: format!("invalid date text '{text}'"),
                })?;
                Value::Date(d)
            }
            tag::DATETIME_T => {
                let text = self.read_str(r, LenForm::One)?;
                let t = parse_iso_time(&text).ok_or_else(|| Error::MalformedInput {
                    offset: tag_offset,
                    reason: format!("invalid time text '{text}'"),
                })?;
                Value::Time(t)
            }
            tag::UUID_S => {
                let offset = r.position();
                let bytes = r.read_exact(32)?;
                let text = std::str::from_utf8(bytes).map_err(|_| Error::MalformedInput {
                    offset,
                    reason: "identifier is not ASCII hex".into(),
                })?;
                let uid = Uuid::parse_str(text).map_err(|_| Error::MalformedInput {
                    offset,
                    reason: "identifier is not 32 hex digits".into(),
                })?;
                Value::Uid(uid)
            }
            tag::MEMVIEW_E..=tag::MEMVIEW_D => {
                let payload = self.read_blob(r, LenForm::in_family(tag::MEMVIEW_E, t))?;
                Value::View(View::whole(payload))
            }
            tag::DECIMAL_1..=tag::DECIMAL_D => {
                // No empty form: the family starts at `1`.
                let form = match t {
                    tag::DECIMAL_1 => LenForm::One,
                    tag::DECIMAL_2 => LenForm::Two,
                    _ => LenForm::Dynamic,
                };
                let text = self.read_str(r, form)?;
                let d = Decimal::from_str(&text).ok_or_else(|| Error::MalformedInput {
                    offset: tag_offset,
                    reason: format!("invalid decimal text '{text}'"),
                })?;
                Value::Decimal(d)
            }
            // Deques fold into the ordered mutable sequence; nothing is lost.
            tag::DEQUE_E..=tag::DEQUE_D => {
                Value::List(self.read_elements(r, LenForm::in_family(tag::DEQUE_E, t), depth)?)
            }
            tag::COUNTER_E..=tag::COUNTER_D => {
                let form = LenForm::in_family(tag::COUNTER_E, t);
                let count = self.read_checked_size(r, form)?;
                let mut pairs = Vec::with_capacity(count);
                let mut seen: HashSet<&[u8]> = HashSet::with_capacity(count);
                for _ in 0..count {
                    let start = r.position();
                    let key = self.read_value(r, depth + 1)?;
                    if !seen.insert(r.window(start)) {
                        return Err(Error::DuplicateKey {
                            location: format!("offset {start}"),
                        });
                    }
                    let n_offset = r.position();
                    let n = match self.read_value(r, depth + 1)? {
                        Value::Int(n) => n,
                        other => {
                            return Err(Error::MalformedInput {
                                offset: n_offset,
                                reason: format!("counter value is {}, not int", other.kind_name()),
                            });
                        }
                    };
                    if n.is_negative() {
                        return Err(Error::UnsupportedLegacyConstruct {
                            offset: n_offset,
                            reason: "counter entry with a negative count".into(),
                        });
                    }
                    pairs.push((key, n));
                }
                Value::CountMap(pairs)
            }
            other => {
                return Err(Error::UnsupportedType {
                    what: format!("legacy tag {other}"),
                    location: format!("offset {tag_offset}"),
                });
            }
        };
        Ok(value)
    }
}

fn read_i32_le(r: &mut Reader<'_>) -> Result<i32> {
    let bytes = r.read_exact(4)?;
    Ok(i32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
}

/// Convert little-endian two's-complement bytes to sign + magnitude.
fn bigint_from_twos_complement_le(bytes: &[u8]) -> BigInt {
    let Some(&top) = bytes.last() else {
        return BigInt::zero();
    };
    let negative = top & 0x80 != 0;
    let mut magnitude = bytes.to_vec();
    if negative {
        // magnitude = !x + 1, modulo the byte width
        let mut carry = 1u16;
        for b in magnitude.iter_mut() {
            let v = u16::from(!*b) + carry;
            *b = (v & 0xff) as u8;
            carry = v >> 8;
        }
    }
    magnitude.reverse();
    BigInt::from_sign_magnitude(negative, magnitude)
}

fn split2(s: &str, sep: char) -> Option<(&str, &str)> {
    let mut parts = s.splitn(2, sep);
    Some((parts.next()?, parts.next()?))
}

fn parse_component(s: &str, digits: usize) -> Option<u32> {
    if s.len() != digits || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse `YYYY-MM-DD`.
fn parse_iso_date(s: &str) -> Option<Date> {
    let (year, rest) = split2(s, '-')?;
    let (month, day) = split2(rest, '-')?;
    let d = Date {
        year: i32::try_from(parse_component(year, 4)?).ok()?,
        month: parse_component(month, 2)? as u8,
        day: parse_component(day, 2)? as u8,
    };
    d.in_range().then_some(d)
}

/// Parse `HH:MM:SS[.ffffff]` with a 1–6 digit fraction.
fn parse_iso_time(s: &str) -> Option<Time> {
    let (clock, fraction) = match split2(s, '.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (s, None),
    };
    let (hour, rest) = split2(clock, ':')?;
    let (minute, second) = split2(rest, ':')?;
    let microsecond = match fraction {
        Some(f) => {
            if f.is_empty() || f.len() > 6 || !f.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Scale a short fraction up to microseconds.
            f.parse::<u32>().ok()? * 10u32.pow(6 - f.len() as u32)
        }
        None => 0,
    };
    let t = Time {
        hour: parse_component(hour, 2)? as u8,
        minute: parse_component(minute, 2)? as u8,
        second: parse_component(second, 2)? as u8,
        microsecond,
    };
    t.in_range().then_some(t)
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.ffffff][+HH:MM|-HH:MM]`.
fn parse_iso_datetime(s: &str) -> Option<DateTime> {
    let (date_part, time_part) = split2(s, 'T')?;
    let date = parse_iso_date(date_part)?;
    let (time_text, offset_secs) = match time_part.rfind(['+', '-']) {
        Some(i) => {
            let (hh, mm) = split2(&time_part[i + 1..], ':')?;
            let magnitude =
                i32::try_from(parse_component(hh, 2)? * 3600 + parse_component(mm, 2)? * 60)
                    .ok()?;
            let sign = if time_part.as_bytes()[i] == b'-' { -1 } else { 1 };
            (&time_part[..i], Some(sign * magnitude))
        }
        None => (time_part, None),
    };
    let time = parse_iso_time(time_text)?;
    Some(DateTime {
        year: date.year,
        month: date.month,
        day: date.day,
        hour: time.hour,
        minute: time.minute,
        second: time.second,
        microsecond: time.microsecond,
        offset_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twos_complement_conversion() {
        assert_eq!(bigint_from_twos_complement_le(&[5]), BigInt::from(5i64));
        assert_eq!(bigint_from_twos_complement_le(&[0xff]), BigInt::from(-1i64));
        assert_eq!(
            bigint_from_twos_complement_le(&[0x00, 0x01]),
            BigInt::from(256i64)
        );
        assert_eq!(
            bigint_from_twos_complement_le(&[0x00, 0xff]),
            BigInt::from(-256i64)
        );
        assert_eq!(bigint_from_twos_complement_le(&[0x80]), BigInt::from(-128i64));
        assert_eq!(bigint_from_twos_complement_le(&[]), BigInt::zero());
    }

    #[test]
    fn test_parse_iso_date() {
        let d = parse_iso_date("2024-02-29").unwrap();
        assert_eq!((d.year, d.month, d.day), (2024, 2, 29));
        assert!(parse_iso_date("2024-13-01").is_none());
        assert!(parse_iso_date("2024-1-01").is_none());
    }

    #[test]
    fn test_parse_iso_time_fraction_scaling() {
        assert_eq!(parse_iso_time("10:30:00").unwrap().microsecond, 0);
        assert_eq!(parse_iso_time("10:30:00.5").unwrap().microsecond, 500_000);
        assert_eq!(
            parse_iso_time("10:30:00.000123").unwrap().microsecond,
            123
        );
        assert!(parse_iso_time("10:30:00.1234567").is_none());
        assert!(parse_iso_time("24:00:00").is_none());
    }

    #[test]
    fn test_parse_iso_datetime_offsets() {
        let dt = parse_iso_datetime("2024-01-15T10:30:00.000123+02:00").unwrap();
        assert_eq!(dt.offset_secs, Some(7200));
        let dt = parse_iso_datetime("2024-01-15T10:30:00-05:30").unwrap();
        assert_eq!(dt.offset_secs, Some(-(5 * 3600 + 30 * 60)));
        let dt = parse_iso_datetime("2024-01-15T10:30:00").unwrap();
        assert_eq!(dt.offset_secs, None);
    }
}
