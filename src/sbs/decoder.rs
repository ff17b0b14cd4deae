//! Current-format decoder.
//!
//! Parses exactly one tagged value from a cursor, consuming exactly the
//! bytes that value owns. Every length and count is checked against the
//! bytes actually present before anything is allocated, so a crafted stream
//! can neither read out of bounds nor demand absurd allocations.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sbs::primitive::{Reader, SIGN_MINUS, SIGN_PLUS};
use crate::sbs::tags::current as tag;
use crate::sbs::CodecConfig;
use crate::value::{Date, DateTime, Duration, Time, Value, View};

/// Decode one current-format value from the cursor (marker already read).
pub(crate) fn decode_value(r: &mut Reader<'_>, config: &CodecConfig) -> Result<Value> {
    let mut dec = Decoder {
        max_depth: config.max_depth,
    };
    dec.read_value(r, 0)
}

struct Decoder {
    max_depth: usize,
}

impl Decoder {
    fn read_str(&self, r: &mut Reader<'_>) -> Result<String> {
        let len = r.read_len()?;
        let offset = r.position();
        let bytes = r.read_exact(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedInput {
            offset,
            reason: "string is not valid UTF-8".into(),
        })
    }

    fn read_blob(&self, r: &mut Reader<'_>) -> Result<Vec<u8>> {
        let len = r.read_len()?;
        Ok(r.read_exact(len)?.to_vec())
    }

    fn read_elements(&self, r: &mut Reader<'_>, depth: usize) -> Result<Vec<Value>> {
        let count = r.read_count()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_value(r, depth + 1)?);
        }
        Ok(items)
    }

    /// Read set elements, rejecting duplicates by their wire bytes.
    fn read_unique_elements(&self, r: &mut Reader<'_>, depth: usize) -> Result<Vec<Value>> {
        let count = r.read_count()?;
        let mut items = Vec::with_capacity(count);
        let mut seen: HashSet<&[u8]> = HashSet::with_capacity(count);
        for _ in 0..count {
            let start = r.position();
            items.push(self.read_value(r, depth + 1)?);
            if !seen.insert(r.window(start)) {
                return Err(Error::DuplicateKey {
                    location: format!("offset {start}"),
                });
            }
        }
        Ok(items)
    }

    /// Read mapping pairs, rejecting duplicate keys by their wire bytes.
    fn read_pairs(&self, r: &mut Reader<'_>, depth: usize) -> Result<Vec<(Value, Value)>> {
        let count = r.read_count()?;
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
        let t = r.read_varint()?;
        let value = match t {
            tag::NULL => Value::Null,
            tag::FALSE => Value::Bool(false),
            tag::TRUE => Value::Bool(true),
            tag::INT => Value::Int(r.read_bigint()?),
            tag::FLOAT => Value::Float(r.read_f64()?),
            tag::COMPLEX => Value::Complex {
                re: r.read_f64()?,
                im: r.read_f64()?,
            },
            tag::ELLIPSIS => Value::Ellipsis,
            tag::STR => Value::Str(self.read_str(r)?),
            tag::BYTES => Value::Bytes(self.read_blob(r)?),
            tag::BYTEARRAY => Value::ByteArray(self.read_blob(r)?),
            tag::VIEW => {
                let payload = self.read_blob(r)?;
                let offset = r.read_varint()?;
                let len = r.read_varint()?;
                let item_size = r.read_varint()?;
                Value::View(View {
                    payload,
                    offset,
                    len,
                    item_size,
                })
            }
            tag::DATETIME => {
                let year = self.read_year(r)?;
                let month = r.read_u8()?;
                let day = r.read_u8()?;
                let hour = r.read_u8()?;
                let minute = r.read_u8()?;
                let second = r.read_u8()?;
                let microsecond = self.read_microsecond(r)?;
                let offset_secs = match r.read_u8()? {
                    0 => None,
                    1 => {
                        let secs = r.read_varint_signed()?;
                        Some(i32::try_from(secs).map_err(|_| {
                            r.malformed("UTC offset out of range")
                        })?)
                    }
                    other => {
                        return Err(r.malformed(format!("invalid offset flag {other}")));
                    }
                };
                let dt = DateTime {
                    year,
                    month,
                    day,
                    hour,
                    minute,
                    second,
                    microsecond,
                    offset_secs,
                };
                if !dt.in_range() {
                    return Err(Error::MalformedInput {
                        offset: tag_offset,
                        reason: "datetime component out of range".into(),
                    });
                }
                Value::DateTime(dt)
            }
            tag::DATE => {
                let year = self.read_year(r)?;
                let month = r.read_u8()?;
                let day = r.read_u8()?;
                let d = Date { year, month, day };
                if !d.in_range() {
                    return Err(Error::MalformedInput {
                        offset: tag_offset,
                        reason: "date component out of range".into(),
                    });
                }
                Value::Date(d)
            }
            tag::TIME => {
                let hour = r.read_u8()?;
                let minute = r.read_u8()?;
                let second = r.read_u8()?;
                let microsecond = self.read_microsecond(r)?;
                let t = Time {
                    hour,
                    minute,
                    second,
                    microsecond,
                };
                if !t.in_range() {
                    return Err(Error::MalformedInput {
                        offset: tag_offset,
                        reason: "time component out of range".into(),
                    });
                }
                Value::Time(t)
            }
            tag::DURATION => Value::Duration(Duration {
                days: r.read_varint_signed()?,
                seconds: r.read_varint_signed()?,
                microseconds: r.read_varint_signed()?,
            }),
            tag::DECIMAL => {
                let sign = r.read_u8()?;
                if sign != SIGN_PLUS && sign != SIGN_MINUS {
                    return Err(r.malformed(format!("invalid decimal sign byte {sign}")));
                }
                let len = r.read_len()?;
                if len == 0 {
                    return Err(r.malformed("decimal with empty coefficient"));
                }
                let digits = r.read_exact(len)?.to_vec();
                if digits.iter().any(|&d| d > 9) {
                    return Err(Error::MalformedInput {
                        offset: tag_offset,
                        reason: "decimal digit out of range".into(),
                    });
                }
                let exponent = r.read_varint_signed()?;
                Value::Decimal(crate::value::Decimal {
                    negative: sign == SIGN_MINUS,
                    digits,
                    exponent,
                })
            }
            tag::UID => {
                let bytes = r.read_exact(16)?;
                Value::Uid(Uuid::from_bytes(
                    <[u8; 16]>::try_from(bytes).expect("16-byte slice"),
                ))
            }
            tag::LIST => Value::List(self.read_elements(r, depth)?),
            tag::TUPLE => Value::Tuple(self.read_elements(r, depth)?),
            tag::RANGE => Value::Range {
                start: r.read_bigint()?,
                stop: r.read_bigint()?,
                step: r.read_bigint()?,
            },
            tag::STRUCT => {
                let name = self.read_str(r)?;
                let count = r.read_count()?;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    let field = self.read_str(r)?;
                    let value = self.read_value(r, depth + 1)?;
                    fields.push((field, value));
                }
                Value::Struct { name, fields }
            }
            tag::MAP => Value::Map(self.read_pairs(r, depth)?),
            tag::MULTIMAP => {
                let count = r.read_count()?;
                let mut maps = Vec::with_capacity(count);
                for _ in 0..count {
                    maps.push(self.read_pairs(r, depth)?);
                }
                Value::MultiMap(maps)
            }
            tag::COUNTMAP => {
                let count = r.read_count()?;
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
                    let count_offset = r.position();
                    let n = r.read_bigint()?;
                    if n.is_negative() {
                        return Err(Error::MalformedInput {
                            offset: count_offset,
                            reason: "negative count in count mapping".into(),
                        });
                    }
                    pairs.push((key, n));
                }
                Value::CountMap(pairs)
            }
            tag::SET => Value::Set(self.read_unique_elements(r, depth)?),
            tag::FROZENSET => Value::FrozenSet(self.read_unique_elements(r, depth)?),
            tag::PATH => {
                let anchor = match r.read_u8()? {
                    0 => None,
                    1 => Some(self.read_str(r)?),
                    other => {
                        return Err(r.malformed(format!("invalid anchor flag {other}")));
                    }
                };
                let count = r.read_count()?;
                let mut segments = Vec::with_capacity(count);
                for _ in 0..count {
                    segments.push(self.read_str(r)?);
                }
                Value::Path { anchor, segments }
            }
            other => {
                return Err(Error::UnsupportedType {
                    what: format!("tag {other}"),
                    location: format!("offset {tag_offset}"),
                });
            }
        };
        Ok(value)
    }

    fn read_year(&self, r: &mut Reader<'_>) -> Result<i32> {
        let year = r.read_varint_signed()?;
        i32::try_from(year).map_err(|_| r.malformed("year out of range"))
    }

    fn read_microsecond(&self, r: &mut Reader<'_>) -> Result<u32> {
        let micros = r.read_varint()?;
        u32::try_from(micros).map_err(|_| r.malformed("microsecond out of range"))
    }
}
