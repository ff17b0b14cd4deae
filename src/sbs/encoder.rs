//! Depth-bounded pre-order encoder.
//!
//! One traversal of the value tree into one output buffer: tag, then
//! payload, composites writing their count followed by each child in turn.
//! The buffer is only handed back on full success, so a failed encode never
//! yields partial output.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::sbs::primitive::{Writer, SIGN_MINUS, SIGN_PLUS};
use crate::sbs::tags::{current as tag, FORMAT_CURRENT};
use crate::sbs::CodecConfig;
use crate::value::{Value, View};

/// Encode a value into a fresh current-format stream.
pub(crate) fn encode_value(value: &Value, config: &CodecConfig) -> Result<Vec<u8>> {
    let mut enc = Encoder {
        out: Writer::new(),
        path: Vec::new(),
        max_depth: config.max_depth,
    };
    enc.out.write_u8(FORMAT_CURRENT);
    enc.write_value(value, 0)?;
    Ok(enc.out.into_inner())
}

/// One step of the key/index path to the node being encoded.
enum PathSegment {
    Index(usize),
    Field(String),
}

struct Encoder {
    out: Writer,
    path: Vec<PathSegment>,
    max_depth: usize,
}

impl Encoder {
    /// Render the current path for diagnostics, e.g. `$[2].name`.
    fn location(&self) -> String {
        use std::fmt::Write as _;
        let mut s = String::from("$");
        for seg in &self.path {
            match seg {
                PathSegment::Index(i) => {
                    let _ = write!(s, "[{i}]");
                }
                PathSegment::Field(f) => {
                    let _ = write!(s, ".{f}");
                }
            }
        }
        s
    }

    fn unsupported(&self, what: impl Into<String>) -> Error {
        Error::UnsupportedType {
            what: what.into(),
            location: self.location(),
        }
    }

    fn write_str(&mut self, s: &str) {
        self.out.write_varint(s.len() as u64);
        self.out.write_bytes(s.as_bytes());
    }

    fn write_blob(&mut self, t: u64, bytes: &[u8]) {
        self.out.write_varint(t);
        self.out.write_varint(bytes.len() as u64);
        self.out.write_bytes(bytes);
    }

    /// Encode the children of a sequence, tracking each index in the path.
    fn write_elements(&mut self, items: &[Value], depth: usize) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            self.path.push(PathSegment::Index(i));
            self.write_value(item, depth + 1)?;
            self.path.pop();
        }
        Ok(())
    }

    /// Encode set elements, rejecting duplicates by their encoded bytes.
    fn write_unique_elements(&mut self, items: &[Value], depth: usize) -> Result<()> {
        let mut seen: HashSet<Vec<u8>> = HashSet::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.path.push(PathSegment::Index(i));
            let start = self.out.len();
            self.write_value(item, depth + 1)?;
            let encoded = self.out.written()[start..].to_vec();
            if !seen.insert(encoded) {
                return Err(Error::DuplicateKey {
                    location: self.location(),
                });
            }
            self.path.pop();
        }
        Ok(())
    }

    /// Encode mapping pairs, rejecting duplicate keys by their encoded bytes.
    fn write_pairs(&mut self, pairs: &[(Value, Value)], depth: usize) -> Result<()> {
        let mut seen: HashSet<Vec<u8>> = HashSet::with_capacity(pairs.len());
        for (i, (key, value)) in pairs.iter().enumerate() {
            self.path.push(PathSegment::Index(i));
            let start = self.out.len();
            self.write_value(key, depth + 1)?;
            let encoded = self.out.written()[start..].to_vec();
            if !seen.insert(encoded) {
                return Err(Error::DuplicateKey {
                    location: self.location(),
                });
            }
            self.write_value(value, depth + 1)?;
            self.path.pop();
        }
        Ok(())
    }

    fn write_value(&mut self, value: &Value, depth: usize) -> Result<()> {
        if depth >= self.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.max_depth,
            });
        }
        match value {
            Value::Null => self.out.write_varint(tag::NULL),
            Value::Bool(false) => self.out.write_varint(tag::FALSE),
            Value::Bool(true) => self.out.write_varint(tag::TRUE),
            Value::Int(v) => {
                self.out.write_varint(tag::INT);
                self.out.write_bigint(v);
            }
            Value::Float(v) => {
                self.out.write_varint(tag::FLOAT);
                self.out.write_f64(*v);
            }
            Value::Complex { re, im } => {
                self.out.write_varint(tag::COMPLEX);
                self.out.write_f64(*re);
                self.out.write_f64(*im);
            }
            Value::Ellipsis => self.out.write_varint(tag::ELLIPSIS),
            Value::Str(s) => {
                self.out.write_varint(tag::STR);
                self.write_str(s);
            }
            Value::Bytes(b) => self.write_blob(tag::BYTES, b),
            Value::ByteArray(b) => self.write_blob(tag::BYTEARRAY, b),
            Value::View(View {
                payload,
                offset,
                len,
                item_size,
            }) => {
                self.write_blob(tag::VIEW, payload);
                self.out.write_varint(*offset);
                self.out.write_varint(*len);
                self.out.write_varint(*item_size);
            }
            Value::DateTime(dt) => {
                if !dt.in_range() {
                    return Err(self.unsupported("datetime with out-of-range components"));
                }
                self.out.write_varint(tag::DATETIME);
                self.out.write_varint_signed(i64::from(dt.year));
                self.out.write_u8(dt.month);
                self.out.write_u8(dt.day);
                self.out.write_u8(dt.hour);
                self.out.write_u8(dt.minute);
                self.out.write_u8(dt.second);
                self.out.write_varint(u64::from(dt.microsecond));
                match dt.offset_secs {
                    Some(offset) => {
                        self.out.write_u8(1);
                        self.out.write_varint_signed(i64::from(offset));
                    }
                    None => self.out.write_u8(0),
                }
            }
            Value::Date(d) => {
                if !d.in_range() {
                    return Err(self.unsupported("date with out-of-range components"));
                }
                self.out.write_varint(tag::DATE);
                self.out.write_varint_signed(i64::from(d.year));
                self.out.write_u8(d.month);
                self.out.write_u8(d.day);
            }
            Value::Time(t) => {
                if !t.in_range() {
                    return Err(self.unsupported("time with out-of-range components"));
                }
                self.out.write_varint(tag::TIME);
                self.out.write_u8(t.hour);
                self.out.write_u8(t.minute);
                self.out.write_u8(t.second);
                self.out.write_varint(u64::from(t.microsecond));
            }
            Value::Duration(d) => {
                self.out.write_varint(tag::DURATION);
                self.out.write_varint_signed(d.days);
                self.out.write_varint_signed(d.seconds);
                self.out.write_varint_signed(d.microseconds);
            }
            Value::Decimal(d) => {
                if d.digits.is_empty() || d.digits.iter().any(|&digit| digit > 9) {
                    return Err(self.unsupported("decimal with invalid coefficient digits"));
                }
                self.out.write_varint(tag::DECIMAL);
                self.out
                    .write_u8(if d.negative { SIGN_MINUS } else { SIGN_PLUS });
                self.out.write_varint(d.digits.len() as u64);
                self.out.write_bytes(&d.digits);
                self.out.write_varint_signed(d.exponent);
            }
            Value::Uid(uid) => {
                self.out.write_varint(tag::UID);
                self.out.write_bytes(uid.as_bytes());
            }
            Value::List(items) => {
                self.out.write_varint(tag::LIST);
                self.out.write_varint(items.len() as u64);
                self.write_elements(items, depth)?;
            }
            Value::Tuple(items) => {
                self.out.write_varint(tag::TUPLE);
                self.out.write_varint(items.len() as u64);
                self.write_elements(items, depth)?;
            }
            Value::Range { start, stop, step } => {
                self.out.write_varint(tag::RANGE);
                self.out.write_bigint(start);
                self.out.write_bigint(stop);
                self.out.write_bigint(step);
            }
            Value::Struct { name, fields } => {
                self.out.write_varint(tag::STRUCT);
                self.write_str(name);
                self.out.write_varint(fields.len() as u64);
                for (field, value) in fields {
                    self.write_str(field);
                    self.path.push(PathSegment::Field(field.clone()));
                    self.write_value(value, depth + 1)?;
                    self.path.pop();
                }
            }
            Value::Map(pairs) => {
                self.out.write_varint(tag::MAP);
                self.out.write_varint(pairs.len() as u64);
                self.write_pairs(pairs, depth)?;
            }
            Value::MultiMap(maps) => {
                self.out.write_varint(tag::MULTIMAP);
                self.out.write_varint(maps.len() as u64);
                for (i, pairs) in maps.iter().enumerate() {
                    self.path.push(PathSegment::Index(i));
                    self.out.write_varint(pairs.len() as u64);
                    self.write_pairs(pairs, depth)?;
                    self.path.pop();
                }
            }
            Value::CountMap(pairs) => {
                self.out.write_varint(tag::COUNTMAP);
                self.out.write_varint(pairs.len() as u64);
                let mut seen: HashSet<Vec<u8>> = HashSet::with_capacity(pairs.len());
                for (i, (key, count)) in pairs.iter().enumerate() {
                    self.path.push(PathSegment::Index(i));
                    if count.is_negative() {
                        return Err(self.unsupported("negative count in count mapping"));
                    }
                    let start = self.out.len();
                    self.write_value(key, depth + 1)?;
                    let encoded = self.out.written()[start..].to_vec();
                    if !seen.insert(encoded) {
                        return Err(Error::DuplicateKey {
                            location: self.location(),
                        });
                    }
                    self.out.write_bigint(count);
                    self.path.pop();
                }
            }
            Value::Set(items) => {
                self.out.write_varint(tag::SET);
                self.out.write_varint(items.len() as u64);
                self.write_unique_elements(items, depth)?;
            }
            Value::FrozenSet(items) => {
                self.out.write_varint(tag::FROZENSET);
                self.out.write_varint(items.len() as u64);
                self.write_unique_elements(items, depth)?;
            }
            Value::Path { anchor, segments } => {
                self.out.write_varint(tag::PATH);
                match anchor {
                    Some(a) => {
                        self.out.write_u8(1);
                        self.write_str(a);
                    }
                    None => self.out.write_u8(0),
                }
                self.out.write_varint(segments.len() as u64);
                for segment in segments {
                    self.write_str(segment);
                }
            }
        }
        Ok(())
    }
}
