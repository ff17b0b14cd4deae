//! # bytebridge
//!
//! A self-describing binary value codec with a shared-memory exchange
//! bridge for passing one serialized value between processes.
//!
//! ## Features
//!
//! - **SBS codec**: tag-dispatched binary format covering scalars,
//!   arbitrary-precision integers, exact decimals, temporal values,
//!   identifiers, and arbitrarily nested containers
//! - **Two format generations**: the current format plus a frozen legacy
//!   table, both decoded transparently via the stream's format marker
//! - **Hostile-input safe**: bounds-checked decoding, allocation guards,
//!   and a configurable nesting bound instead of unbounded recursion
//! - **Shared segments**: named, lock-guarded shared-memory regions that
//!   store one encoded payload and grow on demand
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bytebridge::{decode, encode, Segment, Value};
//!
//! // Codec only
//! let value = Value::List(vec![Value::from(42i64), Value::from("answer")]);
//! let bytes = encode(&value)?;
//! assert_eq!(decode(&bytes)?, value);
//!
//! // Cross-process exchange
//! let seg = Segment::create("scores", 4096)?;
//! seg.write(&value)?;
//! let other = Segment::attach("scores")?; // e.g. from another process
//! assert_eq!(other.read()?, value);
//! Segment::remove("scores")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod sbs;
pub mod segment;
pub mod value;

pub use error::{Error, Result};
pub use sbs::{decode, decode_prefix, decode_with, encode, encode_with, CodecConfig};
pub use segment::Segment;
pub use value::Value;
