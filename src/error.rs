//! Error types for bytebridge.

use thiserror::Error;

/// Result type alias using bytebridge's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for codec and segment operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A value kind (or wire tag) has no encoding or decoding rule.
    #[error("unsupported type: {what} at {location}")]
    UnsupportedType {
        /// Description of the offending kind or tag.
        what: String,
        /// Key/index path (encode) or byte offset (decode).
        location: String,
    },

    /// The byte stream is structurally invalid.
    #[error("malformed input at offset {offset}: {reason}")]
    MalformedInput {
        /// Byte offset where the problem was detected.
        offset: usize,
        /// What was wrong with the bytes.
        reason: String,
    },

    /// The byte stream ended before the value it declares.
    #[error("truncated input at offset {offset}: {needed} more byte(s) needed")]
    TruncatedInput {
        /// Byte offset of the short read.
        offset: usize,
        /// How many further bytes the declared value required.
        needed: usize,
    },

    /// Extra bytes remained after a complete top-level value.
    #[error("{remaining} trailing byte(s) after value ending at offset {offset}")]
    TrailingData {
        /// Offset one past the decoded value.
        offset: usize,
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// Value nesting exceeds the configured depth bound.
    #[error("nesting depth exceeds the configured limit of {limit}")]
    RecursionLimit {
        /// The configured maximum depth.
        limit: usize,
    },

    /// A mapping key or set element occurred more than once.
    #[error("duplicate key at {location}")]
    DuplicateKey {
        /// Key/index path (encode) or byte offset (decode).
        location: String,
    },

    /// A legacy-format construct has no lossless current-format mapping.
    #[error("unsupported legacy construct at offset {offset}: {reason}")]
    UnsupportedLegacyConstruct {
        /// Byte offset of the construct.
        offset: usize,
        /// Why the construct cannot be represented.
        reason: String,
    },

    /// A segment with this name already exists.
    #[error("segment '{0}' already exists")]
    AlreadyExists(String),

    /// No segment with this name exists.
    #[error("segment '{0}' not found")]
    NotFound(String),

    /// The segment exists but nothing has ever been written to it.
    #[error("segment '{0}' is empty")]
    Empty(String),

    /// The segment lock could not be acquired before the deadline.
    #[error("timed out waiting for the lock on segment '{0}'")]
    LockTimeout(String),

    /// Invalid segment name or on-disk segment state.
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// System call error (via rustix).
    #[error("system error: {0}")]
    System(#[from] rustix::io::Errno),
}
