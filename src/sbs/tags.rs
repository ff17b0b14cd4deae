//! Tag registries for the current and legacy wire formats.
//!
//! A tag precedes every encoded value and selects its decode routine. Two
//! tables coexist: the current table, which the encoder emits and which new
//! tags are appended to, and the frozen first-generation table, which is
//! decode-only. The leading stream marker picks the table for the whole
//! stream.

/// Stream marker selecting the current dispatch table.
pub const FORMAT_CURRENT: u8 = 0xFD;
/// Stream marker selecting the legacy (first-generation) dispatch table.
pub const FORMAT_LEGACY: u8 = 0xFE;

/// Current-format tags. Encoded as varints; values stay below 128 so every
/// current tag is one byte on the wire, with room to grow past 255 without
/// a layout change.
pub(crate) mod current {
    /// Null.
    pub const NULL: u64 = 0;
    /// Boolean false.
    pub const FALSE: u64 = 1;
    /// Boolean true.
    pub const TRUE: u64 = 2;
    /// Arbitrary-precision integer.
    pub const INT: u64 = 3;
    /// 64-bit float.
    pub const FLOAT: u64 = 4;
    /// Complex number.
    pub const COMPLEX: u64 = 5;
    /// Ellipsis marker.
    pub const ELLIPSIS: u64 = 6;
    /// UTF-8 string.
    pub const STR: u64 = 7;
    /// Immutable bytes.
    pub const BYTES: u64 = 8;
    /// Mutable bytes.
    pub const BYTEARRAY: u64 = 9;
    /// View descriptor over bytes.
    pub const VIEW: u64 = 10;
    /// Date and time.
    pub const DATETIME: u64 = 11;
    /// Calendar date.
    pub const DATE: u64 = 12;
    /// Wall-clock time.
    pub const TIME: u64 = 13;
    /// Elapsed-time span.
    pub const DURATION: u64 = 14;
    /// Exact decimal.
    pub const DECIMAL: u64 = 15;
    /// 128-bit unique identifier.
    pub const UID: u64 = 16;
    /// Ordered mutable sequence.
    pub const LIST: u64 = 17;
    /// Ordered immutable sequence.
    pub const TUPLE: u64 = 18;
    /// Integer range.
    pub const RANGE: u64 = 19;
    /// Named record.
    pub const STRUCT: u64 = 20;
    /// Ordered mapping.
    pub const MAP: u64 = 21;
    /// Priority-ordered mapping chain.
    pub const MULTIMAP: u64 = 22;
    /// Count mapping.
    pub const COUNTMAP: u64 = 23;
    /// Set of unique elements.
    pub const SET: u64 = 24;
    /// Immutable set of unique elements.
    pub const FROZENSET: u64 = 25;
    /// Filesystem path.
    pub const PATH: u64 = 26;
}

/// Legacy-format tags (decode-only, frozen).
///
/// The first-generation layout multiplexes each kind with a
/// length-representation family: `E` empty, `1` one size byte, `2` two
/// little-endian size bytes, `D` a size-byte count followed by that many
/// little-endian size bytes. Integers carry their byte count in the tag
/// (`INT_1`..`INT_5`) or dynamically (`INT_D1`, `INT_D2`).
#[allow(dead_code)]
pub(crate) mod legacy {
    pub const STR_E: u8 = 0;
    pub const STR_1: u8 = 1;
    pub const STR_2: u8 = 2;
    pub const STR_D: u8 = 3;

    pub const INT_1: u8 = 4;
    pub const INT_2: u8 = 5;
    pub const INT_3: u8 = 6;
    pub const INT_4: u8 = 7;
    pub const INT_5: u8 = 8;
    pub const INT_D1: u8 = 9;
    pub const INT_D2: u8 = 10;

    pub const FLOAT_S: u8 = 11;
    pub const BOOL_T: u8 = 12;
    pub const BOOL_F: u8 = 13;
    pub const COMPLEX_S: u8 = 14;
    pub const NONE_S: u8 = 15;
    pub const ELLIPSIS_S: u8 = 16;

    pub const BYTES_E: u8 = 17;
    pub const BYTES_1: u8 = 18;
    pub const BYTES_2: u8 = 19;
    pub const BYTES_D: u8 = 20;

    pub const BYTEARR_E: u8 = 21;
    pub const BYTEARR_1: u8 = 22;
    pub const BYTEARR_2: u8 = 23;
    pub const BYTEARR_D: u8 = 24;

    pub const LIST_E: u8 = 25;
    pub const LIST_1: u8 = 26;
    pub const LIST_2: u8 = 27;
    pub const LIST_D: u8 = 28;

    pub const SET_E: u8 = 29;
    pub const SET_1: u8 = 30;
    pub const SET_2: u8 = 31;
    pub const SET_D: u8 = 32;

    pub const TUPLE_E: u8 = 33;
    pub const TUPLE_1: u8 = 34;
    pub const TUPLE_2: u8 = 35;
    pub const TUPLE_D: u8 = 36;

    pub const DICT_E: u8 = 37;
    pub const DICT_1: u8 = 38;
    pub const DICT_2: u8 = 39;
    pub const DICT_D: u8 = 40;

    pub const FSET_E: u8 = 41;
    pub const FSET_1: u8 = 42;
    pub const FSET_2: u8 = 43;
    pub const FSET_D: u8 = 44;

    pub const DATETIME_DT: u8 = 45;
    pub const DATETIME_TD: u8 = 46;
    pub const DATETIME_D: u8 = 47;
    pub const DATETIME_T: u8 = 48;

    pub const UUID_S: u8 = 49;

    pub const MEMVIEW_E: u8 = 50;
    pub const MEMVIEW_1: u8 = 51;
    pub const MEMVIEW_2: u8 = 52;
    pub const MEMVIEW_D: u8 = 53;

    pub const DECIMAL_1: u8 = 54;
    pub const DECIMAL_2: u8 = 55;
    pub const DECIMAL_D: u8 = 56;

    pub const DEQUE_E: u8 = 57;
    pub const DEQUE_1: u8 = 58;
    pub const DEQUE_2: u8 = 59;
    pub const DEQUE_D: u8 = 60;

    pub const COUNTER_E: u8 = 61;
    pub const COUNTER_1: u8 = 62;
    pub const COUNTER_2: u8 = 63;
    pub const COUNTER_D: u8 = 64;
}
