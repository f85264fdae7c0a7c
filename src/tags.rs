//! Header byte layout of the bitspack wire format.
//!
//! Every encoded value starts with exactly one header byte. The 256 possible
//! header values are split into contiguous, disjoint ranges; the range a byte
//! falls in decides the value category and, for small values, the value or
//! size itself. All multi-byte payloads are little-endian.
//!
//! | Header          | Meaning                                             |
//! |-----------------|-----------------------------------------------------|
//! | `0x00..=0x7F`   | immediate integer `-64..=63`                        |
//! | `0x80..=0x8F`   | 12-bit zigzag integer, one payload byte             |
//! | `0x90..=0x96`   | sized zigzag integer, 2..=8 payload bytes           |
//! | `0x97`, `0x98`  | `false`, `true`                                     |
//! | `0x99..=0x9C`   | half, bfloat16, float32, float64                    |
//! | `0x9D`, `0x9E`  | object begin, object end                            |
//! | `0x9F`, `0xA0`  | empty map, sized map (varint count - 1)             |
//! | `0xA1..=0xB1`   | array with 0..=16 elements                          |
//! | `0xB2`          | array, varint count - 17                            |
//! | `0xB3`          | NUL-terminated string                               |
//! | `0xB4..=0xFD`   | sized string / byte array, 0..=73 bytes             |
//! | `0xFE`          | sized string / byte array, varint length - 74       |
//! | `0xFF`          | reserved                                            |

/// Smallest integer stored directly in the header byte.
pub const IMMEDIATE_INTEGER_MIN: i64 = -64;
/// Largest integer stored directly in the header byte.
pub const IMMEDIATE_INTEGER_MAX: i64 = 63;

pub const BEG_IMMEDIATE_INTEGER: u8 = 0x00;
pub const END_IMMEDIATE_INTEGER: u8 = 0x7F;
/// Header low nibble carries zigzag bits 0..4, payload byte bits 4..12
pub const BEG_12B_INTEGER: u8 = 0x80;
pub const END_12B_INTEGER: u8 = 0x8F;
/// Payload length is `header - BEG_SIZED_INTEGER + 2`
pub const BEG_SIZED_INTEGER: u8 = 0x90;
pub const END_SIZED_INTEGER: u8 = 0x96;

pub const BEG_BOOLEAN: u8 = 0x97;
pub const BOOLEAN_FALSE: u8 = 0x97;
pub const BOOLEAN_TRUE: u8 = 0x98;

/// First float header; `header - BEG_FLOATS` selects the precision
pub const BEG_FLOATS: u8 = 0x99;
pub const BEG_HALF: u8 = 0x99;
pub const BEG_BFLOAT: u8 = 0x9A;
pub const BEG_FLOAT: u8 = 0x9B;
pub const BEG_DOUBLE: u8 = 0x9C;

pub const BEG_OBJECT: u8 = 0x9D;
pub const END_OBJECT: u8 = 0x9E;

pub const BEG_MAP_EMPTY: u8 = 0x9F;
/// Followed by a varint holding `pairs - 1`
pub const BEG_MAP_SIZED: u8 = 0xA0;

pub const IMMEDIATE_ARRAY_MAX_SIZE: usize = 16;
pub const BEG_ARRAY_IMMEDIATE_SIZED: u8 = 0xA1;
pub const END_ARRAY_IMMEDIATE_SIZED: u8 = 0xB1;
/// Followed by a varint holding `elements - 17`
pub const BEG_ARRAY_VAR_SIZED: u8 = 0xB2;

pub const BEG_CSTRING: u8 = 0xB3;

pub const IMMEDIATE_STRING_MAX_SIZE: usize = 73;
pub const BEG_STRING_IMMEDIATE_SIZED: u8 = 0xB4;
pub const END_STRING_IMMEDIATE_SIZED: u8 = 0xFD;
/// Followed by a varint holding `length - 74`
pub const BEG_STRING_VAR_SIZED: u8 = 0xFE;

pub const RESERVED: u8 = 0xFF;

/// Coarse category of an encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Float,
    Boolean,
    String,
    CString,
    Array,
    Map,
    ObjectBegin,
    ObjectEnd,
    /// Reserved header byte, or the cursor is at the end of the buffer.
    Error,
}

/// Category of an encoded value, with the float precision spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailedType {
    Integer,
    Half,
    BFloat,
    Float,
    Double,
    Boolean,
    String,
    CString,
    Array,
    Map,
    ObjectBegin,
    ObjectEnd,
    Error,
}

impl DetailedType {
    /// Folds the float precisions into [`ValueType::Float`].
    pub const fn coarse(self) -> ValueType {
        match self {
            DetailedType::Integer => ValueType::Integer,
            DetailedType::Half
            | DetailedType::BFloat
            | DetailedType::Float
            | DetailedType::Double => ValueType::Float,
            DetailedType::Boolean => ValueType::Boolean,
            DetailedType::String => ValueType::String,
            DetailedType::CString => ValueType::CString,
            DetailedType::Array => ValueType::Array,
            DetailedType::Map => ValueType::Map,
            DetailedType::ObjectBegin => ValueType::ObjectBegin,
            DetailedType::ObjectEnd => ValueType::ObjectEnd,
            DetailedType::Error => ValueType::Error,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self.coarse(), ValueType::Float)
    }
}

const fn classify(header: u8) -> DetailedType {
    match header {
        BEG_IMMEDIATE_INTEGER..=END_SIZED_INTEGER => DetailedType::Integer,
        BOOLEAN_FALSE | BOOLEAN_TRUE => DetailedType::Boolean,
        BEG_HALF => DetailedType::Half,
        BEG_BFLOAT => DetailedType::BFloat,
        BEG_FLOAT => DetailedType::Float,
        BEG_DOUBLE => DetailedType::Double,
        BEG_OBJECT => DetailedType::ObjectBegin,
        END_OBJECT => DetailedType::ObjectEnd,
        BEG_MAP_EMPTY | BEG_MAP_SIZED => DetailedType::Map,
        BEG_ARRAY_IMMEDIATE_SIZED..=BEG_ARRAY_VAR_SIZED => DetailedType::Array,
        BEG_CSTRING => DetailedType::CString,
        BEG_STRING_IMMEDIATE_SIZED..=BEG_STRING_VAR_SIZED => DetailedType::String,
        RESERVED => DetailedType::Error,
    }
}

const fn build_header_types() -> [DetailedType; 256] {
    let mut table = [DetailedType::Error; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

/// Detailed type of every possible header byte.
pub static HEADER_TYPES: [DetailedType; 256] = build_header_types();

/// Looks up the detailed type of a header byte.
#[inline]
pub fn detailed_type_of(header: u8) -> DetailedType {
    HEADER_TYPES[header as usize]
}
