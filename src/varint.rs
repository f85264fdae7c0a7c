//! Prefix varint and zigzag mapping.
//!
//! A varint occupies 1..=9 bytes. The number of leading one-bits in the first
//! byte is the number of bytes that follow it. The first byte keeps the low
//! bits of the value below its prefix, the following bytes hold the remaining
//! high bits in little-endian order.
//!
//! | total bytes | first byte   | value bits |
//! |-------------|--------------|------------|
//! | 1           | `0xxxxxxx`   | 7          |
//! | 2           | `10xxxxxx`   | 14         |
//! | 3           | `110xxxxx`   | 21         |
//! | ...         | ...          | ...        |
//! | 8           | `11111110`   | 56         |
//! | 9           | `11111111`   | 64         |


use crate::sink::ByteSink;

/// Longest possible varint encoding.
pub const MAX_VARINT_LEN: usize = 9;

// Indexed by the total encoded length.
const MASKS: [u8; 10] = [0x00, 0x7F, 0x3F, 0x1F, 0x0F, 0x07, 0x03, 0x01, 0x00, 0x00];
const PREFIXES: [u8; 10] = [0x00, 0x00, 0x80, 0xC0, 0xE0, 0xF0, 0xF8, 0xFC, 0xFE, 0xFF];
const SHIFTS: [u32; 10] = [0, 7, 6, 5, 4, 3, 2, 1, 0, 0];

/// Maps a signed value onto the unsigned range so that small magnitudes stay small.
///
/// The sign lands in the lowest bit; negative magnitudes are one's-complemented.
#[inline]
pub const fn zigzag_encode(value: i64) -> u64 {
    let uv = value as u64;
    if value < 0 {
        (!uv << 1) | 1
    } else {
        uv << 1
    }
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub const fn zigzag_decode(encoded: u64) -> i64 {
    let magnitude = encoded >> 1;
    if encoded & 1 == 1 {
        !magnitude as i64
    } else {
        magnitude as i64
    }
}

/// Number of bytes the shortest encoding of `value` takes.
#[inline]
pub const fn encoded_len(value: u64) -> usize {
    if value <= 0x7F {
        return 1;
    }
    let bits = (u64::BITS - value.leading_zeros()) as usize;
    if bits > 56 {
        MAX_VARINT_LEN
    } else {
        (bits + 6) / 7
    }
}

/// Encodes `value` in its shortest form, returning the scratch buffer and the used length.
pub fn encode_var_uint(value: u64) -> ([u8; MAX_VARINT_LEN], usize) {
    let mut out = [0u8; MAX_VARINT_LEN];
    let len = encoded_len(value);
    if len == 1 {
        out[0] = value as u8;
        return (out, 1);
    }
    out[0] = (value as u8 & MASKS[len]) | PREFIXES[len];
    let high = value >> SHIFTS[len];
    out[1..len].copy_from_slice(&high.to_le_bytes()[..len - 1]);
    (out, len)
}

/// Decodes a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed, or `None` when `buf`
/// is shorter than the first byte announces. Non-canonical (over-long)
/// encodings are accepted.
pub fn decode_var_uint(buf: &[u8]) -> Option<(u64, usize)> {
    let header = *buf.first()?;
    let extra = header.leading_ones() as usize;
    if extra == 0 {
        return Some((header as u64, 1));
    }
    let tail = buf.get(1..1 + extra)?;
    let mut bytes = [0u8; 8];
    bytes[..extra].copy_from_slice(tail);
    let len = extra + 1;
    let value = (u64::from_le_bytes(bytes) << SHIFTS[len]) | (header & MASKS[len]) as u64;
    Some((value, len))
}

/// Appends the shortest varint encoding of `value` to `sink`.
pub fn write_var_uint<S: ByteSink + ?Sized>(sink: &mut S, value: u64) {
    let (bytes, len) = encode_var_uint(value);
    sink.put_slice(&bytes[..len]);
}

/// Appends the zigzag-mapped varint encoding of `value` to `sink`.
pub fn write_var_int<S: ByteSink + ?Sized>(sink: &mut S, value: i64) {
    write_var_uint(sink, zigzag_encode(value));
}
