//! Decoding cursor over a borrowed byte slice.

use std::ffi::CStr;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use bytes::Buf;

use crate::float::{bfloat_to_f32, half_to_f32};
use crate::tags::*;
use crate::varint::{decode_var_uint, zigzag_decode};
use crate::{Decode, Error, Result};

/// Accumulated decode failures of a [`Reader`].
///
/// Bits are only ever added: once a stream is flagged it stays flagged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadErrors(u32);

impl ReadErrors {
    pub const OK: ReadErrors = ReadErrors(0);
    /// Fewer bytes remain than the value being read requires.
    pub const BUFFER_TOO_SMALL: ReadErrors = ReadErrors(1);
    /// The header byte does not belong to the requested value kind.
    pub const TYPE_MISMATCH: ReadErrors = ReadErrors(2);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ReadErrors) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ReadErrors {
    type Output = ReadErrors;

    fn bitor(self, rhs: ReadErrors) -> ReadErrors {
        ReadErrors(self.0 | rhs.0)
    }
}

impl BitOrAssign for ReadErrors {
    fn bitor_assign(&mut self, rhs: ReadErrors) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ReadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        if self.contains(ReadErrors::BUFFER_TOO_SMALL) {
            set.entry(&format_args!("BUFFER_TOO_SMALL"));
        }
        if self.contains(ReadErrors::TYPE_MISMATCH) {
            set.entry(&format_args!("TYPE_MISMATCH"));
        }
        set.finish()
    }
}

/// A float as it was stored, before conversion to the requested precision.
#[derive(Clone, Copy)]
enum StoredFloat {
    Single(f32),
    Double(f64),
}

impl StoredFloat {
    fn to_f32(self) -> f32 {
        match self {
            StoredFloat::Single(v) => v,
            StoredFloat::Double(v) => v as f32,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            StoredFloat::Single(v) => v as f64,
            StoredFloat::Double(v) => v,
        }
    }
}

/// Reads values from an encoded byte slice.
///
/// Read operations never fail loudly. A truncated or mismatched value raises a
/// bit in [`errors`](Reader::errors), the operation returns a zero/empty
/// value and decoding may continue. Check [`is_valid`](Reader::is_valid) or
/// [`finish`](Reader::finish) once after a whole value or message.
///
/// # Example
/// ```rust
/// use bitspack::{Reader, Writer};
///
/// let mut buf = Vec::new();
/// Writer::new(&mut buf).write_u32(300_000).write_str("hello");
///
/// let mut reader = Reader::new(&buf);
/// assert_eq!(reader.read_u32(), 300_000);
/// assert_eq!(reader.read_any_str(), "hello");
/// assert!(reader.finish().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buffer: &'a [u8],
    /// Unread tail of `buffer`.
    rest: &'a [u8],
    errors: ReadErrors,
}

macro_rules! narrowing_reads {
    ($($(#[$meta:meta])* $name:ident => $ty:ty;)*) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name(&mut self) -> $ty {
                self.read_i64() as $ty
            }
        )*
    };
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Reader {
            buffer,
            rest: buffer,
            errors: ReadErrors::OK,
        }
    }

    /// Starts reading at `offset`. An offset past the end leaves the reader
    /// at the end with [`ReadErrors::BUFFER_TOO_SMALL`] raised.
    pub fn with_offset(buffer: &'a [u8], offset: usize) -> Self {
        let mut reader = Reader::new(buffer);
        match buffer.get(offset..) {
            Some(rest) => reader.rest = rest,
            None => {
                reader.rest = &buffer[buffer.len()..];
                reader.set_error(ReadErrors::BUFFER_TOO_SMALL);
            }
        }
        reader
    }

    // --- status ---

    pub fn is_valid(&self) -> bool {
        self.errors.is_ok()
    }

    pub fn errors(&self) -> ReadErrors {
        self.errors
    }

    /// Converts the accumulated error bits into a `Result`.
    pub fn finish(&self) -> Result<()> {
        match Error::from_read_errors(self.errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn has_any_more(&self) -> bool {
        self.rest.has_remaining()
    }

    /// Current cursor position from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.buffer.len() - self.rest.len()
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn remaining_bytes(&self) -> usize {
        self.rest.remaining()
    }

    /// Raises error bits. Used by [`Decode`] impls that find a value which is
    /// well-formed on the wire but not acceptable for their type.
    pub fn set_error(&mut self, error: ReadErrors) {
        if !self.errors.contains(error) {
            let offset = self.offset();
            tracing::trace!(
                offset,
                header = ?self.buffer.get(offset.saturating_sub(1)),
                ?error,
                "bitspack read error"
            );
        }
        self.errors |= error;
    }

    // --- cursor primitives ---

    /// Checks that `len` more bytes are available, raising
    /// [`ReadErrors::BUFFER_TOO_SMALL`] when they are not.
    fn ensure(&mut self, len: usize) -> bool {
        if self.rest.remaining() < len {
            self.set_error(ReadErrors::BUFFER_TOO_SMALL);
            false
        } else {
            true
        }
    }

    fn take_header(&mut self) -> Option<u8> {
        self.ensure(1).then(|| self.rest.get_u8())
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if !self.ensure(len) {
            return None;
        }
        let rest: &'a [u8] = self.rest;
        self.rest.advance(len);
        Some(&rest[..len])
    }

    fn mismatch<T>(&mut self) -> Option<T> {
        self.set_error(ReadErrors::TYPE_MISMATCH);
        None
    }

    // --- introspection ---

    /// Detailed type of the next value without consuming it.
    ///
    /// Returns [`DetailedType::Error`] at the end of the buffer.
    pub fn next_detailed_type(&self) -> DetailedType {
        match self.rest.first() {
            Some(&header) => detailed_type_of(header),
            None => DetailedType::Error,
        }
    }

    pub fn next_type(&self) -> ValueType {
        self.next_detailed_type().coarse()
    }

    pub fn is_next_integer(&self) -> bool {
        self.next_detailed_type() == DetailedType::Integer
    }

    pub fn is_next_floating_point(&self) -> bool {
        self.next_type() == ValueType::Float
    }

    pub fn is_next_float16(&self) -> bool {
        self.next_detailed_type() == DetailedType::Half
    }

    pub fn is_next_bfloat16(&self) -> bool {
        self.next_detailed_type() == DetailedType::BFloat
    }

    pub fn is_next_float32(&self) -> bool {
        self.next_detailed_type() == DetailedType::Float
    }

    pub fn is_next_float64(&self) -> bool {
        self.next_detailed_type() == DetailedType::Double
    }

    pub fn is_next_bool(&self) -> bool {
        self.next_detailed_type() == DetailedType::Boolean
    }

    /// True for a sized string or byte array.
    pub fn is_next_string(&self) -> bool {
        self.next_detailed_type() == DetailedType::String
    }

    pub fn is_next_cstring(&self) -> bool {
        self.next_detailed_type() == DetailedType::CString
    }

    pub fn is_next_map(&self) -> bool {
        self.next_detailed_type() == DetailedType::Map
    }

    pub fn is_next_array(&self) -> bool {
        self.next_detailed_type() == DetailedType::Array
    }

    pub fn is_next_begin_object(&self) -> bool {
        self.next_detailed_type() == DetailedType::ObjectBegin
    }

    pub fn is_next_end_object(&self) -> bool {
        self.next_detailed_type() == DetailedType::ObjectEnd
    }

    // --- untyped varints ---

    fn take_var_uint(&mut self) -> Option<u64> {
        match decode_var_uint(self.rest) {
            Some((value, len)) => {
                self.rest.advance(len);
                Some(value)
            }
            None => {
                self.set_error(ReadErrors::BUFFER_TOO_SMALL);
                None
            }
        }
    }

    /// Reads a headerless varint.
    pub fn read_var_uint(&mut self) -> u64 {
        self.take_var_uint().unwrap_or(0)
    }

    /// Reads a headerless zigzag varint.
    pub fn read_var_int(&mut self) -> i64 {
        zigzag_decode(self.read_var_uint())
    }

    /// Reads a varint count stored as `count - bias`.
    fn take_var_count(&mut self, bias: usize) -> Option<usize> {
        let stored = self.take_var_uint()?;
        match usize::try_from(stored).ok().and_then(|n| n.checked_add(bias)) {
            Some(count) => Some(count),
            // larger than any buffer this reader could hold
            None => {
                self.set_error(ReadErrors::BUFFER_TOO_SMALL);
                None
            }
        }
    }

    // --- integers ---

    /// Reads an integer of any stored width.
    pub fn read_i64(&mut self) -> i64 {
        let Some(header) = self.take_header() else {
            return 0;
        };
        let zigzag = match header {
            BEG_IMMEDIATE_INTEGER..=END_IMMEDIATE_INTEGER => {
                return header as i64 + IMMEDIATE_INTEGER_MIN;
            }
            BEG_12B_INTEGER..=END_12B_INTEGER => {
                if !self.ensure(1) {
                    return 0;
                }
                (u64::from(self.rest.get_u8()) << 4) | u64::from(header - BEG_12B_INTEGER)
            }
            BEG_SIZED_INTEGER..=END_SIZED_INTEGER => {
                let len = (header - BEG_SIZED_INTEGER) as usize + 2;
                if !self.ensure(len) {
                    return 0;
                }
                self.rest.get_uint_le(len)
            }
            _ => {
                self.set_error(ReadErrors::TYPE_MISMATCH);
                return 0;
            }
        };
        zigzag_decode(zigzag)
    }

    /// Reads an integer written by [`Writer::write_u64`](crate::Writer::write_u64).
    #[inline]
    pub fn read_u64(&mut self) -> u64 {
        self.read_i64() as u64
    }

    narrowing_reads! {
        /// Narrowing reads truncate like an `as` cast; they never reject a value.
        read_i8 => i8;
        read_i16 => i16;
        read_i32 => i32;
        read_isize => isize;
        read_u8 => u8;
        read_u16 => u16;
        read_u32 => u32;
        read_usize => usize;
    }

    // --- booleans and object delimiters ---

    pub fn read_bool(&mut self) -> bool {
        match self.take_header() {
            Some(BOOLEAN_TRUE) => true,
            Some(BOOLEAN_FALSE) | None => false,
            Some(_) => {
                self.set_error(ReadErrors::TYPE_MISMATCH);
                false
            }
        }
    }

    fn expect_header(&mut self, expected: u8) {
        if let Some(header) = self.take_header() {
            if header != expected {
                self.set_error(ReadErrors::TYPE_MISMATCH);
            }
        }
    }

    pub fn read_begin_object(&mut self) {
        self.expect_header(BEG_OBJECT);
    }

    pub fn read_end_object(&mut self) {
        self.expect_header(END_OBJECT);
    }

    // --- floats ---

    fn take_float(&mut self, accept: impl Fn(u8) -> bool) -> Option<StoredFloat> {
        let header = self.take_header()?;
        if !accept(header) {
            return self.mismatch();
        }
        let width = match header {
            BEG_HALF | BEG_BFLOAT => 2,
            BEG_FLOAT => 4,
            BEG_DOUBLE => 8,
            _ => return self.mismatch(),
        };
        if !self.ensure(width) {
            return None;
        }
        Some(match header {
            BEG_HALF => StoredFloat::Single(half_to_f32(self.rest.get_u16_le())),
            BEG_BFLOAT => StoredFloat::Single(bfloat_to_f32(self.rest.get_u16_le())),
            BEG_FLOAT => StoredFloat::Single(self.rest.get_f32_le()),
            _ => StoredFloat::Double(self.rest.get_f64_le()),
        })
    }

    /// Reads a float stored at any precision, converting to `f32`.
    pub fn read_f32(&mut self) -> f32 {
        self.take_float(|_| true).map_or(0.0, StoredFloat::to_f32)
    }

    /// Reads a float stored at any precision, converting to `f64`.
    pub fn read_f64(&mut self) -> f64 {
        self.take_float(|_| true).map_or(0.0, StoredFloat::to_f64)
    }

    /// Reads a value that must have been stored as binary16.
    pub fn read_half(&mut self) -> f32 {
        self.take_float(|h| h == BEG_HALF)
            .map_or(0.0, StoredFloat::to_f32)
    }

    /// Reads a value that must have been stored as bfloat16.
    pub fn read_bfloat(&mut self) -> f32 {
        self.take_float(|h| h == BEG_BFLOAT)
            .map_or(0.0, StoredFloat::to_f32)
    }

    /// Reads a value that must have been stored as float32.
    pub fn read_float32(&mut self) -> f32 {
        self.take_float(|h| h == BEG_FLOAT)
            .map_or(0.0, StoredFloat::to_f32)
    }

    /// Reads a value that must have been stored as float64.
    pub fn read_float64(&mut self) -> f64 {
        self.take_float(|h| h == BEG_DOUBLE)
            .map_or(0.0, StoredFloat::to_f64)
    }

    // --- strings and byte arrays ---

    fn take_sized_len(&mut self) -> Option<usize> {
        let header = self.take_header()?;
        match header {
            BEG_STRING_IMMEDIATE_SIZED..=END_STRING_IMMEDIATE_SIZED => {
                Some((header - BEG_STRING_IMMEDIATE_SIZED) as usize)
            }
            BEG_STRING_VAR_SIZED => self.take_var_count(IMMEDIATE_STRING_MAX_SIZE + 1),
            _ => self.mismatch(),
        }
    }

    /// Reads the header of a sized byte array and returns its length.
    pub fn read_sized_byte_array_header(&mut self) -> usize {
        self.take_sized_len().unwrap_or(0)
    }

    /// Reads the header of a sized string and returns its length, not counting
    /// the stored terminator.
    pub fn read_sized_string_header(&mut self) -> usize {
        self.take_sized_len().unwrap_or(0)
    }

    /// Reads a c-string header and returns the distance to the terminator,
    /// leaving the cursor at the first content byte.
    ///
    /// A missing terminator raises [`ReadErrors::BUFFER_TOO_SMALL`].
    pub fn read_cstring_header(&mut self) -> usize {
        let Some(header) = self.take_header() else {
            return 0;
        };
        if header != BEG_CSTRING {
            self.set_error(ReadErrors::TYPE_MISMATCH);
            return 0;
        }
        match self.rest.iter().position(|&b| b == 0) {
            Some(len) => len,
            None => {
                self.set_error(ReadErrors::BUFFER_TOO_SMALL);
                0
            }
        }
    }

    /// Content and terminator of a sized string.
    fn take_sized_string(&mut self) -> Option<&'a [u8]> {
        let len = self.take_sized_len()?;
        let Some(with_nul) = len.checked_add(1) else {
            self.set_error(ReadErrors::BUFFER_TOO_SMALL);
            return None;
        };
        let bytes = self.take(with_nul)?;
        if bytes[len] != 0 {
            return self.mismatch();
        }
        Some(bytes)
    }

    /// Content and terminator of a c-string.
    fn take_cstring(&mut self) -> Option<&'a [u8]> {
        let header = self.take_header()?;
        if header != BEG_CSTRING {
            return self.mismatch();
        }
        match self.rest.iter().position(|&b| b == 0) {
            Some(len) => self.take(len + 1),
            None => {
                self.set_error(ReadErrors::BUFFER_TOO_SMALL);
                None
            }
        }
    }

    fn utf8(&mut self, bytes: Option<&'a [u8]>) -> &'a str {
        // drop the terminator
        let Some((_, content)) = bytes.and_then(<[u8]>::split_last) else {
            return "";
        };
        match std::str::from_utf8(content) {
            Ok(s) => s,
            Err(_) => {
                self.set_error(ReadErrors::TYPE_MISMATCH);
                ""
            }
        }
    }

    fn c_str(&mut self, bytes: Option<&'a [u8]>) -> &'a CStr {
        let Some(bytes) = bytes else {
            return Default::default();
        };
        match CStr::from_bytes_with_nul(bytes) {
            Ok(s) => s,
            Err(_) => {
                self.set_error(ReadErrors::TYPE_MISMATCH);
                Default::default()
            }
        }
    }

    /// Borrows a sized string.
    pub fn read_sized_str(&mut self) -> &'a str {
        let bytes = self.take_sized_string();
        self.utf8(bytes)
    }

    /// Borrows a sized string together with its stored terminator.
    ///
    /// A string with an interior NUL raises [`ReadErrors::TYPE_MISMATCH`].
    pub fn read_sized_c_str(&mut self) -> &'a CStr {
        let bytes = self.take_sized_string();
        self.c_str(bytes)
    }

    /// Borrows a NUL-terminated string.
    pub fn read_cstr(&mut self) -> &'a str {
        let bytes = self.take_cstring();
        self.utf8(bytes)
    }

    /// Borrows a NUL-terminated string as a `CStr`.
    pub fn read_c_str(&mut self) -> &'a CStr {
        let bytes = self.take_cstring();
        self.c_str(bytes)
    }

    /// Borrows a string in either form, dispatching on the next header.
    pub fn read_any_str(&mut self) -> &'a str {
        if self.rest.first() == Some(&BEG_CSTRING) {
            self.read_cstr()
        } else {
            self.read_sized_str()
        }
    }

    /// Like [`read_any_str`](Reader::read_any_str), as a `CStr`.
    pub fn read_any_c_str(&mut self) -> &'a CStr {
        if self.rest.first() == Some(&BEG_CSTRING) {
            self.read_c_str()
        } else {
            self.read_sized_c_str()
        }
    }

    /// Reads a string in either form into an owned `String`.
    pub fn read_string(&mut self) -> String {
        self.read_any_str().to_owned()
    }

    /// Borrows a sized byte array.
    pub fn read_byte_array(&mut self) -> &'a [u8] {
        self.take_sized_len()
            .and_then(|len| self.take(len))
            .unwrap_or_default()
    }

    pub fn read_byte_vec(&mut self) -> Vec<u8> {
        self.read_byte_array().to_vec()
    }

    /// Borrows the next `len` bytes without interpreting them.
    ///
    /// Pairs with the header reads: after
    /// [`read_sized_string_header`](Reader::read_sized_string_header) the
    /// payload is `len + 1` bytes (content and terminator), after
    /// [`read_sized_byte_array_header`](Reader::read_sized_byte_array_header)
    /// it is `len`, and after [`read_cstring_header`](Reader::read_cstring_header)
    /// it is `len + 1`. Raises [`ReadErrors::BUFFER_TOO_SMALL`] and returns an
    /// empty slice when fewer bytes remain.
    pub fn read_raw(&mut self, len: usize) -> &'a [u8] {
        self.take(len).unwrap_or_default()
    }

    // --- collections ---

    /// Reads an array header and returns the element count.
    pub fn read_array_header(&mut self) -> usize {
        let Some(header) = self.take_header() else {
            return 0;
        };
        let count = match header {
            BEG_ARRAY_IMMEDIATE_SIZED..=END_ARRAY_IMMEDIATE_SIZED => {
                Some((header - BEG_ARRAY_IMMEDIATE_SIZED) as usize)
            }
            BEG_ARRAY_VAR_SIZED => self.take_var_count(IMMEDIATE_ARRAY_MAX_SIZE + 1),
            _ => self.mismatch(),
        };
        count.unwrap_or(0)
    }

    /// Reads a map header and returns the number of key/value pairs.
    pub fn read_map_header(&mut self) -> usize {
        let Some(header) = self.take_header() else {
            return 0;
        };
        let count = match header {
            BEG_MAP_EMPTY => Some(0),
            BEG_MAP_SIZED => self.take_var_count(1),
            _ => self.mismatch(),
        };
        count.unwrap_or(0)
    }

    /// Capacity to preallocate for `count` elements. Every encoded element
    /// takes at least one byte, so a larger count cannot be honest.
    pub(crate) fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining_bytes())
    }

    pub(crate) fn is_out_of_input(&self) -> bool {
        self.errors.contains(ReadErrors::BUFFER_TOO_SMALL)
    }

    /// Whether a collection loop should stop, given the out-of-input state
    /// from before the loop. Type mismatches never stop it.
    pub(crate) fn ran_out(&self, was_out: bool) -> bool {
        // the flag is sticky, so once it was already set only an empty
        // buffer proves the current element failed
        self.is_out_of_input() && (!was_out || !self.has_any_more())
    }

    /// Decodes the next value.
    #[inline]
    pub fn read<T: Decode<'a>>(&mut self) -> T {
        T::decode(self)
    }

    /// Reads an array header followed by that many elements.
    ///
    /// Stops at the first element that runs out of input. A type mismatch
    /// inside an element does not stop the loop, so the cursor stays in step
    /// with the encoded elements.
    pub fn read_vec<T: Decode<'a>>(&mut self) -> Vec<T> {
        let count = self.read_array_header();
        let was_out = self.is_out_of_input();
        let mut out = Vec::with_capacity(self.capacity_hint(count));
        for _ in 0..count {
            let item = T::decode(self);
            if self.ran_out(was_out) {
                break;
            }
            out.push(item);
        }
        out
    }

    /// Reads an array whose element count must equal `out.len()`.
    ///
    /// A different count raises [`ReadErrors::TYPE_MISMATCH`] and leaves `out`
    /// untouched.
    pub fn read_into<T: Decode<'a>>(&mut self, out: &mut [T]) {
        let count = self.read_array_header();
        if count != out.len() {
            self.set_error(ReadErrors::TYPE_MISMATCH);
            return;
        }
        for slot in out {
            *slot = T::decode(self);
        }
    }
}
