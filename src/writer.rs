//! Encoding cursor appending to a [`ByteSink`].

use std::ffi::CStr;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};


use crate::float::{f32_to_bfloat, f32_to_half};
use crate::sink::ByteSink;
use crate::tags::*;
use crate::varint::{self, zigzag_encode};
use crate::Encode;

/// Accumulated encode failures of a [`Writer`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WriteErrors(u32);

impl WriteErrors {
    pub const OK: WriteErrors = WriteErrors(0);
    /// A string written in NUL-terminated form contained a NUL byte and will
    /// read back truncated.
    pub const INTERIOR_NUL: WriteErrors = WriteErrors(1);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: WriteErrors) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for WriteErrors {
    type Output = WriteErrors;

    fn bitor(self, rhs: WriteErrors) -> WriteErrors {
        WriteErrors(self.0 | rhs.0)
    }
}

impl BitOrAssign for WriteErrors {
    fn bitor_assign(&mut self, rhs: WriteErrors) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for WriteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        if self.contains(WriteErrors::INTERIOR_NUL) {
            set.entry(&format_args!("INTERIOR_NUL"));
        }
        set.finish()
    }
}

/// Appends encoded values to a byte sink.
///
/// Every value is written in the shortest form its category allows. All
/// methods return `&mut Self` so writes can be chained.
///
/// # Example
/// ```rust
/// use bitspack::Writer;
///
/// let mut buf = Vec::new();
/// let mut writer = Writer::new(&mut buf);
/// writer.write_i64(7).write_bool(true).write_str("hi");
/// assert_eq!(buf, [0x47, 0x98, 0xB6, b'h', b'i', 0]);
/// ```
pub struct Writer<'a, S: ByteSink + ?Sized = Vec<u8>> {
    sink: &'a mut S,
    errors: WriteErrors,
}

macro_rules! widening_writes {
    ($($(#[$meta:meta])* $name:ident($ty:ty) => $via:ident;)*) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name(&mut self, value: $ty) -> &mut Self {
                self.$via(value as _)
            }
        )*
    };
}

impl<'a, S: ByteSink + ?Sized> Writer<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Writer {
            sink,
            errors: WriteErrors::OK,
        }
    }

    /// Total bytes in the sink, including anything it held before this writer.
    pub fn len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    pub fn errors(&self) -> WriteErrors {
        self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_ok()
    }

    pub fn sink(&mut self) -> &mut S {
        self.sink
    }

    fn set_error(&mut self, error: WriteErrors) {
        if !self.errors.contains(error) {
            tracing::trace!(offset = self.sink.len(), ?error, "bitspack write error");
        }
        self.errors |= error;
    }

    // --- integers ---

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        if (IMMEDIATE_INTEGER_MIN..=IMMEDIATE_INTEGER_MAX).contains(&value) {
            self.sink
                .put_u8((value - IMMEDIATE_INTEGER_MIN) as u8 + BEG_IMMEDIATE_INTEGER);
            return self;
        }
        let zigzag = zigzag_encode(value);
        let bits = u64::BITS - zigzag.leading_zeros();
        if bits <= 12 {
            self.sink.put_u8(BEG_12B_INTEGER + (zigzag & 0x0F) as u8);
            self.sink.put_u8((zigzag >> 4) as u8);
        } else {
            let len = bits.div_ceil(8) as usize;
            self.sink.put_u8(BEG_SIZED_INTEGER + (len - 2) as u8);
            self.sink.put_uint_le(zigzag, len);
        }
        self
    }

    /// Writes the bit pattern of `value` as a signed integer, so values above
    /// `i64::MAX` take the full 8-byte form.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_i64(value as i64)
    }

    widening_writes! {
        write_i8(i8) => write_i64;
        write_i16(i16) => write_i64;
        write_i32(i32) => write_i64;
        write_isize(isize) => write_i64;
        write_u8(u8) => write_i64;
        write_u16(u16) => write_i64;
        write_u32(u32) => write_i64;
        write_usize(usize) => write_u64;
    }

    // --- booleans and object delimiters ---

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.sink
            .put_u8(if value { BOOLEAN_TRUE } else { BOOLEAN_FALSE });
        self
    }

    pub fn write_true(&mut self) -> &mut Self {
        self.write_bool(true)
    }

    pub fn write_false(&mut self) -> &mut Self {
        self.write_bool(false)
    }

    pub fn begin_object(&mut self) -> &mut Self {
        self.sink.put_u8(BEG_OBJECT);
        self
    }

    pub fn end_object(&mut self) -> &mut Self {
        self.sink.put_u8(END_OBJECT);
        self
    }

    // --- floats ---

    /// Writes `value` as binary16, truncating the mantissa.
    pub fn write_half(&mut self, value: f32) -> &mut Self {
        self.sink.put_u8(BEG_HALF);
        self.sink.put_u16_le(f32_to_half(value));
        self
    }

    /// Writes the top 16 bits of `value`.
    pub fn write_bfloat(&mut self, value: f32) -> &mut Self {
        self.sink.put_u8(BEG_BFLOAT);
        self.sink.put_u16_le(f32_to_bfloat(value));
        self
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.sink.put_u8(BEG_FLOAT);
        self.sink.put_f32_le(value);
        self
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.sink.put_u8(BEG_DOUBLE);
        self.sink.put_f64_le(value);
        self
    }

    // --- strings and byte arrays ---

    pub fn write_sized_byte_array_header(&mut self, len: usize) -> &mut Self {
        if len <= IMMEDIATE_STRING_MAX_SIZE {
            self.sink.put_u8(BEG_STRING_IMMEDIATE_SIZED + len as u8);
        } else {
            self.sink.put_u8(BEG_STRING_VAR_SIZED);
            varint::write_var_uint(&mut *self.sink, (len - IMMEDIATE_STRING_MAX_SIZE - 1) as u64);
        }
        self
    }

    /// Writes the header of a sized string of `len` content bytes. The caller
    /// appends the content followed by one NUL byte.
    pub fn write_sized_string_header(&mut self, len: usize) -> &mut Self {
        self.write_sized_byte_array_header(len)
    }

    /// Writes the c-string header. The caller appends the content and a NUL.
    pub fn write_cstring_header(&mut self) -> &mut Self {
        self.sink.put_u8(BEG_CSTRING);
        self
    }

    /// Writes raw bytes as a sized byte array, without a terminator.
    pub fn write_byte_array(&mut self, data: &[u8]) -> &mut Self {
        self.sink
            .reserve_expand(data.len() + varint::MAX_VARINT_LEN + 1);
        self.write_sized_byte_array_header(data.len());
        self.sink.put_slice(data);
        self
    }

    /// Writes `data` as a sized string: header, content, NUL.
    pub fn write_sized_bytes_str(&mut self, data: &[u8]) -> &mut Self {
        self.sink
            .reserve_expand(data.len() + varint::MAX_VARINT_LEN + 2);
        self.write_sized_string_header(data.len());
        self.sink.put_slice(data);
        self.sink.put_u8(0);
        self
    }

    pub fn write_sized_str(&mut self, value: &str) -> &mut Self {
        self.write_sized_bytes_str(value.as_bytes())
    }

    /// Writes a string in the default (sized) form.
    #[inline]
    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.write_sized_str(value)
    }

    /// Writes `value` in NUL-terminated form.
    ///
    /// A NUL inside `value` raises [`WriteErrors::INTERIOR_NUL`]; the bytes
    /// are still written and a reader will see the string cut at that NUL.
    pub fn write_cstr(&mut self, value: &str) -> &mut Self {
        if value.as_bytes().contains(&0) {
            self.set_error(WriteErrors::INTERIOR_NUL);
        }
        self.sink.reserve_expand(value.len() + 2);
        self.write_cstring_header();
        self.sink.put_slice(value.as_bytes());
        self.sink.put_u8(0);
        self
    }

    pub fn write_c_str(&mut self, value: &CStr) -> &mut Self {
        let bytes = value.to_bytes_with_nul();
        self.sink.reserve_expand(bytes.len() + 1);
        self.write_cstring_header();
        self.sink.put_slice(bytes);
        self
    }

    // --- collections ---

    pub fn write_array_header(&mut self, count: usize) -> &mut Self {
        if count <= IMMEDIATE_ARRAY_MAX_SIZE {
            self.sink.put_u8(BEG_ARRAY_IMMEDIATE_SIZED + count as u8);
        } else {
            self.sink.put_u8(BEG_ARRAY_VAR_SIZED);
            varint::write_var_uint(&mut *self.sink, (count - IMMEDIATE_ARRAY_MAX_SIZE - 1) as u64);
        }
        self
    }

    /// Writes a map header for `count` key/value pairs. The caller writes the
    /// pairs as alternating keys and values.
    pub fn write_map_header(&mut self, count: usize) -> &mut Self {
        if count == 0 {
            self.sink.put_u8(BEG_MAP_EMPTY);
        } else {
            self.sink.put_u8(BEG_MAP_SIZED);
            varint::write_var_uint(&mut *self.sink, (count - 1) as u64);
        }
        self
    }

    // --- untyped varints ---

    /// Writes a headerless varint.
    pub fn write_var_uint(&mut self, value: u64) -> &mut Self {
        varint::write_var_uint(&mut *self.sink, value);
        self
    }

    /// Writes a headerless zigzag varint.
    pub fn write_var_int(&mut self, value: i64) -> &mut Self {
        varint::write_var_int(&mut *self.sink, value);
        self
    }

    // --- generic ---

    #[inline]
    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(self);
        self
    }

    /// Writes an array header followed by every element.
    pub fn write_slice<T: Encode>(&mut self, items: &[T]) -> &mut Self {
        let estimate = items
            .len()
            .saturating_mul(1 + std::mem::size_of::<T>())
            .saturating_add(16);
        self.sink.reserve_expand(estimate);
        self.write_array_header(items.len());
        for item in items {
            item.encode(self);
        }
        self
    }
}

impl<S: ByteSink + ?Sized> fmt::Debug for Writer<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("len", &self.sink.len())
            .field("errors", &self.errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut Writer<'_>)) -> Vec<u8> {
        let mut buf = Vec::new();
        f(&mut Writer::new(&mut buf));
        buf
    }

    #[test]
    fn integer_forms() {
        assert_eq!(written(|w| { w.write_i64(0); }), [0x40]);
        assert_eq!(written(|w| { w.write_i64(-64); }), [0x00]);
        assert_eq!(written(|w| { w.write_i64(63); }), [0x7F]);
        // zigzag(64) = 128
        assert_eq!(written(|w| { w.write_i64(64); }), [0x80, 0x08]);
        assert_eq!(written(|w| { w.write_i64(-65); }), [0x81, 0x08]);
        // zigzag(-2048) = 4095, the 12-bit maximum
        assert_eq!(written(|w| { w.write_i64(-2048); }), [0x8F, 0xFF]);
        // zigzag(2048) = 4096 needs two bytes
        assert_eq!(written(|w| { w.write_i64(2048); }), [0x90, 0x00, 0x10]);
        assert_eq!(written(|w| { w.write_i64(i64::MIN); })[..2], [0x96, 0xFF]);
    }

    #[test]
    fn u64_uses_signed_bit_pattern() {
        // u64::MAX is -1 as i64
        assert_eq!(written(|w| { w.write_u64(u64::MAX); }), [0x3F]);
    }

    #[test]
    fn string_headers() {
        assert_eq!(written(|w| { w.write_str(""); }), [0xB4, 0x00]);
        let long = "x".repeat(74);
        let out = written(|w| { w.write_str(&long); });
        assert_eq!(&out[..2], &[BEG_STRING_VAR_SIZED, 0x00]);
        assert_eq!(out.len(), 2 + 74 + 1);
        assert_eq!(written(|w| { w.write_byte_array(&[9, 9]); }), [0xB6, 9, 9]);
    }

    #[test]
    fn cstr_interior_nul() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        writer.write_cstr("ok");
        assert!(writer.is_valid());
        writer.write_cstr("a\0b");
        assert_eq!(writer.errors(), WriteErrors::INTERIOR_NUL);
        assert_eq!(buf, [BEG_CSTRING, b'o', b'k', 0, BEG_CSTRING, b'a', 0, b'b', 0]);
    }

    #[test]
    fn collection_headers() {
        assert_eq!(written(|w| { w.write_array_header(0); }), [0xA1]);
        assert_eq!(written(|w| { w.write_array_header(16); }), [0xB1]);
        assert_eq!(written(|w| { w.write_array_header(17); }), [0xB2, 0x00]);
        assert_eq!(written(|w| { w.write_map_header(0); }), [0x9F]);
        assert_eq!(written(|w| { w.write_map_header(1); }), [0xA0, 0x00]);
    }

    #[test]
    fn floats_are_little_endian() {
        assert_eq!(written(|w| { w.write_half(1.0); }), [0x99, 0x00, 0x3C]);
        assert_eq!(written(|w| { w.write_bfloat(1.0); }), [0x9A, 0x80, 0x3F]);
        assert_eq!(
            written(|w| { w.write_f32(1.0); }),
            [0x9B, 0x00, 0x00, 0x80, 0x3F]
        );
        assert_eq!(written(|w| { w.write_f64(1.0); })[8], 0x3F);
    }
}
