use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use bytes::Bytes;

use crate::{ByteSink, Decode, Encode, ReadErrors, Reader, Writer};

/// Decodes `count` elements, stopping at the first one that runs out of input.
pub(crate) fn decode_seq<'de, T: Decode<'de>>(
    reader: &mut Reader<'de>,
    count: usize,
    mut push: impl FnMut(T),
) {
    let was_out = reader.is_out_of_input();
    for _ in 0..count {
        let item = T::decode(reader);
        if reader.ran_out(was_out) {
            break;
        }
        push(item);
    }
}

/// Decodes `count` key/value pairs, stopping like [`decode_seq`].
pub(crate) fn decode_pairs<'de, K: Decode<'de>, V: Decode<'de>>(
    reader: &mut Reader<'de>,
    count: usize,
    mut push: impl FnMut(K, V),
) {
    let was_out = reader.is_out_of_input();
    for _ in 0..count {
        let key = K::decode(reader);
        let value = V::decode(reader);
        if reader.ran_out(was_out) {
            break;
        }
        push(key, value);
    }
}

// --- primitives ---

/// Encodes a `bool` as a single header byte, `0x97` or `0x98`.
impl Encode for bool {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_bool(*self);
    }
}

/// Any other header is a type mismatch and decodes as `false`.
impl<'de> Decode<'de> for bool {
    #[inline]
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_bool()
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Encode for $ty {
                #[inline]
                fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
                    writer.$write(*self);
                }
            }

            impl<'de> Decode<'de> for $ty {
                #[inline]
                fn decode(reader: &mut Reader<'de>) -> Self {
                    reader.$read()
                }
            }
        )*
    };
}

// Every width shares the shortest-form integer encoding, so a value written
// as one integer type reads back as any other (truncating like `as`).
impl_integer! {
    i8 => write_i8, read_i8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    isize => write_isize, read_isize;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    usize => write_usize, read_usize;
}

/// Encodes a single `u8` as an integer. Slices, `Vec<u8>` and `[u8; N]` use
/// the sized byte-array form instead of an array of integers.
impl Encode for u8 {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_u8(*self);
    }

    fn encode_slice<S: ByteSink + ?Sized>(items: &[Self], writer: &mut Writer<'_, S>) {
        writer.write_byte_array(items);
    }
}

/// `Vec<u8>` and `[u8; N]` expect the byte-array form.
impl<'de> Decode<'de> for u8 {
    #[inline]
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_u8()
    }

    fn decode_vec(reader: &mut Reader<'de>) -> Vec<Self> {
        reader.read_byte_vec()
    }
}

/// Encodes a `char` as the integer value of its Unicode scalar.
impl Encode for char {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_u32(u32::from(*self));
    }
}

/// A value that is not a Unicode scalar (a surrogate or above `char::MAX`)
/// is a type mismatch and decodes as `'\0'`.
impl<'de> Decode<'de> for char {
    fn decode(reader: &mut Reader<'de>) -> Self {
        let scalar = reader.read_u32();
        char::from_u32(scalar).unwrap_or_else(|| {
            reader.set_error(ReadErrors::TYPE_MISMATCH);
            '\0'
        })
    }
}

/// Encodes an `f32` at full precision, header `0x9B` and 4 bytes.
/// Use `Writer::write_half` or `Writer::write_bfloat` for 16-bit storage.
impl Encode for f32 {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_f32(*self);
    }
}

impl<'de> Decode<'de> for f32 {
    /// Accepts any stored precision.
    #[inline]
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_f32()
    }
}

/// Encodes an `f64` at full precision, header `0x9C` and 8 bytes.
impl Encode for f64 {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_f64(*self);
    }
}

/// Accepts any stored precision.
impl<'de> Decode<'de> for f64 {
    #[inline]
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_f64()
    }
}

// --- strings and bytes ---

/// Encodes a string in sized form: length header, UTF-8 content, then a NUL
/// that is not counted in the length.
impl Encode for str {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_str(self);
    }
}

impl Encode for String {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_str(self);
    }
}

/// Accepts both the sized and the NUL-terminated form. Invalid UTF-8 is a
/// type mismatch.
impl<'de> Decode<'de> for String {
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_string()
    }
}

/// Borrows the string from the input buffer without copying.
impl<'de: 'a, 'a> Decode<'de> for &'a str {
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_any_str()
    }
}

/// Encodes a `CStr` in NUL-terminated form, header `0xB3`.
impl Encode for CStr {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_c_str(self);
    }
}

impl Encode for CString {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_c_str(self);
    }
}

/// Accepts both string forms; a sized string holding a NUL is a mismatch.
impl<'de> Decode<'de> for CString {
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_any_c_str().to_owned()
    }
}

impl<'de: 'a, 'a> Decode<'de> for &'a CStr {
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_any_c_str()
    }
}

/// Borrows a sized byte array from the input buffer.
impl<'de: 'a, 'a> Decode<'de> for &'a [u8] {
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_byte_array()
    }
}

/// Encodes `Bytes` as a sized byte array: length header, then the raw bytes
/// with no terminator.
impl Encode for Bytes {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_byte_array(self);
    }
}

impl<'de> Decode<'de> for Bytes {
    fn decode(reader: &mut Reader<'de>) -> Self {
        Bytes::copy_from_slice(reader.read_byte_array())
    }
}

// --- wrappers ---

// References and smart pointers are transparent: they encode as their target.
impl<T: Encode + ?Sized> Encode for &T {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        (**self).encode(writer);
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        (**self).encode(writer);
    }
}

impl<'de, T: Decode<'de>> Decode<'de> for Box<T> {
    fn decode(reader: &mut Reader<'de>) -> Self {
        Box::new(T::decode(reader))
    }
}

impl<T: Encode + ?Sized> Encode for Arc<T> {
    #[inline]
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        (**self).encode(writer);
    }
}

impl<'de, T: Decode<'de>> Decode<'de> for Arc<T> {
    fn decode(reader: &mut Reader<'de>) -> Self {
        Arc::new(T::decode(reader))
    }
}

/// Encodes an `Option` as an array: `None` is the empty array `0xA1`,
/// `Some(v)` is `0xA2` followed by `v`.
impl<T: Encode> Encode for Option<T> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        match self {
            None => {
                writer.write_array_header(0);
            }
            Some(value) => {
                writer.write_array_header(1);
                value.encode(writer);
            }
        }
    }
}

/// An array with more than one element is a type mismatch.
impl<'de, T: Decode<'de>> Decode<'de> for Option<T> {
    fn decode(reader: &mut Reader<'de>) -> Self {
        match reader.read_array_header() {
            0 => None,
            1 => Some(T::decode(reader)),
            _ => {
                reader.set_error(ReadErrors::TYPE_MISMATCH);
                None
            }
        }
    }
}

// --- sequences ---

/// Encodes a slice as an array header followed by each element, except
/// `[u8]` which becomes a sized byte array.
impl<T: Encode> Encode for [T] {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        T::encode_slice(self, writer);
    }
}

/// Same wire form as `[T]`; `Vec<u8>` is a sized byte array.
impl<T: Encode> Encode for Vec<T> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        T::encode_slice(self, writer);
    }
}

/// Preallocates no more than the remaining input could hold.
impl<'de, T: Decode<'de>> Decode<'de> for Vec<T> {
    fn decode(reader: &mut Reader<'de>) -> Self {
        T::decode_vec(reader)
    }
}

/// Same wire form as `[T]`; the length is not fixed on the wire.
impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        T::encode_slice(self, writer);
    }
}

impl<'de, T: Decode<'de> + Default, const N: usize> Decode<'de> for [T; N] {
    /// A stored length other than `N` raises a type mismatch; missing
    /// elements are filled with `T::default()`.
    fn decode(reader: &mut Reader<'de>) -> Self {
        let was_out = reader.is_out_of_input();
        let items = T::decode_vec(reader);
        if items.len() != N && !reader.ran_out(was_out) {
            reader.set_error(ReadErrors::TYPE_MISMATCH);
        }
        let mut items = items.into_iter();
        std::array::from_fn(|_| items.next().unwrap_or_default())
    }
}

/// Encodes a set as an array, in iteration order.
impl<T: Encode, H> Encode for HashSet<T, H> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_array_header(self.len());
        for item in self {
            item.encode(writer);
        }
    }
}

impl<'de, T, H> Decode<'de> for HashSet<T, H>
where
    T: Decode<'de> + Eq + Hash,
    H: BuildHasher + Default,
{
    fn decode(reader: &mut Reader<'de>) -> Self {
        let count = reader.read_array_header();
        let mut set = HashSet::with_capacity_and_hasher(reader.capacity_hint(count), H::default());
        decode_seq(reader, count, |item| {
            set.insert(item);
        });
        set
    }
}

/// Encodes a set as an array, in ascending order.
impl<T: Encode> Encode for BTreeSet<T> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_array_header(self.len());
        for item in self {
            item.encode(writer);
        }
    }
}

impl<'de, T: Decode<'de> + Ord> Decode<'de> for BTreeSet<T> {
    fn decode(reader: &mut Reader<'de>) -> Self {
        let count = reader.read_array_header();
        let mut set = BTreeSet::new();
        decode_seq(reader, count, |item| {
            set.insert(item);
        });
        set
    }
}

// --- maps ---

/// Encodes a map as a map header (`0x9F` when empty, else `0xA0` and the
/// pair count minus one) followed by alternating keys and values.
impl<K: Encode, V: Encode, H> Encode for HashMap<K, V, H> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_map_header(self.len());
        for (key, value) in self {
            key.encode(writer);
            value.encode(writer);
        }
    }
}

/// A repeated key keeps the last value.
impl<'de, K, V, H> Decode<'de> for HashMap<K, V, H>
where
    K: Decode<'de> + Eq + Hash,
    V: Decode<'de>,
    H: BuildHasher + Default,
{
    fn decode(reader: &mut Reader<'de>) -> Self {
        let count = reader.read_map_header();
        let mut map = HashMap::with_capacity_and_hasher(reader.capacity_hint(count), H::default());
        decode_pairs(reader, count, |key, value| {
            map.insert(key, value);
        });
        map
    }
}

/// Same wire form as `HashMap`, keys in ascending order.
impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_map_header(self.len());
        for (key, value) in self {
            key.encode(writer);
            value.encode(writer);
        }
    }
}

impl<'de, K: Decode<'de> + Ord, V: Decode<'de>> Decode<'de> for BTreeMap<K, V> {
    fn decode(reader: &mut Reader<'de>) -> Self {
        let count = reader.read_map_header();
        let mut map = BTreeMap::new();
        decode_pairs(reader, count, |key, value| {
            map.insert(key, value);
        });
        map
    }
}

// --- tuples ---

/// Encodes `()` as an empty object, `0x9D 0x9E`.
impl Encode for () {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.begin_object().end_object();
    }
}

impl<'de> Decode<'de> for () {
    fn decode(reader: &mut Reader<'de>) -> Self {
        reader.read_begin_object();
        reader.read_end_object();
    }
}

// Tuples are objects: `0x9D`, each element in order, `0x9E`.
macro_rules! impl_tuple {
    ($($name:ident: $idx:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
                writer.begin_object();
                $(self.$idx.encode(writer);)+
                writer.end_object();
            }
        }

        impl<'de, $($name: Decode<'de>),+> Decode<'de> for ($($name,)+) {
            fn decode(reader: &mut Reader<'de>) -> Self {
                reader.read_begin_object();
                let value = ($($name::decode(reader),)+);
                reader.read_end_object();
                value
            }
        }
    };
}

impl_tuple!(T0: 0);
impl_tuple!(T0: 0, T1: 1);
impl_tuple!(T0: 0, T1: 1, T2: 2);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9, T10: 10);
impl_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9, T10: 10, T11: 11);
