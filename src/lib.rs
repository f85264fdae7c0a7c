//! # bitspack
//!
//! A compact, self-describing binary serialization format for Rust.
//!
//! - Every value starts with a single header byte that carries its category
//!   and, for small integers, short strings and short arrays, the value or
//!   size itself
//! - Integers use the shortest of an immediate, 12-bit or 2..=8 byte zigzag form
//! - Floats can be stored as binary16, bfloat16, float32 or float64
//! - Decoding never panics: failures accumulate as error bits on the [`Reader`]
//!   and can be checked once after a whole message
//! - Custom derive macros encode struct fields in declaration order
//!
//! ## Attribute Macros
//!
//! - `#[bitspack(object)]` on a struct or enum brackets its fields with object
//!   begin/end markers.
//! - `#[bitspack(skip)]`: the field is not written. On decode it is set to
//!   `Default::default()`.
//! - `#[bitspack(half)]` / `#[bitspack(bfloat)]`: an `f32` field is written
//!   in 16-bit precision.
//! - `#[bitspack(cstring)]`: a string field is written NUL-terminated.
//!
//! ## Feature Flags
//!
//! - `indexmap`: Enables encoding/decoding of `IndexMap` and `IndexSet` collections.
//! - `smol_str`: Enables encoding/decoding of `smol_str::SmolStr`.
//! - `uuid`: Enables encoding/decoding of `uuid::Uuid` as a 16-byte array.

mod core;
mod features;
pub mod float;
pub mod reader;
pub mod sink;
pub mod tags;
pub mod varint;
pub mod writer;

use bytes::{Bytes, BytesMut};

pub use bitspack_derive::{Decode, Encode};
pub use reader::{ReadErrors, Reader};
pub use sink::ByteSink;
pub use tags::{DetailedType, ValueType};
pub use writer::{WriteErrors, Writer};

/// Errors reported once a decode has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The buffer ended before a value it announced.
    #[error("buffer too small for encoded value")]
    BufferTooSmall,
    /// A header byte did not match the type being decoded.
    #[error("type mismatch in encoded data")]
    TypeMismatch,
    /// More than one kind of failure occurred.
    #[error("invalid encoded data ({errors:?})")]
    Invalid { errors: ReadErrors },
}

impl Error {
    /// Maps accumulated reader errors to an `Error`, or `None` when there are none.
    pub fn from_read_errors(errors: ReadErrors) -> Option<Error> {
        if errors.is_ok() {
            None
        } else if errors == ReadErrors::BUFFER_TOO_SMALL {
            Some(Error::BufferTooSmall)
        } else if errors == ReadErrors::TYPE_MISMATCH {
            Some(Error::TypeMismatch)
        } else {
            Some(Error::Invalid { errors })
        }
    }
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for types that can be written in the bitspack format.
///
/// Most users should use `#[derive(Encode)]` instead of a manual implementation.
pub trait Encode {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>);

    /// Writes a slice of `Self`. Defaults to an array of elements; `u8`
    /// overrides it with the byte-array form.
    #[doc(hidden)]
    fn encode_slice<S: ByteSink + ?Sized>(items: &[Self], writer: &mut Writer<'_, S>)
    where
        Self: Sized,
    {
        writer.write_slice(items);
    }
}

/// Trait for types that can be read from the bitspack format.
///
/// `'de` is the lifetime of the input buffer, so implementations may borrow
/// strings and byte arrays from it. Decoding never fails directly: problems
/// are raised on the reader and a default value is returned.
pub trait Decode<'de>: Sized {
    fn decode(reader: &mut Reader<'de>) -> Self;

    /// Counterpart of [`Encode::encode_slice`].
    #[doc(hidden)]
    fn decode_vec(reader: &mut Reader<'de>) -> Vec<Self> {
        reader.read_vec()
    }
}

/// Convenience function to encode a value to bytes.
///
/// # Example
/// ```rust
/// use bitspack::{encode, decode, Encode, Decode};
///
/// #[derive(Encode, Decode, PartialEq, Debug)]
/// struct MyStruct {
///     id: u32,
///     name: String,
/// }
///
/// let value = MyStruct { id: 42, name: "hello".to_string() };
/// let buf = encode(&value);
/// let decoded: MyStruct = decode(&buf).unwrap();
/// assert_eq!(value, decoded);
/// ```
pub fn encode<T: Encode + ?Sized>(value: &T) -> Bytes {
    let mut sink = BytesMut::new();
    encode_into(value, &mut sink);
    sink.freeze()
}

/// Appends the encoding of `value` to an existing sink.
pub fn encode_into<T: Encode + ?Sized, S: ByteSink + ?Sized>(value: &T, sink: &mut S) {
    let mut writer = Writer::new(sink);
    writer.write(value);
    if !writer.is_valid() {
        tracing::debug!(errors = ?writer.errors(), "bitspack encode produced lossy output");
    }
}

/// Convenience function to decode a value from bytes.
///
/// Trailing bytes after the value are ignored.
pub fn decode<'de, T: Decode<'de>>(buf: &'de [u8]) -> Result<T> {
    let mut reader = Reader::new(buf);
    let value = T::decode(&mut reader);
    match reader.finish() {
        Ok(()) => Ok(value),
        Err(err) => {
            tracing::debug!(
                error = %err,
                offset = reader.offset(),
                ty = std::any::type_name::<T>(),
                "bitspack decode failed"
            );
            Err(err)
        }
    }
}
