//! Growable byte storage the [`Writer`](crate::Writer) appends to.

use bytes::{BufMut, BytesMut};

/// A growable, contiguous byte buffer.
///
/// Payloads are appended through [`BufMut`]; this trait adds the length and
/// capacity bookkeeping the writer needs. The writer's cursor is always the
/// sink's current length. Implemented for `Vec<u8>` and `bytes::BytesMut`.
pub trait ByteSink: BufMut {
    /// Number of initialized bytes.
    fn len(&self) -> usize;

    /// Number of bytes the sink can hold without reallocating.
    fn capacity(&self) -> usize;

    /// Ensures the total capacity is at least `new_capacity`.
    fn reserve_capacity(&mut self, new_capacity: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes room for `additional` more bytes, growing by half again when short.
    fn reserve_expand(&mut self, additional: usize) {
        let required = self.len() + additional;
        if self.capacity() < required {
            self.reserve_capacity(required * 3 / 2 + 16);
        }
    }
}

impl ByteSink for Vec<u8> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn reserve_capacity(&mut self, new_capacity: usize) {
        if new_capacity > Vec::capacity(self) {
            Vec::reserve(self, new_capacity - Vec::len(self));
        }
    }
}

impl ByteSink for BytesMut {
    #[inline]
    fn len(&self) -> usize {
        BytesMut::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        BytesMut::capacity(self)
    }

    fn reserve_capacity(&mut self, new_capacity: usize) {
        if new_capacity > BytesMut::capacity(self) {
            BytesMut::reserve(self, new_capacity - BytesMut::len(self));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<S: ByteSink + AsRef<[u8]>>(sink: &mut S) {
        assert!(ByteSink::is_empty(sink));
        sink.put_u8(1);
        sink.put_slice(&[2, 3]);
        sink.put_u16_le(0x0504);
        assert_eq!(ByteSink::len(sink), 5);
        assert_eq!(sink.as_ref(), &[1u8, 2, 3, 4, 5][..]);
        sink.reserve_expand(100);
        assert!(ByteSink::capacity(sink) >= 105);
    }

    #[test]
    fn vec_sink() {
        exercise(&mut Vec::<u8>::new());
    }

    #[test]
    fn bytes_mut_sink() {
        exercise(&mut BytesMut::new());
    }
}
