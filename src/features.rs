#[cfg(feature = "indexmap")]
use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "smol_str")]
use smol_str::SmolStr;
#[cfg(feature = "uuid")]
use uuid::Uuid;

#[cfg(feature = "indexmap")]
use crate::core::{decode_pairs, decode_seq};
#[cfg(any(feature = "indexmap", feature = "smol_str", feature = "uuid"))]
use crate::{ByteSink, Decode, Encode, Reader, Writer};
#[cfg(feature = "uuid")]
use crate::ReadErrors;

// --- IndexSet ---
#[cfg(feature = "indexmap")]
impl<T: Encode, H> Encode for IndexSet<T, H> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_array_header(self.len());
        for item in self {
            item.encode(writer);
        }
    }
}

#[cfg(feature = "indexmap")]
impl<'de, T, H> Decode<'de> for IndexSet<T, H>
where
    T: Decode<'de> + Eq + std::hash::Hash,
    H: std::hash::BuildHasher + Default,
{
    fn decode(reader: &mut Reader<'de>) -> Self {
        let count = reader.read_array_header();
        let mut set = IndexSet::with_capacity_and_hasher(reader.capacity_hint(count), H::default());
        decode_seq(reader, count, |item| {
            set.insert(item);
        });
        set
    }
}

// --- IndexMap ---
#[cfg(feature = "indexmap")]
impl<K: Encode, V: Encode, H> Encode for IndexMap<K, V, H> {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_map_header(self.len());
        for (key, value) in self {
            key.encode(writer);
            value.encode(writer);
        }
    }
}

#[cfg(feature = "indexmap")]
impl<'de, K, V, H> Decode<'de> for IndexMap<K, V, H>
where
    K: Decode<'de> + Eq + std::hash::Hash,
    V: Decode<'de>,
    H: std::hash::BuildHasher + Default,
{
    /// Insertion order on the wire is preserved.
    fn decode(reader: &mut Reader<'de>) -> Self {
        let count = reader.read_map_header();
        let mut map = IndexMap::with_capacity_and_hasher(reader.capacity_hint(count), H::default());
        decode_pairs(reader, count, |key, value| {
            map.insert(key, value);
        });
        map
    }
}

// --- SmolStr ---
#[cfg(feature = "smol_str")]
impl Encode for SmolStr {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_str(self.as_str());
    }
}

#[cfg(feature = "smol_str")]
impl<'de> Decode<'de> for SmolStr {
    fn decode(reader: &mut Reader<'de>) -> Self {
        SmolStr::new(reader.read_any_str())
    }
}

// --- Uuid ---
#[cfg(feature = "uuid")]
impl Encode for Uuid {
    fn encode<S: ByteSink + ?Sized>(&self, writer: &mut Writer<'_, S>) {
        writer.write_byte_array(self.as_bytes());
    }
}

#[cfg(feature = "uuid")]
impl<'de> Decode<'de> for Uuid {
    /// Anything but exactly 16 bytes is a type mismatch and yields the nil UUID.
    fn decode(reader: &mut Reader<'de>) -> Self {
        let before = reader.errors();
        let bytes = reader.read_byte_array();
        if reader.errors() != before {
            return Uuid::nil();
        }
        Uuid::from_slice(bytes).unwrap_or_else(|_| {
            reader.set_error(ReadErrors::TYPE_MISMATCH);
            Uuid::nil()
        })
    }
}
