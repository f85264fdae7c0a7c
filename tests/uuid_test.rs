#![cfg(feature = "uuid")]

use bitspack::{decode, encode, Error, Writer};
use uuid::Uuid;

#[test]
fn test_uuid_round_trip() {
    let value = Uuid::new_v4();
    let bytes = encode(&value);
    assert_eq!(bytes.len(), 17);
    assert_eq!(bytes[0], 0xB4 + 16);
    assert_eq!(&bytes[1..], value.as_bytes());
    assert_eq!(decode::<Uuid>(&bytes).unwrap(), value);
}

#[test]
fn test_nil_uuid() {
    let bytes = encode(&Uuid::nil());
    assert_eq!(decode::<Uuid>(&bytes).unwrap(), Uuid::nil());
}

#[test]
fn test_uuid_wrong_length() {
    let mut buf = Vec::new();
    Writer::new(&mut buf).write_byte_array(&[1, 2, 3]);
    assert_eq!(decode::<Uuid>(&buf), Err(Error::TypeMismatch));
}

#[test]
fn test_uuid_after_mismatched_field() {
    let value = Uuid::new_v4();
    let mut buf = Vec::new();
    Writer::new(&mut buf).write_bool(true).write(&value);

    let mut reader = bitspack::Reader::new(&buf);
    assert_eq!(reader.read_i64(), 0);
    assert_eq!(reader.read::<Uuid>(), value);
    assert_eq!(reader.finish(), Err(Error::TypeMismatch));
}

#[test]
fn test_uuid_in_collections() {
    let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let bytes = encode(&ids);
    assert_eq!(decode::<Vec<Uuid>>(&bytes).unwrap(), ids);
}
