use bitspack::{decode, encode, Error, ReadErrors, Reader, WriteErrors, Writer};

fn mixed_stream() -> Vec<u8> {
    let mut buf = Vec::new();
    Writer::new(&mut buf)
        .write_u32(300_000)
        .write_str("hello")
        .write_slice(&[1u32, 2, 3]);
    buf
}

#[test]
fn test_every_truncation_is_detected() {
    let full = mixed_stream();
    for cut in 0..full.len() {
        let mut reader = Reader::new(&full[..cut]);
        reader.read_u32();
        reader.read_any_str();
        reader.read_vec::<u32>();
        assert!(!reader.is_valid(), "cut at {cut}");
        assert!(
            reader.errors().contains(ReadErrors::BUFFER_TOO_SMALL),
            "cut at {cut}: {:?}",
            reader.errors()
        );
    }
}

#[test]
fn test_truncated_values_return_defaults() {
    // sized integer missing its payload
    let mut reader = Reader::new(&[0x92, 0x01]);
    assert_eq!(reader.read_i64(), 0);
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);

    let mut reader = Reader::new(&[0x9C, 0, 0, 0]);
    assert_eq!(reader.read_f64(), 0.0);
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);

    // string of 10 bytes with 3 present
    let mut reader = Reader::new(&[0xB4 + 10, b'a', b'b', b'c']);
    assert_eq!(reader.read_sized_str(), "");
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);

    // var-sized array whose count varint is cut
    let mut reader = Reader::new(&[0xB2, 0xC0]);
    assert_eq!(reader.read_array_header(), 0);
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);
}

#[test]
fn test_cstring_without_terminator() {
    let mut reader = Reader::new(&[0xB3, b'a', b'b']);
    assert_eq!(reader.read_cstr(), "");
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);

    let mut reader = Reader::new(&[0xB3, b'a', b'b']);
    assert_eq!(reader.read_cstring_header(), 0);
    assert!(!reader.is_valid());
}

#[test]
fn test_type_mismatch_consumes_only_the_header() {
    let mut buf = Vec::new();
    Writer::new(&mut buf)
        .write_i64(5)
        .write_str("s")
        .write_array_header(2)
        .write_map_header(0)
        .write_bool(true)
        .write_cstr("c")
        .write_f32(1.0)
        .begin_object();

    let mut reader = Reader::new(&buf);
    assert!(!reader.read_bool());
    assert_eq!(reader.offset(), 1);

    let mut reader = Reader::with_offset(&buf, 1);
    assert_eq!(reader.read_i64(), 0);
    assert_eq!(reader.offset(), 2);

    let mut reader = Reader::with_offset(&buf, 4);
    assert_eq!(reader.read_map_header(), 0);
    assert_eq!(reader.offset(), 5);

    let mut reader = Reader::with_offset(&buf, 5);
    assert_eq!(reader.read_array_header(), 0);
    assert_eq!(reader.offset(), 6);

    let mut reader = Reader::with_offset(&buf, 6);
    assert_eq!(reader.read_f32(), 0.0);
    assert_eq!(reader.offset(), 7);

    let mut reader = Reader::with_offset(&buf, 7);
    assert_eq!(reader.read_sized_str(), "");
    assert_eq!(reader.offset(), 8);

    let mut reader = Reader::with_offset(&buf, 10);
    assert_eq!(reader.read_i64(), 0);
    assert_eq!(reader.offset(), 11);

    let mut reader = Reader::with_offset(&buf, 15);
    reader.read_end_object();
    assert_eq!(reader.errors(), ReadErrors::TYPE_MISMATCH);
}

#[test]
fn test_strict_float_reads() {
    let mut buf = Vec::new();
    Writer::new(&mut buf).write_f32(1.0);

    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_half(), 0.0);
    assert_eq!(reader.errors(), ReadErrors::TYPE_MISMATCH);

    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_float64(), 0.0);
    assert!(!reader.is_valid());

    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_float32(), 1.0);
    assert!(reader.is_valid());
}

#[test]
fn test_reading_continues_after_mismatch() {
    let mut buf = Vec::new();
    Writer::new(&mut buf).write_bool(true).write_i64(-9);
    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_i64(), 0);
    assert_eq!(reader.read_i64(), -9);
    assert_eq!(reader.errors(), ReadErrors::TYPE_MISMATCH);
    assert!(!reader.has_any_more());
}

#[test]
fn test_errors_are_never_cleared() {
    let mut reader = Reader::new(&[0x98, 0x40]);
    reader.read_i64();
    assert_eq!(reader.read_i64(), 0);
    assert!(!reader.is_valid());
    assert_eq!(reader.finish(), Err(Error::TypeMismatch));
}

#[test]
fn test_finish_maps_flags_to_errors() {
    assert_eq!(Error::from_read_errors(ReadErrors::OK), None);
    assert_eq!(
        Error::from_read_errors(ReadErrors::BUFFER_TOO_SMALL),
        Some(Error::BufferTooSmall)
    );
    let both = ReadErrors::BUFFER_TOO_SMALL | ReadErrors::TYPE_MISMATCH;
    assert_eq!(
        Error::from_read_errors(both),
        Some(Error::Invalid { errors: both })
    );
    assert_eq!(both.bits(), 3);

    assert_eq!(Error::BufferTooSmall.to_string(), "buffer too small for encoded value");
    assert_eq!(Error::TypeMismatch.to_string(), "type mismatch in encoded data");
    assert_eq!(
        Error::Invalid { errors: both }.to_string(),
        "invalid encoded data ({BUFFER_TOO_SMALL, TYPE_MISMATCH})"
    );
}

#[test]
fn test_decode_reports_errors() {
    assert_eq!(decode::<u32>(&[]), Err(Error::BufferTooSmall));
    assert_eq!(decode::<bool>(&[0x40]), Err(Error::TypeMismatch));
    assert_eq!(decode::<String>(&[0x40]), Err(Error::TypeMismatch));
    assert_eq!(decode::<Vec<u32>>(&[0xA3, 0x41]), Err(Error::BufferTooSmall));
}

#[test]
fn test_invalid_utf8() {
    let mut buf = Vec::new();
    Writer::new(&mut buf).write_sized_bytes_str(&[0xFF, 0xFE]);
    assert_eq!(decode::<String>(&buf), Err(Error::TypeMismatch));
}

#[test]
fn test_invalid_char() {
    let bytes = encode(&0xD800u32);
    assert_eq!(decode::<char>(&bytes), Err(Error::TypeMismatch));
}

#[test]
fn test_hostile_lengths() {
    // array claiming far more elements than bytes remain
    let mut buf = vec![0xB2];
    buf.extend_from_slice(&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(decode::<Vec<u64>>(&buf), Err(Error::BufferTooSmall));

    // byte array claiming u64::MAX bytes
    let mut buf = vec![0xFE, 0xFF];
    buf.extend_from_slice(&[0xFF; 8]);
    let mut reader = Reader::new(&buf);
    assert!(reader.read_byte_array().is_empty());
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);
}

#[test]
fn test_hostile_count_after_earlier_truncation() {
    // a 10-byte string with nothing behind its header except a huge array header
    let mut buf = vec![0xB4 + 10, 0xB2];
    buf.extend_from_slice(&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_sized_str(), "");
    assert_eq!(reader.errors(), ReadErrors::BUFFER_TOO_SMALL);
    assert_eq!(reader.offset(), 1);

    let items: Vec<u32> = reader.read_vec();
    assert!(items.is_empty());
    assert!(!reader.has_any_more());
}

#[test]
fn test_sets_and_arrays_after_mismatch() {
    let mut buf = Vec::new();
    Writer::new(&mut buf)
        .write_str("not a number")
        .write(&[3u8, 1, 2])
        .write_slice(&[4u16, 5])
        .write_bool(false);

    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_u64(), 0);
    // the string payload follows its header; skip it
    let rest = reader.read_raw("not a number".len() + 1);
    assert_eq!(rest.last(), Some(&0));

    let bytes: [u8; 3] = reader.read();
    assert_eq!(bytes, [3, 1, 2]);
    let set: std::collections::BTreeSet<u16> = reader.read();
    assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![4, 5]);
    assert!(!reader.read_bool());
    assert_eq!(reader.errors(), ReadErrors::TYPE_MISMATCH);
}

#[test]
fn test_interior_nul_in_cstring() {
    let mut buf = Vec::new();
    let mut writer = Writer::new(&mut buf);
    writer.write_cstr("a\0b");
    assert_eq!(writer.errors(), WriteErrors::INTERIOR_NUL);
    assert!(!writer.is_valid());

    // the reader sees the string cut at the first NUL
    let mut reader = Reader::new(&buf);
    assert_eq!(reader.read_cstr(), "a");
    assert!(reader.has_any_more());
}
