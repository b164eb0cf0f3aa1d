use ionbin::prelude::*;

const IVM: [u8; 4] = [0xe0, 0x01, 0x00, 0xea];

fn flushed(w: &mut BinaryWriter) -> Vec<u8> {
    let mut out = vec![];
    w.flush_to_vec(&mut out).unwrap();
    out
}

#[test]
fn struct_with_a_new_symbol() {
    let _ = pretty_env_logger::try_init();
    let mut w = BinaryWriter::new();
    w.step_in(IonType::Struct).unwrap();
    w.set_field_name("name").unwrap();
    w.write_symbol("alpha").unwrap();
    w.step_out().unwrap();

    let mut expected = IVM.to_vec();
    expected.extend_from_slice(&[
        0xeb, 0x81, 0x83, // $ion_symbol_table::
        0xd8, 0x87, 0xb6, // {symbols: [
        0x85, b'a', b'l', b'p', b'h', b'a', // "alpha"]}
        0xd3, 0x84, 0x71, 0x0a, // {name: alpha}
    ]);
    let bytes = flushed(&mut w);
    assert_eq!(bytes, expected);

    let mut r = ReaderBuilder::new()
        .process_symbol_tables(true)
        .build(buf_source(&bytes[..]));
    assert_eq!(r.next().unwrap(), Some(IonType::Struct));
    assert_eq!(r.symbol_table().find_known_symbol(10), Some("alpha"));
    r.step_in().unwrap();
    assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(r.field_id(), Some(4));
    assert_eq!(r.field_name(), Some("name"));
    assert_eq!(r.symbol_id().unwrap(), 10);
    assert_eq!(r.string_value().unwrap(), "alpha");
    assert_eq!(r.next().unwrap(), None);
    r.step_out().unwrap();
    assert_eq!(r.next().unwrap(), None);
}

#[test]
fn single_true() {
    let mut w = BinaryWriter::new();
    w.write_bool(true).unwrap();
    let bytes = flushed(&mut w);
    assert_eq!(bytes, vec![0xe0, 0x01, 0x00, 0xea, 0x11]);

    let mut r = BinaryReader::from_bytes(&bytes[..]);
    assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(r.next().unwrap(), Some(IonType::Bool));
    assert!(r.bool_value().unwrap());
    assert_eq!(r.next().unwrap(), None);
}

#[test]
fn decimal_layout() {
    let mut w = BinaryWriter::new();
    w.write_decimal(&"-123.45".parse().unwrap()).unwrap();
    w.write_decimal(&Decimal::zero()).unwrap();
    assert_eq!(&flushed(&mut w)[4..], &[0x53, 0xc2, 0xb0, 0x39, 0x50]);
}

#[test]
fn month_precision_timestamp() {
    let ts = Timestamp::with_month(2007, 2).unwrap();
    let mut w = BinaryWriter::new();
    w.write_timestamp(&ts).unwrap();
    let bytes = flushed(&mut w);
    assert_eq!(&bytes[4..], &[0x64, 0xc0, 0x0f, 0xd7, 0x82]);

    let mut r = ReaderBuilder::new()
        .process_symbol_tables(true)
        .build(buf_source(&bytes[..]));
    assert_eq!(r.next().unwrap(), Some(IonType::Timestamp));
    let back = r.timestamp_value().unwrap();
    assert_eq!(back.precision(), Precision::Month);
    assert_eq!(back.offset(), None);
    assert_eq!(back, ts);
}

#[test]
fn padding_inside_a_struct() {
    // {name: "x", <3 byte pad>, version: 5}
    let bytes = [
        0xe0, 0x01, 0x00, 0xea, //
        0xda, 0x84, 0x81, b'x', //
        0x80, 0x02, 0x00, 0x00, //
        0x85, 0x21, 0x05,
    ];
    let mut r = ReaderBuilder::new()
        .process_symbol_tables(true)
        .build(buf_source(&bytes[..]));
    assert_eq!(r.next().unwrap(), Some(IonType::Struct));
    r.step_in().unwrap();
    assert_eq!(r.next().unwrap(), Some(IonType::String));
    assert_eq!(r.next().unwrap(), Some(IonType::Int));
    assert_eq!(r.field_name(), Some("version"));
    assert_eq!(r.int_value().unwrap(), 5);
    assert_eq!(r.next().unwrap(), None);
    r.step_out().unwrap();
    assert_eq!(r.next().unwrap(), None);
}

#[test]
fn ordered_struct() {
    // ordered {name: 1}
    let bytes = [0xd1, 0x83, 0x84, 0x21, 0x01];
    let mut r = BinaryReader::from_bytes(&bytes[..]);
    assert_eq!(r.next().unwrap(), Some(IonType::Struct));
    assert!(r.is_ordered_struct());
    r.step_in().unwrap();
    assert_eq!(r.next().unwrap(), Some(IonType::Int));
    assert_eq!(r.field_id(), Some(4));
}

#[test]
fn big_ints() {
    let big = BigInt::from(u64::max_value()) * BigInt::from(1000);
    let mut w = BinaryWriter::new();
    w.write_bigint(&big).unwrap();
    w.write_int(i64::min_value()).unwrap();
    let bytes = flushed(&mut w);

    let mut r = BinaryReader::from_bytes(&bytes[..]);
    r.next().unwrap();
    r.next().unwrap();
    assert_eq!(r.integer_size().unwrap(), IntegerSize::BigInteger);
    match r.int_value() {
        Err(IonError::Overflow(_)) => {}
        other => panic!("expected overflow, got {:?}", other),
    }
    assert_eq!(r.bigint_value().unwrap(), big);
    r.next().unwrap();
    assert_eq!(r.integer_size().unwrap(), IntegerSize::Long);
    assert_eq!(r.int_value().unwrap(), i64::min_value());
}

#[test]
fn floats() {
    let mut w = BinaryWriter::new();
    w.write_float(0.0).unwrap();
    w.write_float(-0.0).unwrap();
    w.write_f32(1.5).unwrap();
    let bytes = flushed(&mut w);
    assert_eq!(bytes[4], 0x40);
    assert_eq!(bytes[5], 0x48);
    assert_eq!(&bytes[14..], &[0x44, 0x3f, 0xc0, 0x00, 0x00]);

    let mut r = BinaryReader::from_bytes(&bytes[..]);
    r.next().unwrap();
    r.next().unwrap();
    assert_eq!(r.float_value().unwrap(), 0.0);
    r.next().unwrap();
    assert!(r.float_value().unwrap().is_sign_negative());
    r.next().unwrap();
    assert_eq!(r.float_value().unwrap(), 1.5);
}

#[test]
fn truncated_stream() {
    let mut w = BinaryWriter::new();
    w.write_string("hello").unwrap();
    let bytes = flushed(&mut w);
    let mut r = BinaryReader::new(IoSource::new(&bytes[..bytes.len() - 2]));
    r.next().unwrap();
    assert_eq!(r.next().unwrap(), Some(IonType::String));
    match r.string_value() {
        Err(IonError::UnexpectedEnd { position }) => assert_eq!(position, 8),
        other => panic!("expected unexpected end, got {:?}", other),
    }
}

#[test]
fn flush_into_io_sink() {
    let mut w = BinaryWriter::new();
    w.step_in(IonType::List).unwrap();
    w.write_null().unwrap();
    w.write_typed_null(IonType::Blob).unwrap();
    assert_eq!(w.flush(&mut Vec::<u8>::new()).unwrap(), FlushStatus::NotReady);
    w.step_out().unwrap();
    let mut sink = Vec::new();
    assert_eq!(w.flush(&mut sink).unwrap(), FlushStatus::Flushed(7));
    assert_eq!(&sink[4..], &[0xb2, 0x0f, 0xaf]);
}
