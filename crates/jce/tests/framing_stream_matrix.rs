use jce::{
    ErrorKind, FieldType, FrameError, FrameReader, FrameWriter, Framer, JceConfig, JceError,
    JceOption, JceStruct, JceValue, Schema,
};

fn message(id: i64, body: &str) -> JceValue<'static> {
    let mut fields = JceStruct::new();
    fields.insert(0, JceValue::Int(id));
    fields.insert(1, JceValue::from(body.to_string()));
    JceValue::Struct(fields)
}

fn framer_matrix() -> Vec<Framer> {
    let mut framers = Vec::new();
    for length_type in [1, 2, 4] {
        for inclusive in [true, false] {
            for little_endian in [true, false] {
                framers.push(Framer::new(length_type, inclusive, little_endian, 1024).unwrap());
            }
        }
    }
    framers
}

#[test]
fn byte_at_a_time_stream_matrix() {
    for framer in framer_matrix() {
        let writer = FrameWriter::new(framer, JceConfig::new());
        let mut stream = Vec::new();
        for id in 1..=3 {
            stream.extend_from_slice(&writer.write_value(&message(id, "ping")).unwrap());
        }

        let mut reader = FrameReader::new(framer, JceConfig::new());
        let mut decoded = Vec::new();
        for byte in stream {
            reader.feed(&[byte]).unwrap();
            while let Some(value) = reader.next_value().unwrap() {
                decoded.push(value);
            }
        }
        assert_eq!(
            decoded,
            vec![message(1, "ping"), message(2, "ping"), message(3, "ping")],
            "{framer:?}"
        );
        assert_eq!(reader.buffered(), 0);
    }
}

#[test]
fn little_endian_payloads_inside_frames() {
    let config = JceConfig::new().with_option(JceOption::LITTLE_ENDIAN);
    let framer = Framer::default();
    let frame = FrameWriter::new(framer, config.clone())
        .write_value(&message(0x1234, "le"))
        .unwrap();
    // 4-byte big-endian inclusive prefix, then an Int2 in little-endian order
    assert_eq!(&frame[..7], &[0x00, 0x00, 0x00, 0x0b, 0x01, 0x34, 0x12]);

    let mut reader = FrameReader::new(framer, config);
    reader.feed(&frame).unwrap();
    assert_eq!(reader.next_value().unwrap(), Some(message(0x1234, "le")));
}

#[test]
fn schema_frames_decode_to_records() {
    let schema = Schema::builder("Ping")
        .field("id", 0, FieldType::Long)
        .field("body", 1, FieldType::String)
        .build()
        .unwrap();
    let framer = Framer::default();
    let mut fields = jce::Fields::new();
    fields.insert("id".into(), JceValue::Int(9));
    fields.insert("body".into(), JceValue::from("pong"));
    let frame = FrameWriter::new(framer, JceConfig::new())
        .write_fields(&schema, &fields)
        .unwrap();

    let mut reader = FrameReader::new(framer, JceConfig::new()).with_schema(schema);
    reader.feed(&frame).unwrap();
    let record = reader.next_value().unwrap().unwrap();
    assert_eq!(record, JceValue::Record(fields.clone()).into_owned());
}

#[test]
fn bad_frame_stays_until_discarded() {
    let framer = Framer::default();
    let good = FrameWriter::new(framer, JceConfig::new())
        .write_value(&message(1, "ok"))
        .unwrap();

    let mut reader = FrameReader::new(framer, JceConfig::new());
    // frame whose body is a reserved wire type
    reader.feed(&[0x00, 0x00, 0x00, 0x05, 0x0e]).unwrap();
    reader.feed(&good).unwrap();

    let err = reader.next_value().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert_eq!(reader.buffered(), 5 + good.len());
    assert_eq!(reader.next_value().unwrap_err().kind(), ErrorKind::Malformed);

    assert!(reader.discard_frame().unwrap());
    assert_eq!(reader.next_value().unwrap(), Some(message(1, "ok")));
    assert!(!reader.discard_frame().unwrap());
}

#[test]
fn truncated_body_inside_complete_frame_is_partial() {
    let framer = Framer::default();
    let mut reader = FrameReader::new(framer, JceConfig::new());
    // String1 claiming 4 bytes with only 1 in the frame
    reader.feed(&[0x00, 0x00, 0x00, 0x07, 0x06, 0x04, b'x']).unwrap();
    assert_eq!(reader.next_value().unwrap_err().kind(), ErrorKind::PartialData);
}

#[test]
fn frame_limits() {
    let framer = Framer::new(4, true, false, 16).unwrap();
    let big = message(1, "this body is far too long");
    let err = FrameWriter::new(framer, JceConfig::new())
        .write_value(&big)
        .unwrap_err();
    assert!(matches!(err, JceError::Frame(FrameError::FrameTooLarge(_, 16))));

    let mut reader = FrameReader::new(framer, JceConfig::new());
    reader.feed(&[0x00, 0x00, 0x01, 0x00]).unwrap();
    assert_eq!(
        reader.next_value().unwrap_err(),
        JceError::Frame(FrameError::FrameTooLarge(256, 16))
    );

    let mut reader = FrameReader::new(framer, JceConfig::new()).with_max_buffer_size(8);
    reader.feed(&[0; 6]).unwrap();
    assert_eq!(reader.feed(&[0; 3]), Err(FrameError::BufferOverflow(9, 8)));
    assert_eq!(reader.buffered(), 6);
}

#[test]
fn one_byte_prefix_cannot_carry_long_frames() {
    let framer = Framer::new(1, false, false, 1024).unwrap();
    let body = "x".repeat(300);
    let err = FrameWriter::new(framer, JceConfig::new())
        .write_value(&message(1, &body))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Frame);
}

#[test]
fn invalid_prefix_width_is_rejected() {
    assert_eq!(Framer::new(3, true, false, 1024), Err(FrameError::InvalidPrefix(3)));
}
