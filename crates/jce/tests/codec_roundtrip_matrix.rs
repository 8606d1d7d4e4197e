use indexmap::IndexMap;
use jce::{
    dumps, loads, BytesMode, JceConfig, JceKey, JceOption, JceStruct, JceValue, MAX_DEPTH,
};

fn raw() -> JceConfig {
    JceConfig::new().with_bytes_mode(BytesMode::Raw)
}

fn sample() -> JceStruct<'static> {
    let mut inner = JceStruct::new();
    inner.insert(0, JceValue::Int(-1));
    inner.insert(20, JceValue::from(vec![1u8, 2, 3]));

    let mut map = IndexMap::new();
    map.insert(JceKey::Int(1), JceValue::Int(100_000));
    map.insert(JceKey::Bytes(b"k".to_vec()), JceValue::Double(2.5));

    let mut fields = JceStruct::new();
    fields.insert(0, JceValue::Int(0));
    fields.insert(1, JceValue::Int(i64::from(i16::MIN)));
    fields.insert(2, JceValue::Int(i64::MAX));
    fields.insert(3, JceValue::Float(1.5));
    fields.insert(4, JceValue::Double(-1234.125));
    fields.insert(5, JceValue::from(vec![b'x'; 300]));
    fields.insert(6, JceValue::List(vec![JceValue::Int(1), JceValue::Int(2)]));
    fields.insert(7, JceValue::Map(map));
    fields.insert(14, JceValue::Struct(inner));
    fields.insert(15, JceValue::from(Vec::<u8>::new()));
    fields.insert(255, JceValue::Int(7));
    fields
}

fn roundtrip(option: JceOption) {
    let fields = sample();
    let data = dumps(&JceValue::Struct(fields.clone()), option).unwrap();
    let config = raw().with_option(option);
    let mut decoded = loads(&data, &config).unwrap();
    // empty payloads come back as the empty string in every bytes mode
    assert_eq!(decoded.insert(15, JceValue::from(Vec::<u8>::new())), Some(JceValue::from("")));
    assert_eq!(decoded, fields);
}

#[test]
fn roundtrip_matrix_big_endian() {
    roundtrip(JceOption::NONE);
}

#[test]
fn roundtrip_matrix_little_endian() {
    roundtrip(JceOption::LITTLE_ENDIAN);
}

#[test]
fn roundtrip_matrix_zero_copy() {
    roundtrip(JceOption::ZERO_COPY);
}

#[test]
fn little_endian_changes_multibyte_ints_only() {
    let mut fields = JceStruct::new();
    fields.insert(0, JceValue::Int(0x0102));
    let be = dumps(&JceValue::Struct(fields.clone()), JceOption::NONE).unwrap();
    let le = dumps(&JceValue::Struct(fields), JceOption::LITTLE_ENDIAN).unwrap();
    assert_eq!(be, [0x01, 0x01, 0x02]);
    assert_eq!(le, [0x01, 0x02, 0x01]);
}

#[test]
fn zero_encodes_as_zero_tag() {
    let mut fields = JceStruct::new();
    fields.insert(3, JceValue::Int(0));
    let data = dumps(&JceValue::Struct(fields), JceOption::NONE).unwrap();
    assert_eq!(data, [0x3c]);
}

#[test]
fn large_tags_use_extension_byte() {
    let mut fields = JceStruct::new();
    fields.insert(15, JceValue::Int(1));
    fields.insert(200, JceValue::Int(2));
    let data = dumps(&JceValue::Struct(fields.clone()), JceOption::NONE).unwrap();
    assert_eq!(data, [0xf0, 0x0f, 0x01, 0xf0, 0xc8, 0x02]);
    assert_eq!(loads(&data, &raw()).unwrap(), fields);
}

#[test]
fn long_strings_switch_to_string4() {
    let text = "a".repeat(256);
    let mut fields = JceStruct::new();
    fields.insert(0, JceValue::from(text.as_str()));
    let data = dumps(&JceValue::Struct(fields.clone()), JceOption::NONE).unwrap();
    assert_eq!(&data[..5], &[0x07, 0x00, 0x00, 0x01, 0x00]);
    assert_eq!(data.len(), 5 + 256);
    assert_eq!(loads(&data, &JceConfig::new()).unwrap(), fields);
}

#[test]
fn scalar_top_level_lands_under_tag_zero() {
    let data = dumps(&JceValue::Int(5), JceOption::NONE).unwrap();
    assert_eq!(data, [0x00, 0x05]);
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    assert_eq!(decoded[&0], JceValue::Int(5));
}

#[test]
fn repeated_tag_keeps_last_value() {
    let data = [0x00, 0x01, 0x00, 0x02];
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[&0], JceValue::Int(2));
}

#[test]
fn nesting_up_to_limit_roundtrips() {
    let mut value = JceValue::Int(1);
    for _ in 0..MAX_DEPTH - 1 {
        value = JceValue::List(vec![value]);
    }
    let data = dumps(&value, JceOption::NONE).unwrap();
    let decoded = loads(&data, &raw()).unwrap();
    assert_eq!(decoded[&0], value);
}

#[test]
fn record_values_cannot_be_encoded_generically() {
    let mut record = jce::Fields::new();
    record.insert("a".to_string(), JceValue::Int(1));
    let err = dumps(&JceValue::Record(record), JceOption::NONE).unwrap_err();
    assert_eq!(err.kind(), jce::ErrorKind::Unencodable);
}
