use jce::{
    dumps, loads, loads_nodes, BytesMode, JceConfig, JceKey, JceOption, JceStruct, JceValue,
    NodeValue, WireType,
};
use serde_json::json;

fn with_mode(mode: BytesMode) -> JceConfig {
    JceConfig::new().with_bytes_mode(mode)
}

/// Wraps `payload` as a String1 at tag 0.
fn string_field(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0x06, payload.len() as u8];
    data.extend_from_slice(payload);
    data
}

#[test]
fn bytes_mode_matrix() {
    let nested = [0x00, 0x05, 0x16, 0x02, b'o', b'k'];
    let cases: [(&[u8], BytesMode, JceValue<'static>); 9] = [
        (b"hello", BytesMode::Raw, JceValue::from(b"hello".to_vec())),
        (b"hello", BytesMode::String, JceValue::from("hello")),
        (b"hello", BytesMode::Auto, JceValue::from("hello")),
        (&[0x00, 0x01, 0x02], BytesMode::Raw, JceValue::from(vec![0u8, 1, 2])),
        (&[0x00, 0x01, 0x02], BytesMode::String, JceValue::from(vec![0u8, 1, 2])),
        (&[0x00, 0x01, 0x02], BytesMode::Auto, JceValue::from(vec![0u8, 1, 2])),
        (b"", BytesMode::Raw, JceValue::from("")),
        (b"", BytesMode::Auto, JceValue::from("")),
        (&nested, BytesMode::String, JceValue::from(nested.to_vec())),
    ];
    for (payload, mode, expected) in cases {
        let data = string_field(payload);
        let decoded = loads(&data, &with_mode(mode)).unwrap();
        assert_eq!(decoded[&0], expected, "payload {payload:02x?} mode {mode}");
    }
}

#[test]
fn auto_mode_unpacks_nested_blob() {
    let data = string_field(&[0x00, 0x05, 0x16, 0x02, b'o', b'k']);
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    let inner = decoded[&0].as_struct().unwrap();
    assert_eq!(inner[&0], JceValue::Int(5));
    assert_eq!(inner[&1], JceValue::from("ok"));
}

#[test]
fn auto_mode_unpacks_encoded_bytes_field() {
    let mut inner = JceStruct::new();
    inner.insert(0, JceValue::Int(42));
    let blob = dumps(&JceValue::Struct(inner.clone()), JceOption::NONE).unwrap();

    let mut outer = JceStruct::new();
    outer.insert(3, JceValue::from(blob));
    let data = dumps(&JceValue::Struct(outer), JceOption::NONE).unwrap();

    let decoded = loads(&data, &JceConfig::new()).unwrap();
    assert_eq!(decoded[&3], JceValue::Struct(inner));
}

#[test]
fn auto_mode_stops_nested_blob_at_struct_end() {
    // {0: 5}, struct end, trailing byte
    let data = string_field(&[0x00, 0x05, 0x0b, 0xff]);
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    let inner = decoded[&0].as_struct().unwrap();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[&0], JceValue::Int(5));
}

#[test]
fn node_reparse_keeps_prefix_of_truncated_blob() {
    // simple list whose payload is {0: 5} then a bare String1 header
    let data = [0x0d, 0x00, 0x00, 0x04, 0x00, 0x05, 0x16, 0x05];
    let nodes = loads_nodes(&data, JceOption::NONE).unwrap();
    let inner = nodes[0].children();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].value, NodeValue::Int(5));
}

#[test]
fn map_keys_are_classified() {
    // {"id": 1}
    let data = [0x08, 0x00, 0x01, 0x06, 0x02, b'i', b'd', 0x10, 0x01];
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    let map = decoded[&0].as_map().unwrap();
    assert_eq!(map[&JceKey::from("id")], JceValue::Int(1));

    let raw = loads(&data, &with_mode(BytesMode::Raw)).unwrap();
    let map = raw[&0].as_map().unwrap();
    assert_eq!(map[&JceKey::Bytes(b"id".to_vec())], JceValue::Int(1));
}

#[test]
fn composite_map_keys_are_frozen() {
    // {[1, 2]: 7}
    let data = [0x08, 0x00, 0x01, 0x09, 0x00, 0x02, 0x00, 0x01, 0x00, 0x02, 0x10, 0x07];
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    let map = decoded[&0].as_map().unwrap();
    let key = JceKey::Tuple(vec![JceKey::Int(1), JceKey::Int(2)].into());
    assert_eq!(map[&key], JceValue::Int(7));
    assert_eq!(key.to_value(), JceValue::List(vec![JceValue::Int(1), JceValue::Int(2)]));
}

#[test]
fn json_view_of_decoded_struct() {
    let data = [
        0x00, 0x7b, // 0: 123
        0x16, 0x02, b'h', b'i', // 1: "hi"
        0x26, 0x02, 0xff, 0x00, // 2: binary
        0x35, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 3: 1.5
    ];
    let decoded = loads(&data, &JceConfig::new()).unwrap();
    let json = serde_json::Value::from(JceValue::Struct(decoded));
    assert_eq!(
        json,
        json!({
            "0": 123,
            "1": "hi",
            "2": "data:application/octet-stream;base64,/wA=",
            "3": 1.5,
        })
    );
}

#[test]
fn node_tree_keeps_wire_details() {
    let data = [
        0x00, 0x7b, // 0: Int1
        0x17, 0x00, 0x00, 0x00, 0x02, b'h', b'i', // 1: String4
        0x2a, 0x0c, 0x0b, // 2: struct { 0: ZeroTag }
    ];
    let nodes = loads_nodes(&data, JceOption::NONE).unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].wire_type, WireType::Int1);
    assert_eq!(nodes[1].wire_type, WireType::String4);
    assert_eq!(nodes[1].length, Some(2));
    assert_eq!(nodes[1].value, NodeValue::Text("hi".into()));
    assert_eq!(nodes[2].wire_type, WireType::StructBegin);
    let children = nodes[2].children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].wire_type, WireType::ZeroTag);
    assert_eq!(children[0].value, NodeValue::Int(0));
}

#[test]
fn node_tree_tolerates_truncation_but_not_garbage() {
    let nodes = loads_nodes(&[0x00, 0x01, 0x16, 0x09, b'x'], JceOption::NONE).unwrap();
    assert_eq!(nodes.len(), 1);

    assert!(loads_nodes(&[0x00, 0x01, 0x0f], JceOption::NONE).is_err());
}

#[test]
fn node_tree_honours_little_endian() {
    let nodes = loads_nodes(&[0x01, 0x02, 0x01], JceOption::LITTLE_ENDIAN).unwrap();
    assert_eq!(nodes[0].value, NodeValue::Int(0x0102));
}

#[test]
fn node_tree_serializes_nested_json() {
    let nodes = loads_nodes(&[0x1a, 0x0c, 0x0b], JceOption::NONE).unwrap();
    let json = serde_json::to_value(&nodes).unwrap();
    assert_eq!(
        json,
        json!([{
            "tag": 1,
            "wire_type": "StructBegin",
            "value": {"nodes": [{"tag": 0, "wire_type": "ZeroTag", "value": {"int": 0}}]},
        }])
    );
}
