//! Decode and encode tests against reference wire data.

mod common;

use heka_matcher::codec::write_frame_header;
use heka_matcher::{decode, decode_into, Encoder, FieldValues, HekaError, Message, TypedValue};
use serde_json::json;

const TEST_UUID: &[u8] = b"\x0a\x10\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff";
const TEST_NS: &[u8] = b"\x10\x01";

fn with_required(rest: &[u8]) -> Vec<u8> {
    [TEST_UUID, TEST_NS, rest].concat()
}

#[test]
fn test_decode_fixture_headers() {
    let message = common::fixture();
    assert_eq!(message.uuid_string(), "230081dc-326f-4e3f-9a5a-9386a37e246f");
    assert_eq!(message.timestamp, common::FIXTURE_TIMESTAMP);
    assert_eq!(message.msg_type.as_deref(), Some(&b"TEST"[..]));
    assert_eq!(message.logger.as_deref(), Some(&b"GoSpec"[..]));
    assert_eq!(message.severity, Some(6));
    assert_eq!(message.payload.as_deref(), Some(common::PAYLOAD.as_bytes()));
    assert_eq!(message.env_version.as_deref(), Some(&b"0.8"[..]));
    assert_eq!(message.pid, Some(32157));
    assert_eq!(message.hostname.as_deref(), Some(&b"trink-x230"[..]));
}

#[test]
fn test_decode_fixture_fields() {
    let message = common::fixture();
    let names: Vec<&str> = message.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "foo",
            "number",
            "bytes",
            "int",
            "double",
            "bool",
            "foo",
            "Payload",
            "Timestamp",
            "zero",
            "string"
        ]
    );

    assert_eq!(message.read_field("foo", 1, 0), Some(TypedValue::String(b"alternate")));
    assert_eq!(message.read_field("bytes", 0, 0), Some(TypedValue::String(b"data")));
    assert!(matches!(message.fields[2].values, FieldValues::Bytes(_)));
    assert_eq!(message.read_field("int", 0, 1), Some(TypedValue::Numeric(1024.0)));
    assert_eq!(message.read_field("double", 0, 0), Some(TypedValue::Numeric(99.9)));
    assert_eq!(message.read_field("bool", 0, 0), Some(TypedValue::Bool(true)));
    assert_eq!(message.read_field("zero", 0, 0), Some(TypedValue::Numeric(0.0)));
    assert_eq!(
        message.field("Timestamp", 0).and_then(|f| f.representation.as_deref()),
        Some("date-time")
    );
}

#[test]
fn test_decode_header_and_field_variants() {
    let cases: [&[u8]; 12] = [
        b"\x1a\x04Type",
        b"\x22\x06Logger",
        b"\x28\x07",
        b"\x32\x07Payload",
        b"\x3a\x0aEnvVersion",
        b"\x40\x11",
        b"\x4a\x08Hostname",
        b"\x52\x11\x0a\x03foo\x10\x00\x1a\x03rep\x22\x03bar",
        b"\x52\x11\x0a\x03foo\x10\x01\x1a\x03rep\x2a\x03bar",
        b"\x52\x0e\x0a\x03foo\x10\x02\x1a\x03rep\x30\x11",
        b"\x52\x15\x0a\x03foo\x10\x03\x1a\x03rep\x39\x00\x00\x00\x00\x00\x00\x00\x00",
        b"\x52\x0e\x0a\x03foo\x10\x04\x1a\x03rep\x40\x01",
    ];
    for (i, rest) in cases.iter().enumerate() {
        let result = decode(&with_required(rest));
        assert!(result.is_ok(), "case {}: {:?}", i, result);
    }
    assert!(decode(&[]).is_err());
}

#[test]
fn test_decode_failures() {
    let wiretype = |byte: u8| HekaError::UnexpectedWiretype {
        tag: u32::from(byte >> 3),
        wiretype: byte & 7,
        offset: 0,
    };

    assert_eq!(
        decode(b"\x0a\x01\xff"),
        Err(HekaError::InvalidLength {
            tag: 1,
            length: 1,
            offset: 0
        })
    );
    assert_eq!(
        decode(b"\xf0\x01"),
        Err(HekaError::UnknownTag {
            tag: 30,
            wiretype: 0,
            offset: 0
        })
    );
    for byte in [0x0b, 0x11, 0x1b, 0x23, 0x2b, 0x33, 0x3b, 0x43, 0x4b, 0x53] {
        assert_eq!(decode(&[byte]), Err(wiretype(byte)), "key {:#04x}", byte);
    }

    assert!(matches!(
        decode(b"\x52\x10"),
        Err(HekaError::TruncatedBuffer { .. })
    ));
    for byte in [0x0b, 0x13, 0x1b, 0x23, 0x2b, 0x33, 0x3b, 0x43] {
        assert_eq!(
            decode(&[0x52, 0x01, byte]),
            Err(HekaError::UnexpectedWiretype {
                tag: u32::from(byte >> 3),
                wiretype: 3,
                offset: 2
            }),
            "field key {:#04x}",
            byte
        );
    }
    assert_eq!(
        decode(b"\x52\x01\x4b"),
        Err(HekaError::UnknownTag {
            tag: 9,
            wiretype: 3,
            offset: 2
        })
    );
    assert_eq!(
        decode(b"\x52\x0c\x10\x00\x1a\x03rep\x22\x03bar"),
        Err(HekaError::MissingRequiredField { name: "name" })
    );
    assert!(matches!(
        decode(b"\x10\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff"),
        Err(HekaError::MalformedVarint { .. })
    ));
    assert!(matches!(
        decode(b"\x0a\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff"),
        Err(HekaError::MalformedVarint { .. })
    ));
}

#[test]
fn test_failed_decode_leaves_message_empty() {
    let mut message = common::fixture();
    assert!(decode_into(b"\x0a\x01\xff", &mut message).is_err());
    assert_eq!(message, Message::default());

    decode_into(&common::fixture_bytes(), &mut message).unwrap();
    assert_eq!(message, common::fixture());
}

#[test]
fn test_read_field_arrays() {
    let bytes = with_required(
        b"\x52\x13\x0a\x06number\x10\x03\x39\x00\x00\x00\x00\x00\x00\xf0\x3f\
\x52\x2c\x0a\x07numbers\x10\x03\x1a\x05count\x3a\x18\
\x00\x00\x00\x00\x00\x00\xf0\x3f\x00\x00\x00\x00\x00\x00\x00\x40\x00\x00\x00\x00\x00\x00\x08\x40\
\x52\x0e\x0a\x05bools\x10\x04\x42\x03\x01\x00\x00\
\x52\x0a\x0a\x04bool\x10\x04\x40\x01\
\x52\x10\x0a\x06string\x22\x06string\
\x52\x15\x0a\x07strings\x22\x02s1\x22\x02s2\x22\x02s3",
    );
    let message = decode(&bytes).unwrap();

    assert_eq!(message.read_field("string", 0, 0), Some(TypedValue::String(b"string")));
    assert_eq!(message.read_field("strings", 0, 0), Some(TypedValue::String(b"s1")));
    assert_eq!(message.read_field("strings", 0, 1), Some(TypedValue::String(b"s2")));
    assert_eq!(message.read_field("strings", 0, 2), Some(TypedValue::String(b"s3")));
    assert_eq!(message.read_field("strings", 0, 3), None);

    assert_eq!(message.read_field("number", 0, 0), Some(TypedValue::Numeric(1.0)));
    for (i, expected) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        assert_eq!(
            message.read_field("numbers", 0, i),
            Some(TypedValue::Numeric(expected))
        );
    }
    assert_eq!(message.read_field("numbers", 0, 3), None);
    assert_eq!(
        message.field("numbers", 0).and_then(|f| f.representation.as_deref()),
        Some("count")
    );

    assert_eq!(message.read_field("bool", 0, 0), Some(TypedValue::Bool(true)));
    assert_eq!(message.read_field("bools", 0, 2), Some(TypedValue::Bool(false)));
}

#[test]
fn test_frame_header_sizes() {
    for i in 0..7 {
        assert_eq!(write_frame_header(1usize << (i * 8)).len(), 5 + i, "shift {}", i * 8);
    }
    assert_eq!(write_frame_header(1usize << 56).len(), 13);
    assert_eq!(write_frame_header(1usize << 63).len(), 14);
}

#[test]
fn test_reencode_fixture() {
    let original = common::fixture();
    let mut encoder = Encoder::new();
    let bytes = encoder.encode_message(&original).unwrap().to_vec();
    assert_eq!(decode(&bytes).unwrap(), original);
}

#[test]
fn test_dynamic_encode_matches_matcher_view() {
    let mut encoder = Encoder::new().with_uuid_generator(|| [0xab; 16]);
    let bytes = encoder
        .encode(&json!({
            "Timestamp": 5,
            "Type": "TEST",
            "Pid": 10,
            "Fields": [
                {"name": "list", "value": ["a", "b"]},
                {"name": "raw", "value": "cmF3", "value_type": 1},
                {"name": "ratio", "value": 0.5, "representation": "%"},
                {"name": "list", "value": [1, 2, 3]}
            ]
        }))
        .unwrap()
        .to_vec();

    let message = decode(&bytes).unwrap();
    assert_eq!(message.timestamp, 5);
    assert_eq!(message.uuid[6] & 0xf0, 0x40);
    assert_eq!(message.uuid[8] & 0xc0, 0x80);
    assert_eq!(message.read_field("list", 0, 1), Some(TypedValue::String(b"b")));
    assert_eq!(message.read_field("list", 1, 2), Some(TypedValue::Numeric(3.0)));
    assert!(matches!(message.fields[1].values, FieldValues::Bytes(_)));
    assert_eq!(message.read_field("ratio", 0, 0), Some(TypedValue::Numeric(0.5)));
}

#[test]
fn test_fixture_json_rendering() {
    let rendered = common::fixture().to_json();
    assert_eq!(rendered["Uuid"], "230081dc-326f-4e3f-9a5a-9386a37e246f");
    assert_eq!(rendered["Type"], "TEST");
    assert_eq!(rendered["Pid"], 32157);
    assert_eq!(rendered["Fields"][2]["name"], "bytes");
    assert_eq!(rendered["Fields"][2]["value"], "ZGF0YQ==");
    assert_eq!(rendered["Fields"][3]["value"], json!([999, 1024]));
    assert_eq!(rendered["Fields"][8]["representation"], "date-time");
}
