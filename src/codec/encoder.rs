//! Single-pass message encoder.
//!
//! Input comes either as a typed [`Message`] or as a dynamic
//! [`serde_json::Value`] shaped like the message headers:
//!
//! ```json
//! {
//!   "Uuid": "c1a9a4c0-6e7d-4d3a-8b5e-2f8e0a2b9c11",
//!   "Timestamp": 1428773426113040228,
//!   "Type": "TEST", "Logger": "GoSpec", "Severity": 6,
//!   "Payload": "...", "EnvVersion": "0.8", "Pid": 32157, "Hostname": "host",
//!   "Fields": {
//!     "count": 3,
//!     "latency": {"value": [1.5, 2.5], "representation": "ms"},
//!     "tags": ["a", "b"]
//!   }
//! }
//! ```
//!
//! `Fields` may also be an array of `{"name", "value", "representation",
//! "value_type"}` objects, which keeps field order and allows repeated names.
//!
//! Field entries are written with a one byte length placeholder that is
//! back-patched once the entry is complete, widening it in place when the
//! entry turns out to be 128 bytes or longer.

use super::buffer::OutputBuffer;
use super::decoder::{
    TAG_ENV_VERSION, TAG_FIELDS, TAG_HOSTNAME, TAG_LOGGER, TAG_NAME, TAG_PAYLOAD, TAG_PID,
    TAG_REPRESENTATION, TAG_SEVERITY, TAG_TIMESTAMP, TAG_TYPE, TAG_UUID, TAG_VALUE_BOOL,
    TAG_VALUE_BYTES, TAG_VALUE_DOUBLE, TAG_VALUE_INTEGER, TAG_VALUE_STRING, TAG_VALUE_TYPE,
};
use super::framing::write_frame_header;
use super::message::{FieldValues, Message, ValueType, UUID_SIZE};
use super::wire::{WIRETYPE_FIXED64, WIRETYPE_LENGTH_DELIMITED, WIRETYPE_VARINT};
use crate::config::CodecConfig;
use crate::error::{HekaError, Result};
use crate::matcher::timestamp::now_nanos;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

/// Source of raw uuid bytes for messages that do not carry a usable one.
pub type UuidGenerator = Box<dyn FnMut() -> [u8; UUID_SIZE] + Send>;

/// Reusable encoder. The output buffer is kept between calls.
pub struct Encoder {
    buffer: OutputBuffer,
    uuid_source: UuidGenerator,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::from_buffer(OutputBuffer::with_config(&CodecConfig::default()))
    }

    /// Build an encoder with validated limits.
    pub fn with_config(config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_buffer(OutputBuffer::with_config(config)))
    }

    fn from_buffer(buffer: OutputBuffer) -> Self {
        Self {
            buffer,
            uuid_source: Box::new(|| *Uuid::new_v4().as_bytes()),
        }
    }

    /// Replace the random uuid source, e.g. to make output deterministic.
    ///
    /// Generated values always get the version 4 and RFC 4122 variant bits
    /// forced, whatever the generator returns.
    pub fn with_uuid_generator(
        mut self,
        generator: impl FnMut() -> [u8; UUID_SIZE] + Send + 'static,
    ) -> Self {
        self.uuid_source = Box::new(generator);
        self
    }

    /// Encode a dynamic message description.
    pub fn encode(&mut self, value: &Value) -> Result<&[u8]> {
        self.buffer.clear();
        let result = self.write_dynamic(value);
        self.finish(result)
    }

    /// Encode a dynamic message description given as JSON text.
    pub fn encode_json(&mut self, text: &str) -> Result<&[u8]> {
        self.buffer.clear();
        let value: Value = serde_json::from_str(text)?;
        self.encode(&value)
    }

    /// Encode a typed message, keeping its uuid and timestamp.
    pub fn encode_message(&mut self, msg: &Message) -> Result<&[u8]> {
        self.buffer.clear();
        let result = self.write_message(msg);
        self.finish(result)
    }

    /// Encode a dynamic message description and prefix it with a frame header.
    pub fn encode_framed(&mut self, value: &Value) -> Result<Vec<u8>> {
        let message = self.encode(value)?;
        let mut framed = write_frame_header(message.len());
        framed.extend_from_slice(message);
        Ok(framed)
    }

    fn finish(&mut self, result: Result<()>) -> Result<&[u8]> {
        match result {
            Ok(()) => Ok(self.buffer.as_slice()),
            Err(e) => {
                debug!(error = %e, "message encode failed");
                self.buffer.clear();
                Err(e)
            }
        }
    }

    fn generate_uuid(&mut self) -> [u8; UUID_SIZE] {
        let mut uuid = (self.uuid_source)();
        uuid[6] = (uuid[6] & 0x0f) | 0x40;
        uuid[8] = (uuid[8] & 0x3f) | 0x80;
        uuid
    }

    fn write_message(&mut self, msg: &Message) -> Result<()> {
        let ob = &mut self.buffer;
        ob.write_string(TAG_UUID, &msg.uuid)?;
        write_varint_field(ob, TAG_TIMESTAMP, msg.timestamp as u64)?;
        write_optional_bytes(ob, TAG_TYPE, msg.msg_type.as_deref())?;
        write_optional_bytes(ob, TAG_LOGGER, msg.logger.as_deref())?;
        if let Some(severity) = msg.severity {
            write_varint_field(ob, TAG_SEVERITY, severity as i64 as u64)?;
        }
        write_optional_bytes(ob, TAG_PAYLOAD, msg.payload.as_deref())?;
        write_optional_bytes(ob, TAG_ENV_VERSION, msg.env_version.as_deref())?;
        if let Some(pid) = msg.pid {
            write_varint_field(ob, TAG_PID, pid as i64 as u64)?;
        }
        write_optional_bytes(ob, TAG_HOSTNAME, msg.hostname.as_deref())?;
        for field in &msg.fields {
            write_field(
                ob,
                &field.name,
                field.representation.as_deref(),
                &field.values,
            )?;
        }
        Ok(())
    }

    fn write_dynamic(&mut self, value: &Value) -> Result<()> {
        let object = value
            .as_object()
            .ok_or_else(|| unsupported(value, "message must be an object"))?;

        let uuid = match object.get("Uuid").and_then(parse_uuid) {
            Some(uuid) => uuid,
            None => self.generate_uuid(),
        };
        let timestamp = match object.get("Timestamp") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            _ => now_nanos(),
        };

        let ob = &mut self.buffer;
        ob.write_string(TAG_UUID, &uuid)?;
        write_varint_field(ob, TAG_TIMESTAMP, timestamp as u64)?;
        write_header_string(ob, object, TAG_TYPE, "Type")?;
        write_header_string(ob, object, TAG_LOGGER, "Logger")?;
        write_header_int(ob, object, TAG_SEVERITY, "Severity")?;
        write_header_string(ob, object, TAG_PAYLOAD, "Payload")?;
        write_header_string(ob, object, TAG_ENV_VERSION, "EnvVersion")?;
        write_header_int(ob, object, TAG_PID, "Pid")?;
        write_header_string(ob, object, TAG_HOSTNAME, "Hostname")?;

        match object.get("Fields") {
            None | Some(Value::Null) => {}
            Some(Value::Object(fields)) => {
                for (name, value) in fields {
                    let (representation, values) = field_from_json(name, value)?;
                    write_field(ob, name, representation.as_deref(), &values)?;
                }
            }
            Some(Value::Array(entries)) => {
                for entry in entries {
                    let name = entry
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| unsupported(entry, "field name must be a string"))?;
                    let (representation, values) = field_from_json(name, entry)?;
                    write_field(ob, name, representation.as_deref(), &values)?;
                }
            }
            Some(other) => return Err(unsupported(other, "Fields must be an object or array")),
        }
        Ok(())
    }
}

/// Encode a dynamic message description with a default encoder.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    Ok(encoder.encode(value)?.to_vec())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn unsupported(value: &Value, context: impl Into<String>) -> HekaError {
    HekaError::UnsupportedValueType {
        value_type: json_type(value).to_string(),
        context: context.into(),
    }
}

/// A 16 byte string is taken as raw bytes, a 36 character string as the
/// hyphenated text form, and an array of 16 byte values verbatim. Anything
/// else yields `None` and a fresh uuid is minted.
fn parse_uuid(value: &Value) -> Option<[u8; UUID_SIZE]> {
    match value {
        Value::String(s) if s.len() == UUID_SIZE => s.as_bytes().try_into().ok(),
        Value::String(s) if s.len() == 36 => Uuid::parse_str(s).ok().map(|u| *u.as_bytes()),
        Value::Array(items) if items.len() == UUID_SIZE => {
            let mut uuid = [0u8; UUID_SIZE];
            for (slot, item) in uuid.iter_mut().zip(items) {
                *slot = u8::try_from(item.as_u64()?).ok()?;
            }
            Some(uuid)
        }
        _ => None,
    }
}

fn write_varint_field(ob: &mut OutputBuffer, tag: u32, value: u64) -> Result<()> {
    ob.write_key(tag, WIRETYPE_VARINT)?;
    ob.write_varint(value)
}

fn write_optional_bytes(ob: &mut OutputBuffer, tag: u32, value: Option<&[u8]>) -> Result<()> {
    match value {
        Some(bytes) => ob.write_string(tag, bytes),
        None => Ok(()),
    }
}

fn write_header_string(
    ob: &mut OutputBuffer,
    object: &Map<String, Value>,
    tag: u32,
    key: &str,
) -> Result<()> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) => ob.write_string(tag, s.as_bytes()),
        Some(other) => Err(unsupported(other, format!("{key} must be a string"))),
    }
}

fn write_header_int(
    ob: &mut OutputBuffer,
    object: &Map<String, Value>,
    tag: u32,
    key: &str,
) -> Result<()> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Number(n)) => {
            let value = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default();
            write_varint_field(ob, tag, value as u64)
        }
        Some(other) => Err(unsupported(other, format!("{key} must be a number"))),
    }
}

/// Convert one dynamic field value into its representation and typed values.
///
/// Scalars become single-value fields, arrays multi-value fields, and an
/// object supplies `value` plus optional `representation` and `value_type`.
fn field_from_json(name: &str, value: &Value) -> Result<(Option<String>, FieldValues)> {
    match value {
        Value::Object(object) => {
            let representation = match object.get("representation") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    return Err(unsupported(other, format!("representation of '{name}'")))
                }
            };
            let value_type = match object.get("value_type") {
                None | Some(Value::Null) => None,
                Some(vt) => Some(
                    vt.as_u64()
                        .and_then(ValueType::from_wire)
                        .ok_or_else(|| HekaError::UnsupportedValueType {
                            value_type: vt.to_string(),
                            context: format!("value_type of '{name}'"),
                        })?,
                ),
            };
            let value = object
                .get("value")
                .ok_or(HekaError::MissingRequiredField { name: "value" })?;
            let values = match value {
                Value::Array(items) => values_from_json(name, items, value_type)?,
                Value::Object(_) => {
                    return Err(unsupported(value, format!("nested object in '{name}'")))
                }
                scalar => values_from_json(name, std::slice::from_ref(scalar), value_type)?,
            };
            Ok((representation, values))
        }
        Value::Array(items) => Ok((None, values_from_json(name, items, None)?)),
        scalar => Ok((None, values_from_json(name, std::slice::from_ref(scalar), None)?)),
    }
}

fn values_from_json(
    name: &str,
    items: &[Value],
    value_type: Option<ValueType>,
) -> Result<FieldValues> {
    let first = items
        .first()
        .ok_or(HekaError::MissingRequiredField { name: "value" })?;
    if items
        .iter()
        .any(|item| std::mem::discriminant(item) != std::mem::discriminant(first))
    {
        return Err(HekaError::MixedArrayType {
            field: name.to_string(),
        });
    }

    let invalid = |vt: ValueType, kind: &str| HekaError::UnsupportedValueType {
        value_type: vt.name().to_string(),
        context: format!("{kind} value of '{name}'"),
    };

    match first {
        Value::String(_) => {
            let bytes: Vec<Vec<u8>> = items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.as_bytes().to_vec())
                .collect();
            match value_type.unwrap_or(ValueType::String) {
                ValueType::String => Ok(FieldValues::String(bytes)),
                ValueType::Bytes => Ok(FieldValues::Bytes(bytes)),
                vt => Err(invalid(vt, "string")),
            }
        }
        Value::Number(_) => {
            let all_integers = items.iter().all(|item| item.is_i64() || item.is_u64());
            let default = if all_integers {
                ValueType::Integer
            } else {
                ValueType::Double
            };
            match value_type.unwrap_or(default) {
                ValueType::Integer => Ok(FieldValues::Integer(
                    items
                        .iter()
                        .map(|item| {
                            item.as_i64()
                                .or_else(|| item.as_u64().map(|n| n as i64))
                                .or_else(|| item.as_f64().map(|f| f as i64))
                                .unwrap_or_default()
                        })
                        .collect(),
                )),
                ValueType::Double => Ok(FieldValues::Double(
                    items.iter().filter_map(Value::as_f64).collect(),
                )),
                vt => Err(invalid(vt, "numeric")),
            }
        }
        Value::Bool(_) => match value_type.unwrap_or(ValueType::Bool) {
            ValueType::Bool => Ok(FieldValues::Bool(
                items.iter().filter_map(Value::as_bool).collect(),
            )),
            vt => Err(invalid(vt, "boolean")),
        },
        other => Err(unsupported(other, format!("value of '{name}'"))),
    }
}

/// Write one field entry.
///
/// The value type is only written when it differs from the STRING default.
/// Numeric and boolean arrays are packed; string and bytes arrays repeat
/// their tag per value.
fn write_field(
    ob: &mut OutputBuffer,
    name: &str,
    representation: Option<&str>,
    values: &FieldValues,
) -> Result<()> {
    if name.is_empty() {
        return Err(HekaError::MissingRequiredField { name: "name" });
    }
    if values.is_empty() {
        return Err(HekaError::MissingRequiredField { name: "value" });
    }

    ob.write_key(TAG_FIELDS, WIRETYPE_LENGTH_DELIMITED)?;
    let entry = ob.write_length_placeholder()?;
    ob.write_string(TAG_NAME, name.as_bytes())?;
    if values.value_type() != ValueType::String {
        write_varint_field(ob, TAG_VALUE_TYPE, values.value_type().as_wire() as u64)?;
    }
    if let Some(representation) = representation {
        ob.write_string(TAG_REPRESENTATION, representation.as_bytes())?;
    }

    match values {
        FieldValues::String(items) => {
            for item in items {
                ob.write_string(TAG_VALUE_STRING, item)?;
            }
        }
        FieldValues::Bytes(items) => {
            for item in items {
                ob.write_string(TAG_VALUE_BYTES, item)?;
            }
        }
        FieldValues::Integer(items) => {
            if let [single] = items.as_slice() {
                write_varint_field(ob, TAG_VALUE_INTEGER, *single as u64)?;
            } else {
                ob.write_key(TAG_VALUE_INTEGER, WIRETYPE_LENGTH_DELIMITED)?;
                let run = ob.write_length_placeholder()?;
                for item in items {
                    ob.write_varint(*item as u64)?;
                }
                ob.backpatch_length(run)?;
            }
        }
        FieldValues::Double(items) => {
            if let [single] = items.as_slice() {
                ob.write_key(TAG_VALUE_DOUBLE, WIRETYPE_FIXED64)?;
                ob.write_double(*single)?;
            } else {
                ob.write_key(TAG_VALUE_DOUBLE, WIRETYPE_LENGTH_DELIMITED)?;
                ob.write_varint((items.len() * 8) as u64)?;
                for item in items {
                    ob.write_double(*item)?;
                }
            }
        }
        FieldValues::Bool(items) => {
            if let [single] = items.as_slice() {
                write_varint_field(ob, TAG_VALUE_BOOL, u64::from(*single))?;
            } else {
                ob.write_key(TAG_VALUE_BOOL, WIRETYPE_LENGTH_DELIMITED)?;
                ob.write_varint(items.len() as u64)?;
                for item in items {
                    ob.write_byte(u8::from(*item))?;
                }
            }
        }
    }

    ob.backpatch_length(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decoder::decode;
    use crate::codec::message::{Field, TypedValue};
    use serde_json::json;

    fn pinned() -> Encoder {
        Encoder::new().with_uuid_generator(|| [0u8; 16])
    }

    #[test]
    fn test_minimal_dynamic_message() {
        let mut encoder = pinned();
        let bytes = encoder.encode(&json!({"Timestamp": 1})).unwrap();

        let mut expected = vec![0x0a, 0x10];
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0x40, 0, 0x80, 0, 0, 0, 0, 0, 0, 0]);
        expected.extend_from_slice(&[0x10, 0x01]);
        assert_eq!(bytes, &expected[..]);
    }

    #[test]
    fn test_uuid_forms() {
        let mut encoder = Encoder::new();

        let raw = "0123456789abcdef";
        let bytes = encoder.encode(&json!({"Uuid": raw, "Timestamp": 0})).unwrap();
        assert_eq!(&bytes[2..18], raw.as_bytes());

        let text = "23008ddc-a87c-4cbf-8e1f-4e8b4e56f9fc";
        let bytes = encoder.encode(&json!({"Uuid": text, "Timestamp": 0})).unwrap();
        assert_eq!(&bytes[2..4], &[0x23, 0x00]);
        assert_eq!(bytes[17], 0xfc);

        // anything else is replaced by a v4 uuid
        let bytes = encoder.encode(&json!({"Uuid": "short", "Timestamp": 0})).unwrap();
        assert_eq!(bytes[8] & 0xf0, 0x40);
        assert_eq!(bytes[10] & 0xc0, 0x80);
    }

    #[test]
    fn test_timestamp_defaults_to_now() {
        let before = now_nanos();
        let msg = decode(&encode(&json!({})).unwrap()).unwrap();
        assert!(msg.timestamp >= before);
    }

    #[test]
    fn test_sparse_headers() {
        let mut encoder = pinned();
        let bytes = encoder
            .encode(&json!({"Timestamp": 1, "Logger": "GoSpec", "Pid": 1}))
            .unwrap()
            .to_vec();
        assert_eq!(&bytes[20..], b"\x22\x06GoSpec\x40\x01");
    }

    #[test]
    fn test_header_type_errors() {
        let mut encoder = pinned();
        assert!(matches!(
            encoder.encode(&json!({"Type": 5})),
            Err(HekaError::UnsupportedValueType { .. })
        ));
        assert!(matches!(
            encoder.encode(&json!({"Severity": "high"})),
            Err(HekaError::UnsupportedValueType { .. })
        ));
        assert!(encoder.encode(&json!("not a message")).is_err());
    }

    #[test]
    fn test_scalar_field_bytes() {
        let mut encoder = pinned();
        let bytes = encoder
            .encode(&json!({"Timestamp": 1, "Fields": {"foo": "bar", "n": 64, "b": true}}))
            .unwrap()
            .to_vec();
        assert_eq!(
            &bytes[20..],
            b"\x52\x0a\x0a\x03foo\x22\x03bar\
              \x52\x07\x0a\x01n\x10\x02\x30\x40\
              \x52\x07\x0a\x01b\x10\x04\x40\x01"
        );
    }

    #[test]
    fn test_packed_integer_array() {
        let mut encoder = pinned();
        let bytes = encoder
            .encode(&json!({"Timestamp": 1, "Fields": {"int": [999, 1024]}}))
            .unwrap()
            .to_vec();
        assert_eq!(
            &bytes[20..],
            b"\x52\x0d\x0a\x03int\x10\x02\x32\x04\xe7\x07\x80\x08"
        );
    }

    #[test]
    fn test_mixed_array_rejected() {
        let mut encoder = pinned();
        assert_eq!(
            encoder.encode(&json!({"Fields": {"x": [1, "two"]}})),
            Err(HekaError::MixedArrayType {
                field: "x".to_string()
            })
        );
    }

    #[test]
    fn test_value_type_conflicts() {
        let mut encoder = pinned();
        let fields = json!([{"name": "x", "value": "abc", "value_type": 2}]);
        assert!(matches!(
            encoder.encode(&json!({"Fields": fields})),
            Err(HekaError::UnsupportedValueType { .. })
        ));

        let fields = json!([{"name": "x", "value": 1, "value_type": 9}]);
        assert!(matches!(
            encoder.encode(&json!({"Fields": fields})),
            Err(HekaError::UnsupportedValueType { .. })
        ));

        let fields = json!([{"value": 1}]);
        assert!(matches!(
            encoder.encode(&json!({"Fields": fields})),
            Err(HekaError::UnsupportedValueType { .. })
        ));

        assert_eq!(
            encoder.encode(&json!({"Fields": {"empty": []}})),
            Err(HekaError::MissingRequiredField { name: "value" })
        );
    }

    #[test]
    fn test_field_object_forms() {
        let mut encoder = pinned();
        let value = json!({
            "Timestamp": 1,
            "Fields": [
                {"name": "latency", "value": [1.5, 2], "representation": "ms"},
                {"name": "blob", "value": "abc", "value_type": 1},
                {"name": "count", "value": 3, "value_type": 3},
                {"name": "latency", "value": 7}
            ]
        });
        let msg = decode(encoder.encode(&value).unwrap()).unwrap();

        assert_eq!(msg.fields.len(), 4);
        assert_eq!(msg.fields[0].values, FieldValues::Double(vec![1.5, 2.0]));
        assert_eq!(msg.fields[0].representation.as_deref(), Some("ms"));
        assert_eq!(msg.fields[1].values, FieldValues::Bytes(vec![b"abc".to_vec()]));
        assert_eq!(msg.fields[2].values, FieldValues::Double(vec![3.0]));
        assert_eq!(msg.fields[3].values, FieldValues::Integer(vec![7]));
    }

    #[test]
    fn test_long_field_is_widened() {
        let mut encoder = pinned();
        let text = "x".repeat(300);
        let msg = decode(
            encoder
                .encode(&json!({"Timestamp": 1, "Fields": {"long": text, "after": 1}}))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            msg.fields[0].values,
            FieldValues::String(vec![text.into_bytes()])
        );
        assert_eq!(msg.fields[1].values, FieldValues::Integer(vec![1]));
    }

    #[test]
    fn test_size_limit_discards_output() {
        let config = CodecConfig {
            max_message_size: 64,
            initial_buffer_capacity: 16,
        };
        let mut encoder = Encoder::with_config(&config).unwrap();
        let result = encoder.encode(&json!({"Payload": "p".repeat(100)}));
        assert!(matches!(result, Err(HekaError::SizeLimitExceeded { .. })));

        assert!(encoder.encode(&json!({"Payload": "short"})).is_ok());
    }

    #[test]
    fn test_config_is_validated() {
        let config = CodecConfig {
            max_message_size: 0,
            initial_buffer_capacity: 0,
        };
        assert!(matches!(
            Encoder::with_config(&config),
            Err(HekaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_encode_message_roundtrip() {
        let msg = Message::new([9; 16], -5)
            .with_type("TEST")
            .with_severity(-1)
            .with_pid(42)
            .with_field(Field::new("flags", vec![true, false, true]))
            .with_field(Field::bytes("raw", vec![vec![0xff, 0x00], vec![]]))
            .with_field(Field::new("neg", vec![-1i64, i64::MAX]));

        let mut encoder = Encoder::new();
        let decoded = decode(encoder.encode_message(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_encode_json_text() {
        let mut encoder = Encoder::new();
        let msg = decode(
            encoder
                .encode_json(r#"{"Timestamp": 3, "Logger": "text", "Fields": {"n": 2}}"#)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(msg.timestamp, 3);
        assert_eq!(msg.logger.as_deref(), Some(&b"text"[..]));
        assert_eq!(msg.read_field("n", 0, 0), Some(TypedValue::Numeric(2.0)));

        assert!(matches!(
            encoder.encode_json(r#"{"Logger": "#),
            Err(HekaError::Json(_))
        ));
        assert!(matches!(
            encoder.encode_json("[1, 2]"),
            Err(HekaError::UnsupportedValueType { .. })
        ));
    }

    #[test]
    fn test_encode_framed() {
        let mut encoder = pinned();
        let framed = encoder.encode_framed(&json!({"Timestamp": 1})).unwrap();
        assert_eq!(&framed[..5], &[0x1e, 0x02, 0x08, 0x14, 0x1f]);
        assert_eq!(framed.len(), 25);
    }
}
