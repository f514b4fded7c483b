//! Single-pass message decoder.
//!
//! The decoder walks the buffer once, dispatching on each tag. Unknown tags,
//! wiretypes that do not belong to a tag, and trailing partial data are all
//! fatal; the error carries the tag, wiretype and byte offset of the fault.

use super::message::{Field, FieldValues, Message, ValueType, UUID_SIZE};
use super::wire::{
    read_double, read_key, read_length_delimited, read_varint, WIRETYPE_FIXED64,
    WIRETYPE_LENGTH_DELIMITED, WIRETYPE_VARINT,
};
use crate::error::{HekaError, Result};
use tracing::debug;

// Message tags
pub(crate) const TAG_UUID: u32 = 1;
pub(crate) const TAG_TIMESTAMP: u32 = 2;
pub(crate) const TAG_TYPE: u32 = 3;
pub(crate) const TAG_LOGGER: u32 = 4;
pub(crate) const TAG_SEVERITY: u32 = 5;
pub(crate) const TAG_PAYLOAD: u32 = 6;
pub(crate) const TAG_ENV_VERSION: u32 = 7;
pub(crate) const TAG_PID: u32 = 8;
pub(crate) const TAG_HOSTNAME: u32 = 9;
pub(crate) const TAG_FIELDS: u32 = 10;

// Field tags
pub(crate) const TAG_NAME: u32 = 1;
pub(crate) const TAG_VALUE_TYPE: u32 = 2;
pub(crate) const TAG_REPRESENTATION: u32 = 3;
pub(crate) const TAG_VALUE_STRING: u32 = 4;
pub(crate) const TAG_VALUE_BYTES: u32 = 5;
pub(crate) const TAG_VALUE_INTEGER: u32 = 6;
pub(crate) const TAG_VALUE_DOUBLE: u32 = 7;
pub(crate) const TAG_VALUE_BOOL: u32 = 8;

/// Decode one message.
pub fn decode(buf: &[u8]) -> Result<Message> {
    let mut msg = Message::default();
    decode_into(buf, &mut msg)?;
    Ok(msg)
}

/// Decode into an existing message, reusing its field storage.
///
/// Everything previously held in `msg` is overwritten. On error `msg` is left
/// cleared.
pub fn decode_into(buf: &[u8], msg: &mut Message) -> Result<()> {
    msg.clear();
    let result = decode_message(buf, msg);
    if let Err(e) = &result {
        debug!(error = %e, len = buf.len(), "message decode failed");
        msg.clear();
    }
    result
}

fn expect_wiretype(tag: u32, wiretype: u8, expected: u8, offset: usize) -> Result<()> {
    if wiretype != expected {
        return Err(HekaError::UnexpectedWiretype {
            tag,
            wiretype,
            offset,
        });
    }
    Ok(())
}

fn decode_message(buf: &[u8], msg: &mut Message) -> Result<()> {
    let mut seen_uuid = false;
    let mut seen_timestamp = false;
    let mut pos = 0;

    while pos < buf.len() {
        let start = pos;
        let (tag, wiretype, next) = read_key(buf, pos)?;
        pos = next;

        match tag {
            TAG_UUID => {
                expect_wiretype(tag, wiretype, WIRETYPE_LENGTH_DELIMITED, start)?;
                let (bytes, next) = read_length_delimited(buf, pos)?;
                if bytes.len() != UUID_SIZE {
                    return Err(HekaError::InvalidLength {
                        tag,
                        length: bytes.len(),
                        offset: start,
                    });
                }
                msg.uuid.copy_from_slice(bytes);
                seen_uuid = true;
                pos = next;
            }
            TAG_TIMESTAMP => {
                expect_wiretype(tag, wiretype, WIRETYPE_VARINT, start)?;
                let (value, next) = read_varint(buf, pos)?;
                msg.timestamp = value as i64;
                seen_timestamp = true;
                pos = next;
            }
            TAG_SEVERITY | TAG_PID => {
                expect_wiretype(tag, wiretype, WIRETYPE_VARINT, start)?;
                let (value, next) = read_varint(buf, pos)?;
                let slot = if tag == TAG_SEVERITY {
                    &mut msg.severity
                } else {
                    &mut msg.pid
                };
                *slot = Some(value as i32);
                pos = next;
            }
            TAG_TYPE | TAG_LOGGER | TAG_PAYLOAD | TAG_ENV_VERSION | TAG_HOSTNAME => {
                expect_wiretype(tag, wiretype, WIRETYPE_LENGTH_DELIMITED, start)?;
                let (bytes, next) = read_length_delimited(buf, pos)?;
                let slot = match tag {
                    TAG_TYPE => &mut msg.msg_type,
                    TAG_LOGGER => &mut msg.logger,
                    TAG_PAYLOAD => &mut msg.payload,
                    TAG_ENV_VERSION => &mut msg.env_version,
                    _ => &mut msg.hostname,
                };
                *slot = Some(bytes.to_vec());
                pos = next;
            }
            TAG_FIELDS => {
                expect_wiretype(tag, wiretype, WIRETYPE_LENGTH_DELIMITED, start)?;
                let (entry, end) = read_length_delimited(buf, pos)?;
                msg.fields.push(decode_field(&buf[..end], end - entry.len())?);
                pos = end;
            }
            _ => {
                return Err(HekaError::UnknownTag {
                    tag,
                    wiretype,
                    offset: start,
                })
            }
        }
    }

    if !seen_uuid {
        return Err(HekaError::MissingRequiredField { name: "Uuid" });
    }
    if !seen_timestamp {
        return Err(HekaError::MissingRequiredField { name: "Timestamp" });
    }
    Ok(())
}

/// Values collected for one field entry before its value type is known.
#[derive(Default)]
struct PendingValues {
    strings: Vec<Vec<u8>>,
    bytes: Vec<Vec<u8>>,
    integers: Vec<i64>,
    doubles: Vec<f64>,
    bools: Vec<bool>,
}

impl PendingValues {
    fn into_values(self, value_type: ValueType, name: &str) -> Result<FieldValues> {
        let PendingValues {
            strings,
            bytes,
            integers,
            doubles,
            bools,
        } = self;
        let populated = [
            (ValueType::String, !strings.is_empty()),
            (ValueType::Bytes, !bytes.is_empty()),
            (ValueType::Integer, !integers.is_empty()),
            (ValueType::Double, !doubles.is_empty()),
            (ValueType::Bool, !bools.is_empty()),
        ];
        if populated.iter().any(|&(vt, set)| set && vt != value_type) {
            return Err(HekaError::MixedArrayType {
                field: name.to_string(),
            });
        }

        let values = match value_type {
            ValueType::String => FieldValues::String(strings),
            ValueType::Bytes => FieldValues::Bytes(bytes),
            ValueType::Integer => FieldValues::Integer(integers),
            ValueType::Double => FieldValues::Double(doubles),
            ValueType::Bool => FieldValues::Bool(bools),
        };
        if values.is_empty() {
            return Err(HekaError::MissingRequiredField { name: "value" });
        }
        Ok(values)
    }
}

fn read_utf8(bytes: &[u8], offset: usize) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| HekaError::InvalidUtf8 { offset })
}

/// Decode the field entry occupying `buf[pos..]`.
///
/// `buf` is cut at the end of the entry so every read is confined to it while
/// offsets stay relative to the whole message.
fn decode_field(buf: &[u8], mut pos: usize) -> Result<Field> {
    let mut name: Option<String> = None;
    let mut value_type = ValueType::String;
    let mut representation: Option<String> = None;
    let mut pending = PendingValues::default();

    while pos < buf.len() {
        let start = pos;
        let (tag, wiretype, next) = read_key(buf, pos)?;
        pos = next;

        match (tag, wiretype) {
            (TAG_NAME, WIRETYPE_LENGTH_DELIMITED) => {
                let (bytes, next) = read_length_delimited(buf, pos)?;
                name = Some(read_utf8(bytes, pos)?);
                pos = next;
            }
            (TAG_VALUE_TYPE, WIRETYPE_VARINT) => {
                let (value, next) = read_varint(buf, pos)?;
                value_type =
                    ValueType::from_wire(value).ok_or_else(|| HekaError::UnsupportedValueType {
                        value_type: value.to_string(),
                        context: format!("field entry at offset {start}"),
                    })?;
                pos = next;
            }
            (TAG_REPRESENTATION, WIRETYPE_LENGTH_DELIMITED) => {
                let (bytes, next) = read_length_delimited(buf, pos)?;
                representation = Some(read_utf8(bytes, pos)?);
                pos = next;
            }
            (TAG_VALUE_STRING | TAG_VALUE_BYTES, WIRETYPE_LENGTH_DELIMITED) => {
                let (bytes, next) = read_length_delimited(buf, pos)?;
                if tag == TAG_VALUE_STRING {
                    pending.strings.push(bytes.to_vec());
                } else {
                    pending.bytes.push(bytes.to_vec());
                }
                pos = next;
            }
            (TAG_VALUE_INTEGER | TAG_VALUE_BOOL, WIRETYPE_VARINT) => {
                let (value, next) = read_varint(buf, pos)?;
                push_varint(&mut pending, tag, value);
                pos = next;
            }
            (TAG_VALUE_INTEGER | TAG_VALUE_BOOL, WIRETYPE_LENGTH_DELIMITED) => {
                let (run, end) = read_length_delimited(buf, pos)?;
                let packed = &buf[..end];
                let mut cursor = end - run.len();
                while cursor < end {
                    let (value, next) = read_varint(packed, cursor)?;
                    push_varint(&mut pending, tag, value);
                    cursor = next;
                }
                pos = end;
            }
            (TAG_VALUE_DOUBLE, WIRETYPE_FIXED64) => {
                let (value, next) = read_double(buf, pos)?;
                pending.doubles.push(value);
                pos = next;
            }
            (TAG_VALUE_DOUBLE, WIRETYPE_LENGTH_DELIMITED) => {
                let (bytes, next) = read_length_delimited(buf, pos)?;
                if bytes.len() % 8 != 0 {
                    return Err(HekaError::InvalidLength {
                        tag,
                        length: bytes.len(),
                        offset: start,
                    });
                }
                pending.doubles.extend(bytes.chunks_exact(8).map(|chunk| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    f64::from_le_bytes(raw)
                }));
                pos = next;
            }
            (TAG_NAME..=TAG_VALUE_BOOL, _) => {
                return Err(HekaError::UnexpectedWiretype {
                    tag,
                    wiretype,
                    offset: start,
                })
            }
            _ => {
                return Err(HekaError::UnknownTag {
                    tag,
                    wiretype,
                    offset: start,
                })
            }
        }
    }

    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(HekaError::MissingRequiredField { name: "name" }),
    };
    let values = pending.into_values(value_type, &name)?;
    Ok(Field {
        name,
        representation,
        values,
    })
}

fn push_varint(pending: &mut PendingValues, tag: u32, value: u64) {
    if tag == TAG_VALUE_INTEGER {
        pending.integers.push(value as i64);
    } else {
        pending.bools.push(value != 0);
    }
}
