//! Decoded message model.
//!
//! A [`Message`] holds the fixed header plus an ordered list of [`Field`]s.
//! Each field's values are a single [`FieldValues`] variant, so a field can
//! never hold values of mixed type.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use std::fmt;
use uuid::Uuid;

/// Severity a message is treated as having when none was encoded.
pub const DEFAULT_SEVERITY: i32 = 7;

/// Size of the raw uuid header.
pub const UUID_SIZE: usize = 16;

/// Wire value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    String = 0,
    Bytes = 1,
    Integer = 2,
    Double = 3,
    Bool = 4,
}

impl ValueType {
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            0 => Some(ValueType::String),
            1 => Some(ValueType::Bytes),
            2 => Some(ValueType::Integer),
            3 => Some(ValueType::Double),
            4 => Some(ValueType::Bool),
            _ => None,
        }
    }

    pub fn as_wire(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Bytes => "BYTES",
            ValueType::Integer => "INTEGER",
            ValueType::Double => "DOUBLE",
            ValueType::Bool => "BOOL",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The values of one field, all of one type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    String(Vec<Vec<u8>>),
    Bytes(Vec<Vec<u8>>),
    Integer(Vec<i64>),
    Double(Vec<f64>),
    Bool(Vec<bool>),
}

impl FieldValues {
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValues::String(_) => ValueType::String,
            FieldValues::Bytes(_) => ValueType::Bytes,
            FieldValues::Integer(_) => ValueType::Integer,
            FieldValues::Double(_) => ValueType::Double,
            FieldValues::Bool(_) => ValueType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::String(v) | FieldValues::Bytes(v) => v.len(),
            FieldValues::Integer(v) => v.len(),
            FieldValues::Double(v) => v.len(),
            FieldValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `index` as seen by the matcher.
    pub fn get(&self, index: usize) -> Option<TypedValue<'_>> {
        match self {
            FieldValues::String(v) | FieldValues::Bytes(v) => {
                v.get(index).map(|s| TypedValue::String(s))
            }
            FieldValues::Integer(v) => v.get(index).map(|&n| TypedValue::Numeric(n as f64)),
            FieldValues::Double(v) => v.get(index).map(|&n| TypedValue::Numeric(n)),
            FieldValues::Bool(v) => v.get(index).map(|&b| TypedValue::Bool(b)),
        }
    }

    fn to_json_values(&self) -> Vec<Value> {
        match self {
            FieldValues::String(v) => v
                .iter()
                .map(|s| Value::String(String::from_utf8_lossy(s).into_owned()))
                .collect(),
            FieldValues::Bytes(v) => v.iter().map(|b| Value::String(BASE64.encode(b))).collect(),
            FieldValues::Integer(v) => v.iter().map(|&n| json!(n)).collect(),
            FieldValues::Double(v) => v.iter().map(|&n| json!(n)).collect(),
            FieldValues::Bool(v) => v.iter().map(|&b| Value::Bool(b)).collect(),
        }
    }
}

impl From<&str> for FieldValues {
    fn from(value: &str) -> Self {
        FieldValues::String(vec![value.as_bytes().to_vec()])
    }
}

impl From<Vec<&str>> for FieldValues {
    fn from(values: Vec<&str>) -> Self {
        FieldValues::String(values.into_iter().map(|s| s.as_bytes().to_vec()).collect())
    }
}

impl From<i64> for FieldValues {
    fn from(value: i64) -> Self {
        FieldValues::Integer(vec![value])
    }
}

impl From<Vec<i64>> for FieldValues {
    fn from(values: Vec<i64>) -> Self {
        FieldValues::Integer(values)
    }
}

impl From<f64> for FieldValues {
    fn from(value: f64) -> Self {
        FieldValues::Double(vec![value])
    }
}

impl From<Vec<f64>> for FieldValues {
    fn from(values: Vec<f64>) -> Self {
        FieldValues::Double(values)
    }
}

impl From<bool> for FieldValues {
    fn from(value: bool) -> Self {
        FieldValues::Bool(vec![value])
    }
}

impl From<Vec<bool>> for FieldValues {
    fn from(values: Vec<bool>) -> Self {
        FieldValues::Bool(values)
    }
}

/// A named, optionally annotated, list of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub representation: Option<String>,
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: impl Into<FieldValues>) -> Self {
        Self {
            name: name.into(),
            representation: None,
            values: values.into(),
        }
    }

    /// A field holding raw bytes rather than text.
    pub fn bytes(name: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self::new(name, FieldValues::Bytes(values))
    }

    pub fn with_representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = Some(representation.into());
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.values.value_type()
    }

    pub fn value(&self, index: usize) -> Option<TypedValue<'_>> {
        self.values.get(index)
    }
}

/// A single field value as the matcher sees it.
///
/// Integers and doubles collapse to `Numeric`; strings and bytes to `String`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedValue<'a> {
    String(&'a [u8]),
    Numeric(f64),
    Bool(bool),
}

/// One decoded message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub uuid: [u8; UUID_SIZE],
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    pub msg_type: Option<Vec<u8>>,
    pub logger: Option<Vec<u8>>,
    pub severity: Option<i32>,
    pub payload: Option<Vec<u8>>,
    pub env_version: Option<Vec<u8>>,
    pub pid: Option<i32>,
    pub hostname: Option<Vec<u8>>,
    pub fields: Vec<Field>,
}

impl Message {
    pub fn new(uuid: [u8; UUID_SIZE], timestamp: i64) -> Self {
        Self {
            uuid,
            timestamp,
            ..Default::default()
        }
    }

    /// Reset to the empty state, keeping the field list's allocation.
    pub fn clear(&mut self) {
        self.uuid = [0; UUID_SIZE];
        self.timestamp = 0;
        self.msg_type = None;
        self.logger = None;
        self.severity = None;
        self.payload = None;
        self.env_version = None;
        self.pid = None;
        self.hostname = None;
        self.fields.clear();
    }

    pub fn with_type(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.msg_type = Some(value.into());
        self
    }

    pub fn with_logger(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.logger = Some(value.into());
        self
    }

    pub fn with_severity(mut self, value: i32) -> Self {
        self.severity = Some(value);
        self
    }

    pub fn with_payload(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(value.into());
        self
    }

    pub fn with_env_version(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.env_version = Some(value.into());
        self
    }

    pub fn with_pid(mut self, value: i32) -> Self {
        self.pid = Some(value);
        self
    }

    pub fn with_hostname(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.hostname = Some(value.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn severity_or_default(&self) -> i32 {
        self.severity.unwrap_or(DEFAULT_SEVERITY)
    }

    pub fn uuid_string(&self) -> String {
        Uuid::from_bytes(self.uuid).hyphenated().to_string()
    }

    /// The `field_index`-th field called `name`.
    pub fn field(&self, name: &str, field_index: usize) -> Option<&Field> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .nth(field_index)
    }

    /// Look up `Fields[name][field_index][array_index]`.
    ///
    /// `field_index` counts fields sharing the same name in message order;
    /// `array_index` selects a value within that field.
    pub fn read_field(
        &self,
        name: &str,
        field_index: usize,
        array_index: usize,
    ) -> Option<TypedValue<'_>> {
        self.field(name, field_index)?.value(array_index)
    }

    /// Render the message as JSON for inspection. Bytes values are base64.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("Uuid".to_string(), Value::String(self.uuid_string()));
        object.insert("Timestamp".to_string(), json!(self.timestamp));

        let text = |bytes: &Option<Vec<u8>>| {
            bytes
                .as_ref()
                .map(|b| Value::String(String::from_utf8_lossy(b).into_owned()))
        };
        let headers = [
            ("Type", text(&self.msg_type)),
            ("Logger", text(&self.logger)),
            ("Severity", self.severity.map(|n| json!(n))),
            ("Payload", text(&self.payload)),
            ("EnvVersion", text(&self.env_version)),
            ("Pid", self.pid.map(|n| json!(n))),
            ("Hostname", text(&self.hostname)),
        ];
        for (key, value) in headers {
            if let Some(value) = value {
                object.insert(key.to_string(), value);
            }
        }

        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|field| {
                    let mut entry = Map::new();
                    entry.insert("name".to_string(), Value::String(field.name.clone()));
                    entry.insert("value_type".to_string(), json!(field.value_type().as_wire()));
                    if let Some(rep) = &field.representation {
                        entry.insert("representation".to_string(), Value::String(rep.clone()));
                    }
                    let mut values = field.values.to_json_values();
                    let value = if values.len() == 1 {
                        values.remove(0)
                    } else {
                        Value::Array(values)
                    };
                    entry.insert("value".to_string(), value);
                    Value::Object(entry)
                })
                .collect();
            object.insert("Fields".to_string(), Value::Array(fields));
        }

        Value::Object(object)
    }
}
