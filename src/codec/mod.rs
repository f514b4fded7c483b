//! Heka message wire codec.
//!
//! Messages are protobuf-style records: a tag key per field followed by a
//! varint, a fixed 64-bit value or a length-delimited run. The decoder builds a
//! [`Message`]; the encoder produces the same layout from a [`Message`] or a
//! dynamic JSON description. [`StreamReader`] splits a byte stream into framed
//! records.

pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod framing;
pub mod message;
pub mod wire;

pub use buffer::OutputBuffer;
pub use decoder::{decode, decode_into};
pub use encoder::{encode, Encoder, UuidGenerator};
pub use framing::{write_frame_header, StreamReader};
pub use message::{Field, FieldValues, Message, TypedValue, ValueType, DEFAULT_SEVERITY};
