//! # Heka Matcher
//!
//! Decode, encode and route [Heka](https://github.com/mozilla-services/heka)
//! messages.
//!
//! The crate has two halves that share one field model:
//!
//! - [`codec`]: strict single-pass decoding and encoding of the Heka
//!   protobuf message layout, plus stream framing.
//! - [`matcher`]: compiles boolean expressions such as
//!   `Type == 'TEST' && Fields[status] >= 500` and evaluates them against
//!   decoded messages.
//!
//! [`Router`] ties them together for configuration-driven dispatch.
//!
//! ## Quick Start
//!
//! ```rust
//! use heka_matcher::{decode, Encoder, MessageMatcher};
//! use serde_json::json;
//!
//! let mut encoder = Encoder::new();
//! let bytes = encoder
//!     .encode(&json!({
//!         "Type": "TEST",
//!         "Severity": 3,
//!         "Fields": {"status": 503, "path": "/index.html"}
//!     }))?
//!     .to_vec();
//!
//! let message = decode(&bytes)?;
//! let matcher = MessageMatcher::compile("Type == 'TEST' && Fields[status] >= 500")?;
//! assert!(matcher.evaluate(&message));
//! # Ok::<(), heka_matcher::HekaError>(())
//! ```
//!
//! ## Streams
//!
//! ```rust
//! use heka_matcher::{Encoder, StreamReader};
//! use serde_json::json;
//!
//! let mut encoder = Encoder::new();
//! let mut stream = Vec::new();
//! for logger in ["a", "b"] {
//!     stream.extend(encoder.encode_framed(&json!({"Logger": logger}))?);
//! }
//!
//! let mut reader = StreamReader::new(64 * 1024);
//! reader.append(&stream)?;
//! let mut loggers = Vec::new();
//! while let Some(message) = reader.next_message() {
//!     loggers.push(message.logger.clone());
//! }
//! assert_eq!(loggers, vec![Some(b"a".to_vec()), Some(b"b".to_vec())]);
//! # Ok::<(), heka_matcher::HekaError>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod matcher;
pub mod router;

// Codec
pub use codec::{
    decode, decode_into, encode, write_frame_header, Encoder, Field, FieldValues, Message,
    OutputBuffer, StreamReader, TypedValue, ValueType,
};

// Configuration and errors
pub use config::{CodecConfig, EngineConfig, MatcherConfig};
pub use error::{HekaError, Result};

// Matcher
pub use matcher::{MatchSource, MessageMatcher};

pub use router::{RouteSpec, Router};
