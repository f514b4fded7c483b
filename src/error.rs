//! Error types for the heka-matcher crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HekaError>;

/// Every failure the codec, the matcher compiler and the router can report.
///
/// Decode and encode errors carry the byte offset of the fault, compile errors
/// carry the position in the expression text, so a fault can be located
/// without re-running the parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HekaError {
    #[error("Malformed varint at offset {offset}")]
    MalformedVarint { offset: usize },

    #[error("Truncated buffer at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unexpected wiretype: tag:{tag} wiretype:{wiretype} position:{offset}")]
    UnexpectedWiretype { tag: u32, wiretype: u8, offset: usize },

    #[error("Unknown tag: tag:{tag} wiretype:{wiretype} position:{offset}")]
    UnknownTag { tag: u32, wiretype: u8, offset: usize },

    #[error("Invalid length {length} for tag {tag} at offset {offset}")]
    InvalidLength { tag: u32, length: usize, offset: usize },

    #[error("Missing required field: {name}")]
    MissingRequiredField { name: &'static str },

    #[error("Array has mixed types in field: {field}")]
    MixedArrayType { field: String },

    #[error("Unsupported value type {value_type}: {context}")]
    UnsupportedValueType { value_type: String, context: String },

    #[error("Invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("Size limit exceeded: {size} > {limit}")]
    SizeLimitExceeded { size: usize, limit: usize },

    #[error("Allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },

    #[error("Syntax error at position {position}: {message}")]
    CompileSyntaxError { position: usize, message: String },

    #[error("Operator '{operator}' can not be applied to {target}")]
    CompileTypeMismatch { operator: String, target: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("YAML parsing error: {0}")]
    Yaml(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl HekaError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        HekaError::CompileSyntaxError {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(operator: impl Into<String>, target: impl Into<String>) -> Self {
        HekaError::CompileTypeMismatch {
            operator: operator.into(),
            target: target.into(),
        }
    }

    /// True for errors produced while decoding or encoding wire data.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            HekaError::MalformedVarint { .. }
                | HekaError::TruncatedBuffer { .. }
                | HekaError::UnexpectedWiretype { .. }
                | HekaError::UnknownTag { .. }
                | HekaError::InvalidLength { .. }
                | HekaError::MissingRequiredField { .. }
                | HekaError::MixedArrayType { .. }
                | HekaError::UnsupportedValueType { .. }
                | HekaError::InvalidUtf8 { .. }
                | HekaError::SizeLimitExceeded { .. }
                | HekaError::AllocationFailed { .. }
        )
    }

    /// True for errors produced while compiling a matcher expression.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            HekaError::CompileSyntaxError { .. } | HekaError::CompileTypeMismatch { .. }
        )
    }
}

impl From<std::io::Error> for HekaError {
    fn from(err: std::io::Error) -> Self {
        HekaError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HekaError {
    fn from(err: serde_yaml::Error) -> Self {
        HekaError::Yaml(err.to_string())
    }
}

impl From<serde_json::Error> for HekaError {
    fn from(err: serde_json::Error) -> Self {
        HekaError::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_wiretype_error_display() {
        let error = HekaError::UnexpectedWiretype {
            tag: 1,
            wiretype: 3,
            offset: 0,
        };
        assert_eq!(
            error.to_string(),
            "Unexpected wiretype: tag:1 wiretype:3 position:0"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn test_missing_field_display() {
        let error = HekaError::MissingRequiredField { name: "Uuid" };
        assert_eq!(error.to_string(), "Missing required field: Uuid");
    }

    #[test]
    fn test_compile_errors() {
        let error = HekaError::syntax(7, "expected operator");
        assert_eq!(
            error.to_string(),
            "Syntax error at position 7: expected operator"
        );
        assert!(error.is_compile_error());
        assert!(!error.is_codec_error());

        let error = HekaError::type_mismatch("=~", "Pid");
        assert_eq!(error.to_string(), "Operator '=~' can not be applied to Pid");
    }

    #[test]
    fn test_codec_classification() {
        let errors = vec![
            HekaError::MalformedVarint { offset: 3 },
            HekaError::TruncatedBuffer {
                offset: 1,
                needed: 16,
                available: 2,
            },
            HekaError::UnknownTag {
                tag: 30,
                wiretype: 0,
                offset: 0,
            },
            HekaError::MixedArrayType {
                field: "numbers".to_string(),
            },
            HekaError::AllocationFailed { requested: 1024 },
        ];

        for error in errors {
            assert!(error.is_codec_error(), "{error:?}");
            assert!(!error.is_compile_error());
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_clone_and_equality() {
        let error = HekaError::InvalidLength {
            tag: 1,
            length: 1,
            offset: 0,
        };
        assert_eq!(error.clone(), error);
        assert_ne!(error, HekaError::MalformedVarint { offset: 0 });
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: HekaError = io_error.into();
        match error {
            HekaError::Io(msg) => assert!(msg.contains("file not found")),
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("invalid: yaml: [").unwrap_err();
        let error: HekaError = yaml_err.into();
        assert!(matches!(error, HekaError::Yaml(_)));
    }
}
