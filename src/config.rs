//! Configuration for the codec and the matcher compiler.
//!
//! All limits default to the values the Heka wire format and the matcher
//! grammar were designed around. Configurations can be built in code with the
//! fluent `with_*` methods or loaded from YAML.
//!
//! # Examples
//!
//! ```rust
//! use heka_matcher::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_max_message_size(1024 * 1024)
//!     .with_max_tests(64);
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ```rust
//! use heka_matcher::EngineConfig;
//!
//! let yaml = r#"
//! codec:
//!   max_message_size: 131072
//! matcher:
//!   max_tests: 32
//! "#;
//! let config = EngineConfig::from_yaml_str(yaml)?;
//! assert_eq!(config.codec.max_message_size, 131072);
//! assert_eq!(config.matcher.max_string_length, 255);
//! # Ok::<(), heka_matcher::HekaError>(())
//! ```

use crate::error::{HekaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default ceiling for a single encoded or framed message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Largest header a frame can carry (the header length is a single byte).
pub const MAX_FRAME_HEADER_SIZE: usize = 255;

/// Largest accepted `max_tests`. Compiled `&&`/`||` chains nest one level per
/// test and are evaluated recursively, so this bounds stack use.
pub const MAX_TESTS_LIMIT: usize = 1024;

/// Deepest parenthesis nesting a matcher expression may use.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Limits applied while decoding, encoding and buffering wire data.
///
/// | Setting | Default | Effect |
/// |---------|---------|--------|
/// | `max_message_size` | 64 KiB | Largest message the encoder will produce or the stream reader accept |
/// | `initial_buffer_capacity` | 1 KiB | Starting capacity of encoder and reader buffers |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum size of one message in bytes.
    pub max_message_size: usize,
    /// Initial capacity for output and input buffers; they grow geometrically.
    pub initial_buffer_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            initial_buffer_capacity: 1024,
        }
    }
}

impl CodecConfig {
    /// Largest framed record: the message plus header and separators.
    pub fn max_buffer_size(&self) -> usize {
        self.max_message_size.saturating_add(MAX_FRAME_HEADER_SIZE + 3)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_message_size == 0 {
            return Err(HekaError::InvalidConfig(
                "max_message_size must be greater than zero".to_string(),
            ));
        }
        if self.initial_buffer_capacity > self.max_buffer_size() {
            return Err(HekaError::InvalidConfig(format!(
                "initial_buffer_capacity ({}) exceeds the largest framed message",
                self.initial_buffer_capacity
            )));
        }
        Ok(())
    }
}

/// Limits applied while compiling matcher expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Maximum number of comparison tests in one expression.
    pub max_tests: usize,
    /// Maximum length of a string literal in bytes.
    pub max_string_length: usize,
    /// Largest accepted field or array index in `Fields[name][i][j]`.
    pub max_index: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_tests: 128,
            max_string_length: 255,
            max_index: 255,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tests == 0 {
            return Err(HekaError::InvalidConfig(
                "max_tests must be greater than zero".to_string(),
            ));
        }
        if self.max_tests > MAX_TESTS_LIMIT {
            return Err(HekaError::InvalidConfig(format!(
                "max_tests ({}) exceeds {}",
                self.max_tests, MAX_TESTS_LIMIT
            )));
        }
        if self.max_index > u16::MAX as usize {
            return Err(HekaError::InvalidConfig(format!(
                "max_index ({}) exceeds {}",
                self.max_index,
                u16::MAX
            )));
        }
        Ok(())
    }
}

/// Top-level configuration combining codec and matcher settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub codec: CodecConfig,
    pub matcher: MatcherConfig,
}

impl EngineConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with relaxed limits for bulk or replay workloads.
    pub fn high_volume() -> Self {
        Self {
            codec: CodecConfig {
                max_message_size: 8 * 1024 * 1024,
                initial_buffer_capacity: 64 * 1024,
            },
            matcher: MatcherConfig {
                max_tests: 1024,
                ..Default::default()
            },
        }
    }

    /// Load and validate a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.codec.validate()?;
        self.matcher.validate()
    }

    // Builder methods for codec configuration

    /// Set the maximum message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.codec.max_message_size = size;
        self
    }

    /// Set the initial buffer capacity.
    pub fn with_initial_buffer_capacity(mut self, capacity: usize) -> Self {
        self.codec.initial_buffer_capacity = capacity;
        self
    }

    // Builder methods for matcher configuration

    /// Set the maximum number of tests per expression.
    pub fn with_max_tests(mut self, max_tests: usize) -> Self {
        self.matcher.max_tests = max_tests;
        self
    }

    /// Set the maximum string literal length.
    pub fn with_max_string_length(mut self, length: usize) -> Self {
        self.matcher.max_string_length = length;
        self
    }

    /// Set the maximum field/array index.
    pub fn with_max_index(mut self, index: usize) -> Self {
        self.matcher.max_index = index;
        self
    }
}
