// Configuration error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 4001-4003
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Config file could not be read
    pub const IO: i32 = 4001;

    /// Config file is not valid JSON for the schema
    pub const PARSE: i32 = 4002;

    /// A field holds a value the pipeline cannot run with
    pub const INVALID: i32 = 4003;
}

/// Errors raised while loading or validating a `PipelineConfig`
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { reason: String },
    Parse { reason: String },
    Invalid { field: &'static str, reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
            ConfigError::Invalid { .. } => ConfigErrorCodes::INVALID,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Io { reason } => format!("Failed to read config: {}", reason),
            ConfigError::Parse { reason } => format!("Failed to parse config: {}", reason),
            ConfigError::Invalid { field, reason } => {
                format!("Invalid config field {}: {}", field, reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse {
            reason: err.to_string(),
        }
    }
}
