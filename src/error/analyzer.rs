// Analyzer error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analyzer error code constants
///
/// Error code range: 1001-1003
pub struct AnalyzerErrorCodes {}

impl AnalyzerErrorCodes {
    /// Raw PCM buffer contained no bytes
    pub const EMPTY_BUFFER: i32 = 1001;

    /// Raw PCM buffer length is not a whole number of 16-bit samples
    pub const ODD_LENGTH: i32 = 1002;

    /// Analyzer mutex was poisoned by a panicking caller
    pub const LOCK_POISONED: i32 = 1003;
}

/// Log an analyzer error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_analyzer_error(err: &AnalyzerError, context: &str) {
    error!(
        "Analyzer error in {}: code={}, component=SpectralAnalyzer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while turning a raw PCM buffer into a feature vector
///
/// Silence is never an error; only malformed input is.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// Raw PCM buffer contained no bytes
    EmptyBuffer,

    /// Raw PCM buffer length is not a multiple of two bytes
    OddLength { len: usize },

    /// Analyzer mutex was poisoned
    LockPoisoned,
}

impl ErrorCode for AnalyzerError {
    fn code(&self) -> i32 {
        match self {
            AnalyzerError::EmptyBuffer => AnalyzerErrorCodes::EMPTY_BUFFER,
            AnalyzerError::OddLength { .. } => AnalyzerErrorCodes::ODD_LENGTH,
            AnalyzerError::LockPoisoned => AnalyzerErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalyzerError::EmptyBuffer => "PCM buffer is empty".to_string(),
            AnalyzerError::OddLength { len } => {
                format!("PCM buffer length {} is not a multiple of 2 bytes", len)
            }
            AnalyzerError::LockPoisoned => "Analyzer lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalyzerError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalyzerError {}
