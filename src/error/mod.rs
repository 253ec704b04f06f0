// Error types for the audio feature pipeline
//
// This module defines custom error types for analyzer, sampling session,
// classifier and configuration operations. Every error carries a stable
// numeric code so hosts embedding the pipeline can react programmatically.

mod analyzer;
mod classifier;
mod config;
mod session;

pub use analyzer::{log_analyzer_error, AnalyzerError, AnalyzerErrorCodes};
pub use classifier::{log_classifier_error, ClassifierError, ClassifierErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the pipeline and its host.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
