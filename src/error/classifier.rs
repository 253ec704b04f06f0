// Classifier error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Classifier error code constants
///
/// Error code range: 3001-3003
pub struct ClassifierErrorCodes {}

impl ClassifierErrorCodes {
    /// The external service could not be reached or failed mid-call
    pub const TRANSPORT: i32 = 3001;

    /// The external service answered with an empty body
    pub const EMPTY_RESPONSE: i32 = 3002;

    /// The service is not configured or refused the request
    pub const UNAVAILABLE: i32 = 3003;
}

/// Log a classifier error with structured context
pub fn log_classifier_error(err: &ClassifierError, context: &str) {
    error!(
        "Classifier error in {}: code={}, component=AnalysisCoordinator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by a `ClassificationService` implementation
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The call failed in transit
    Transport { reason: String },

    /// The call succeeded but returned nothing
    EmptyResponse,

    /// The service is not available
    Unavailable { reason: String },
}

impl ErrorCode for ClassifierError {
    fn code(&self) -> i32 {
        match self {
            ClassifierError::Transport { .. } => ClassifierErrorCodes::TRANSPORT,
            ClassifierError::EmptyResponse => ClassifierErrorCodes::EMPTY_RESPONSE,
            ClassifierError::Unavailable { .. } => ClassifierErrorCodes::UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            ClassifierError::Transport { reason } => {
                format!("Classifier transport failed: {}", reason)
            }
            ClassifierError::EmptyResponse => "Classifier returned an empty response".to_string(),
            ClassifierError::Unavailable { reason } => {
                format!("Classifier unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassifierError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ClassifierError {}

impl From<std::io::Error> for ClassifierError {
    fn from(err: std::io::Error) -> Self {
        ClassifierError::Transport {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_error_codes() {
        assert_eq!(
            ClassifierError::Transport {
                reason: "test".to_string()
            }
            .code(),
            ClassifierErrorCodes::TRANSPORT
        );
        assert_eq!(
            ClassifierError::EmptyResponse.code(),
            ClassifierErrorCodes::EMPTY_RESPONSE
        );
        assert_eq!(
            ClassifierError::Unavailable {
                reason: "test".to_string()
            }
            .code(),
            ClassifierErrorCodes::UNAVAILABLE
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("broken pipe");
        let err: ClassifierError = io_err.into();
        match err {
            ClassifierError::Transport { reason } => assert!(reason.contains("broken pipe")),
            other => panic!("Expected Transport, got {:?}", other),
        }
    }
}
