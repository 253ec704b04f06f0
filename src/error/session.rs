// Sampling session error types and constants

use crate::error::{AnalyzerError, ErrorCode};
use log::error;
use std::fmt;

/// Sampling session error code constants
///
/// Error code range: 2001-2003
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// A sampling session is already running
    pub const ALREADY_RUNNING: i32 = 2001;

    /// Mutex guarding shared session state was poisoned
    pub const LOCK_POISONED: i32 = 2002;

    /// The analyzer rejected a sampled buffer
    pub const ANALYZER: i32 = 2003;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SamplingCoordinator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the sampling coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A sampling session is already running
    AlreadyRunning,

    /// Mutex guarding shared state was poisoned
    LockPoisoned { component: String },

    /// The analyzer failed on the sampled buffer; the session is terminated
    Analyzer(AnalyzerError),
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::AlreadyRunning => SessionErrorCodes::ALREADY_RUNNING,
            SessionError::LockPoisoned { .. } => SessionErrorCodes::LOCK_POISONED,
            SessionError::Analyzer(_) => SessionErrorCodes::ANALYZER,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::AlreadyRunning => "Sampling session already running".to_string(),
            SessionError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            SessionError::Analyzer(err) => format!("Analyzer failed: {}", err.message()),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Analyzer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AnalyzerError> for SessionError {
    fn from(err: AnalyzerError) -> Self {
        SessionError::Analyzer(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(
            SessionError::AlreadyRunning.code(),
            SessionErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(
            SessionError::LockPoisoned {
                component: "latest_buffer".to_string()
            }
            .code(),
            SessionErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            SessionError::Analyzer(AnalyzerError::EmptyBuffer).code(),
            SessionErrorCodes::ANALYZER
        );
    }

    #[test]
    fn test_from_analyzer_error() {
        let err: SessionError = AnalyzerError::OddLength { len: 5 }.into();
        match &err {
            SessionError::Analyzer(AnalyzerError::OddLength { len }) => assert_eq!(*len, 5),
            other => panic!("Expected Analyzer error, got {:?}", other),
        }
        assert!(err.message().contains("not a multiple of 2"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
