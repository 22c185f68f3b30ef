use core::result::Result as CoreResult;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error as ThisError;
use toml::de::Error as TomlError;

/// Result type for warden operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the gate engine.
///
/// Only [`Error::Config`] is allowed to reach callers at setup time; every
/// other variant is recovered into a gate result by the executor or reporter.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid (unknown gate type, bad settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A gate's execute raised an internal error.
    #[error("Gate execution failed: {0}")]
    Execution(String),

    /// A gate exceeded its deadline. Carries the configured timeout in ms.
    #[error("Gate execution timed out after {0}ms")]
    Timeout(u64),

    /// Result persistence failed. Never fatal to a run.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Determines whether the executor may retry after this error.
    ///
    /// Execution and timeout failures are transient from the scheduler's
    /// point of view; configuration and storage failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let error1 = Error::Config("unknown gate type: foo".to_owned());
        assert_eq!(
            error1.to_string(),
            "Configuration error: unknown gate type: foo"
        );

        let error2 = Error::Timeout(50);
        assert_eq!(error2.to_string(), "Gate execution timed out after 50ms");

        let error3 = Error::Execution("boom".to_owned());
        assert_eq!(error3.to_string(), "Gate execution failed: boom");
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::Execution("transient".to_owned()).is_retryable());
        assert!(Error::Timeout(1000).is_retryable());

        assert!(!Error::Config("bad".to_owned()).is_retryable());
        assert!(!Error::Storage("db down".to_owned()).is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }
}
