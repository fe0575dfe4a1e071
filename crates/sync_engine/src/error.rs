//! Error types for the sync engine.

use progress_model::{ModelError, SanitizeError};
use store::StoreError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engine.
///
/// Only session setup and `critical_flush` return these to the caller.
/// Failures on the `ingest` path are logged and counted instead.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The update failed sanitization and was dropped as a whole.
    #[error("Update rejected: {0}")]
    Rejected(#[from] SanitizeError),

    /// The remote write failed.
    #[error("Transport failure: {0}")]
    Transport(#[from] StoreError),

    /// The engine has been disposed.
    #[error("Sync engine is disposed")]
    Disposed,

    /// The engine was created outside a tokio runtime.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Schema error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether retrying the failed operation can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::Config("base interval must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: base interval must be positive"
        );
        assert_eq!(SyncError::Disposed.to_string(), "Sync engine is disposed");
    }

    #[test]
    fn test_from_conversions() {
        let err: SyncError = SanitizeError::NonFiniteCoreField {
            field: "coins".to_string(),
            value: f64::NAN,
        }
        .into();
        assert!(matches!(err, SyncError::Rejected(_)));
        assert!(!err.is_retryable());

        let err: SyncError = StoreError::Transport("timeout".to_string()).into();
        assert!(err.is_retryable());

        let err: SyncError = StoreError::StaleEpoch {
            submitted: 1,
            current: 2,
        }
        .into();
        assert!(!err.is_retryable());
    }
}
