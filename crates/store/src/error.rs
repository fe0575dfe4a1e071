//! Error types for storage operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote call failed; the write may be retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store already holds a record written under a newer fencing epoch.
    #[error("Stale epoch: submitted {submitted}, store holds {current}")]
    StaleEpoch { submitted: u64, current: u64 },
}

impl StoreError {
    /// Whether a retry of the same write can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Transport("connection reset".to_string());
        assert_eq!(err.to_string(), "Transport error: connection reset");

        let err = StoreError::StaleEpoch {
            submitted: 2,
            current: 3,
        };
        assert_eq!(err.to_string(), "Stale epoch: submitted 2, store holds 3");
    }

    #[test]
    fn test_is_retryable() {
        assert!(StoreError::Transport("x".to_string()).is_retryable());
        assert!(!StoreError::StaleEpoch {
            submitted: 0,
            current: 1
        }
        .is_retryable());
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
