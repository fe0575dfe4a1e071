//! Error types for the progress model crate.

use thiserror::Error;

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building a schema.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The schema is internally inconsistent.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Reasons an update is rejected as a whole by the sanitizer.
///
/// Only core fields can reject an update. Problems with any other field are
/// repaired (clamped) or the field alone is dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SanitizeError {
    /// A core numeric field is NaN or infinite.
    #[error("Core field '{field}' is not finite: {value}")]
    NonFiniteCoreField { field: String, value: f64 },

    /// A core field carries a value of the wrong shape.
    #[error("Core field '{field}' expected {expected}, found {found}")]
    CoreTypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl SanitizeError {
    /// Name of the field that caused the rejection.
    pub fn field(&self) -> &str {
        match self {
            SanitizeError::NonFiniteCoreField { field, .. } => field,
            SanitizeError::CoreTypeMismatch { field, .. } => field,
        }
    }
}
