//! Progress state model for the sync engine.
//!
//! This crate defines the data that flows through the synchronization core:
//!
//! - `snapshot`: `StateSnapshot` and `FieldValue`, a field-keyed map with
//!   per-field last-write-wins merging
//! - `schema`: field classification (progress counters, collections, flags,
//!   enums) and the designated core fields
//! - `sanitizer`: validation and clamping applied before an update reaches
//!   any buffer, mirror, or store
//! - `error`: error types for the model crate
//!
//! # Example
//!
//! ```
//! use progress_model::{FieldSpec, Sanitizer, SnapshotSchema, StateSnapshot};
//!
//! let schema = SnapshotSchema::new()
//!     .with_field("coins", FieldSpec::progress().core())
//!     .with_field("clicks", FieldSpec::progress());
//! let sanitizer = Sanitizer::new(schema);
//!
//! let update = StateSnapshot::new().with("coins", 10.0).with("clicks", -3.0);
//! let sanitized = sanitizer.sanitize(update).unwrap();
//!
//! assert_eq!(sanitized.snapshot.number("coins"), Some(10.0));
//! assert_eq!(sanitized.snapshot.number("clicks"), Some(0.0));
//!
//! let corrupt = StateSnapshot::new().with("coins", f64::NAN).with("clicks", 5.0);
//! assert!(sanitizer.sanitize(corrupt).is_err());
//! ```

pub mod error;
pub mod sanitizer;
pub mod schema;
pub mod snapshot;

pub use error::{ModelError, ModelResult, SanitizeError};
pub use sanitizer::{Sanitized, Sanitizer};
pub use schema::{FieldKind, FieldSpec, SnapshotSchema, DEFAULT_MAGNITUDE_CAP};
pub use snapshot::{FieldValue, StateSnapshot};
