//! Remote record storage abstraction.
//!
//! This module defines the `RemoteStore` trait: the durable, keyed,
//! last-upsert-wins store that holds each player's progress record. The sync
//! engine only ever writes to it, apart from the initial load at session
//! start.
//!
//! # Write semantics
//!
//! - Writes are field-level patches: submitted fields replace matching
//!   fields, absent fields are left untouched.
//! - Every write carries the fencing epoch of the engine that produced it.
//!   A store must refuse a write whose epoch is lower than the highest epoch
//!   it has accepted for that key (`StoreError::StaleEpoch`). This keeps a
//!   late write from an older epoch from reverting a critical write even when
//!   the network delivers them out of order.
//! - Repeating a write is harmless (idempotent patch).

use chrono::{DateTime, Utc};
use progress_model::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Stable identity a progress record is keyed by.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// The durable record owned by the remote store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Record identity
    pub key: RecordKey,
    /// Highest fencing epoch accepted for this record
    pub epoch: u64,
    /// Stored fields
    pub fields: StateSnapshot,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl RemoteRecord {
    /// Create a fresh record.
    pub fn new(key: RecordKey, epoch: u64, fields: StateSnapshot) -> Self {
        Self {
            key,
            epoch,
            fields,
            updated_at: Utc::now(),
        }
    }

    /// Apply a write to this record, enforcing epoch fencing.
    ///
    /// Normal and drain writes patch the submitted fields in. A critical
    /// write replaces the stored fields outright.
    pub fn apply(&mut self, request: &WriteRequest) -> Result<()> {
        if request.epoch < self.epoch {
            return Err(crate::StoreError::StaleEpoch {
                submitted: request.epoch,
                current: self.epoch,
            });
        }
        self.epoch = request.epoch;
        match request.kind {
            WriteKind::Critical => self.fields = request.fields.clone(),
            WriteKind::Normal | WriteKind::Drain => {
                self.fields.merge(request.fields.clone());
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Which engine path produced a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    /// Buffered diff dispatched on cadence or idle
    Normal,
    /// Unbuffered authoritative snapshot
    Critical,
    /// Best-effort teardown send
    Drain,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteKind::Normal => "normal",
            WriteKind::Critical => "critical",
            WriteKind::Drain => "drain",
        };
        f.write_str(name)
    }
}

/// A single upsert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Fencing epoch the write was produced under
    pub epoch: u64,
    /// Path that produced the write
    pub kind: WriteKind,
    /// Fields to write
    pub fields: StateSnapshot,
}

impl WriteRequest {
    /// Create a write request.
    pub fn new(kind: WriteKind, epoch: u64, fields: StateSnapshot) -> Self {
        Self {
            epoch,
            kind,
            fields,
        }
    }
}

/// Trait for durable remote record stores.
///
/// The trait methods take `&self` so implementations can be shared behind
/// `Arc` and use interior mutability.
#[trait_variant::make(Send)]
pub trait RemoteStore: Send + Sync {
    /// Load the record for a key, if one exists.
    async fn load(&self, key: &RecordKey) -> Result<Option<RemoteRecord>>;

    /// Insert or patch the record for a key.
    ///
    /// Implementations must reject writes whose epoch is below the stored
    /// epoch with `StoreError::StaleEpoch`.
    async fn upsert(&self, key: &RecordKey, request: WriteRequest) -> Result<()>;
}
