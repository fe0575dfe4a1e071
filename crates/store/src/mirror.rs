//! Local mirror of the full progress state.
//!
//! The mirror is written synchronously on every accepted mutation with the
//! entire merged state, so a crash or refresh on the same device loses
//! nothing beyond the last accepted mutation.

use chrono::{DateTime, Utc};
use progress_model::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::Result;
use crate::remote::RecordKey;

/// What the mirror holds for one record key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MirroredState {
    /// Fencing epoch current when the state was mirrored
    pub epoch: u64,
    /// Full merged state
    pub fields: StateSnapshot,
    /// When the state was mirrored
    pub saved_at: DateTime<Utc>,
}

impl MirroredState {
    /// Create a mirror entry stamped with the current time.
    pub fn new(epoch: u64, fields: StateSnapshot) -> Self {
        Self {
            epoch,
            fields,
            saved_at: Utc::now(),
        }
    }
}

/// Synchronous, keyed local cache.
pub trait LocalMirror: Send + Sync {
    /// Replace the mirrored state for a key.
    fn set(&self, key: &RecordKey, state: &MirroredState) -> Result<()>;

    /// Read the mirrored state for a key.
    fn get(&self, key: &RecordKey) -> Result<Option<MirroredState>>;

    /// Forget the mirrored state for a key.
    fn clear(&self, key: &RecordKey) -> Result<()>;
}

/// Mirror held in process memory.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    entries: RwLock<HashMap<RecordKey, MirroredState>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalMirror for MemoryMirror {
    fn set(&self, key: &RecordKey, state: &MirroredState) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), state.clone());
        Ok(())
    }

    fn get(&self, key: &RecordKey) -> Result<Option<MirroredState>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn clear(&self, key: &RecordKey) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
