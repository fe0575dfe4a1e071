//! Remote writer.

use progress_model::StateSnapshot;
use std::sync::Arc;
use store::{RecordKey, RemoteStore, StoreError, WriteKind, WriteRequest};

/// Performs upserts of one record to the remote store.
pub struct RemoteWriter<R: RemoteStore> {
    store: Arc<R>,
    key: RecordKey,
}

impl<R: RemoteStore> RemoteWriter<R> {
    pub fn new(store: Arc<R>, key: RecordKey) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn store(&self) -> &Arc<R> {
        &self.store
    }

    /// Write `fields` under fencing epoch `epoch`.
    pub async fn upsert(
        &self,
        kind: WriteKind,
        epoch: u64,
        fields: StateSnapshot,
    ) -> Result<(), StoreError> {
        tracing::debug!(
            "Writing {} fields to {} ({} write, epoch {})",
            fields.len(),
            self.key,
            kind,
            epoch
        );
        self.store
            .upsert(&self.key, WriteRequest::new(kind, epoch, fields))
            .await
    }
}
