//! In-memory remote store implementation.
//!
//! This module provides `MemoryRemoteStore`, an in-memory implementation of
//! the `RemoteStore` trait. It's intended for development, tests, and the
//! simulator, so it can also misbehave on purpose:
//!
//! - Per-call latency, either a fixed default or a scripted queue of steps
//! - Injected transport failures
//! - A log of every write and how it was resolved
//!
//! Writes take effect when the simulated call completes, not when it starts,
//! so two writes with different latencies can land out of order just like
//! they would over a real network.
//!
//! # Example
//!
//! ```ignore
//! use store::{MemoryRemoteStore, RemoteStore, RecordKey, WriteKind, WriteRequest};
//!
//! let store = MemoryRemoteStore::new().with_latency(Duration::from_millis(50));
//! store.fail_next(1);
//!
//! let key = RecordKey::new("player");
//! assert!(store.upsert(&key, request.clone()).await.is_err());
//! assert!(store.upsert(&key, request).await.is_ok());
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::remote::{RecordKey, RemoteRecord, RemoteStore, WriteRequest};

/// How a scripted call resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Apply the write normally
    Succeed,
    /// Fail with a transport error carrying this message
    Fail(String),
}

/// One scripted remote call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptStep {
    /// Time the call takes before it resolves
    pub latency: Duration,
    /// How the call resolves
    pub outcome: ScriptedOutcome,
}

impl ScriptStep {
    /// A call that succeeds after `latency`.
    pub fn succeed_after(latency: Duration) -> Self {
        Self {
            latency,
            outcome: ScriptedOutcome::Succeed,
        }
    }

    /// A call that fails after `latency`.
    pub fn fail_after(latency: Duration, message: impl Into<String>) -> Self {
        Self {
            latency,
            outcome: ScriptedOutcome::Fail(message.into()),
        }
    }
}

/// How a logged write was resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteResolution {
    /// The write was applied to the record
    Applied,
    /// The write was refused for carrying an older epoch
    StaleEpoch,
    /// The call failed in transit
    Failed,
}

/// A write seen by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedWrite {
    pub key: RecordKey,
    pub request: WriteRequest,
    pub resolution: WriteResolution,
}

/// In-memory implementation of `RemoteStore`.
///
/// Thread-safe; share it across tasks with `Arc`.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    /// Records keyed by identity
    records: RwLock<HashMap<RecordKey, RemoteRecord>>,
    /// Scripted steps consumed by successive upserts
    script: Mutex<VecDeque<ScriptStep>>,
    /// Number of upcoming unscripted calls that should fail
    pending_failures: Mutex<usize>,
    /// Latency for unscripted calls
    default_latency: Duration,
    /// Every upsert in completion order
    log: Mutex<Vec<LoggedWrite>>,
}

impl MemoryRemoteStore {
    /// Create an empty store with no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latency used for unscripted calls.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Seed a record, as if written by an earlier session.
    pub fn with_record(self, record: RemoteRecord) -> Self {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.key.clone(), record);
        self
    }

    /// Queue a scripted step for the next upsert.
    pub fn push_step(&self, step: ScriptStep) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }

    /// Make the next `count` unscripted upserts fail.
    pub fn fail_next(&self, count: usize) {
        *self
            .pending_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = count;
    }

    /// Get a copy of the stored record.
    pub fn record(&self, key: &RecordKey) -> Option<RemoteRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Every write the store has resolved, in completion order.
    pub fn writes(&self) -> Vec<LoggedWrite> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of writes that were applied.
    pub fn applied_count(&self) -> usize {
        self.writes()
            .iter()
            .filter(|w| w.resolution == WriteResolution::Applied)
            .count()
    }

    /// Total number of resolved upserts.
    pub fn write_count(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn next_step(&self) -> ScriptStep {
        if let Some(step) = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            return step;
        }

        let mut failures = self
            .pending_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *failures > 0 {
            *failures -= 1;
            ScriptStep::fail_after(self.default_latency, "injected failure")
        } else {
            ScriptStep::succeed_after(self.default_latency)
        }
    }

    fn record_write(&self, key: &RecordKey, request: WriteRequest, resolution: WriteResolution) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LoggedWrite {
                key: key.clone(),
                request,
                resolution,
            });
    }

    fn apply(&self, key: &RecordKey, request: &WriteRequest) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.get_mut(key) {
            Some(record) => record.apply(request),
            None => {
                records.insert(
                    key.clone(),
                    RemoteRecord::new(key.clone(), request.epoch, request.fields.clone()),
                );
                Ok(())
            }
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn load(&self, key: &RecordKey) -> Result<Option<RemoteRecord>> {
        Ok(self.record(key))
    }

    async fn upsert(&self, key: &RecordKey, request: WriteRequest) -> Result<()> {
        let step = self.next_step();
        if !step.latency.is_zero() {
            tokio::time::sleep(step.latency).await;
        }

        if let ScriptedOutcome::Fail(message) = step.outcome {
            tracing::debug!("Simulated remote failure for {}: {}", key, message);
            self.record_write(key, request, WriteResolution::Failed);
            return Err(StoreError::Transport(message));
        }

        match self.apply(key, &request) {
            Ok(()) => {
                self.record_write(key, request, WriteResolution::Applied);
                Ok(())
            }
            Err(e) => {
                self.record_write(key, request, WriteResolution::StaleEpoch);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::WriteKind;
    use progress_model::StateSnapshot;
    use std::sync::Arc;

    fn key() -> RecordKey {
        RecordKey::new("player-1")
    }

    fn write(epoch: u64, coins: f64) -> WriteRequest {
        WriteRequest::new(
            WriteKind::Normal,
            epoch,
            StateSnapshot::new().with("coins", coins),
        )
    }

    #[tokio::test]
    async fn test_upsert_creates_and_patches() {
        let store = MemoryRemoteStore::new();

        store.upsert(&key(), write(0, 1.0)).await.unwrap();
        store
            .upsert(
                &key(),
                WriteRequest::new(WriteKind::Normal, 0, StateSnapshot::new().with("tier", 2.0)),
            )
            .await
            .unwrap();

        let record = store.load(&key()).await.unwrap().unwrap();
        assert_eq!(record.fields.number("coins"), Some(1.0));
        assert_eq!(record.fields.number("tier"), Some(2.0));
        assert_eq!(store.applied_count(), 2);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = MemoryRemoteStore::new();
        assert!(store.load(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_next() {
        let store = MemoryRemoteStore::new();
        store.fail_next(2);

        assert!(matches!(
            store.upsert(&key(), write(0, 1.0)).await,
            Err(StoreError::Transport(_))
        ));
        assert!(store.upsert(&key(), write(0, 1.0)).await.is_err());
        assert!(store.upsert(&key(), write(0, 1.0)).await.is_ok());

        let resolutions: Vec<WriteResolution> =
            store.writes().into_iter().map(|w| w.resolution).collect();
        assert_eq!(
            resolutions,
            vec![
                WriteResolution::Failed,
                WriteResolution::Failed,
                WriteResolution::Applied
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_epoch_rejected() {
        let store = MemoryRemoteStore::new();
        store.upsert(&key(), write(2, 0.0)).await.unwrap();

        let result = store.upsert(&key(), write(1, 999.0)).await;
        assert!(matches!(result, Err(StoreError::StaleEpoch { .. })));
        assert_eq!(store.record(&key()).unwrap().fields.number("coins"), Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_latency_reorders_writes() {
        let store = Arc::new(MemoryRemoteStore::new());
        store.push_step(ScriptStep::succeed_after(Duration::from_millis(150)));
        store.push_step(ScriptStep::succeed_after(Duration::from_millis(50)));

        let slow = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.upsert(&key(), write(0, 1.0)).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        let fast = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.upsert(&key(), write(1, 2.0)).await })
        };

        assert!(fast.await.unwrap().is_ok());
        assert!(matches!(
            slow.await.unwrap(),
            Err(StoreError::StaleEpoch { .. })
        ));
        assert_eq!(store.record(&key()).unwrap().fields.number("coins"), Some(2.0));
    }

    #[test]
    fn test_with_record_seeds_store() {
        let record = RemoteRecord::new(key(), 5, StateSnapshot::new().with("coins", 3.0));
        let store = MemoryRemoteStore::new().with_record(record.clone());
        assert_eq!(store.record(&key()), Some(record));
    }
}
