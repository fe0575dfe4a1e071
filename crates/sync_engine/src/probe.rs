//! Control surface for tests and diagnostics.
//!
//! An `EngineProbe` reads the engine's internal scheduling state and can nudge
//! it, without any global hooks. Obtain one with `SyncEngine::probe`.

use progress_model::StateSnapshot;
use std::sync::Arc;
use std::time::Duration;
use store::RemoteStore;
use tokio::time::Instant;

use crate::engine::{InFlightFlush, Shared};
use crate::schedule::FlushSchedule;

pub struct EngineProbe<R: RemoteStore + 'static> {
    shared: Arc<Shared<R>>,
}

impl<R: RemoteStore + 'static> EngineProbe<R> {
    pub(crate) fn new(shared: Arc<Shared<R>>) -> Self {
        Self { shared }
    }

    /// The buffered diff, if any.
    pub fn pending(&self) -> Option<StateSnapshot> {
        self.shared.lock().pending.peek().cloned()
    }

    pub fn fencing_token(&self) -> u64 {
        self.shared.lock().fencing.current()
    }

    pub fn schedule(&self) -> FlushSchedule {
        self.shared.lock().schedule.clone()
    }

    pub fn in_flight(&self) -> Option<InFlightFlush> {
        self.shared.lock().in_flight
    }

    pub fn critical_in_progress(&self) -> bool {
        self.shared.lock().critical_in_progress
    }

    /// When the armed cadence timer fires.
    pub fn cadence_deadline(&self) -> Option<Instant> {
        self.shared
            .lock()
            .cadence_timer
            .as_ref()
            .map(|timer| timer.deadline)
    }

    /// When the armed idle timer fires.
    pub fn idle_deadline(&self) -> Option<Instant> {
        self.shared
            .lock()
            .idle_timer
            .as_ref()
            .map(|timer| timer.deadline)
    }

    /// Flush the pending buffer without waiting for cadence or idle.
    ///
    /// Cooldown, an in-flight write, and a running critical flush still hold
    /// the flush back; it then goes out as soon as they clear. Returns whether
    /// a flush was dispatched right away.
    pub fn force_flush(&self) -> bool {
        let mut state = self.shared.lock();
        if state.pending.is_empty() {
            return false;
        }
        state.schedule.flush_due = true;
        let now = self.shared.now();
        self.shared.try_schedule_flush(&mut state, now)
    }

    /// Pin the cadence interval, or return it to the activity classifier.
    pub fn set_cadence_override(&self, interval: Option<Duration>) {
        let mut state = self.shared.lock();
        state.schedule.cadence_override = interval;
        self.shared.classify(&mut state);
        let now = self.shared.now();
        self.shared.try_schedule_flush(&mut state, now);
    }
}

#[cfg(test)]
mod tests {
    use crate::{InitialState, SyncConfig, SyncDeps, SyncEngine};
    use progress_model::StateSnapshot;
    use std::sync::Arc;
    use std::time::Duration;
    use store::{ChannelDrainTransport, MemoryMirror, MemoryRemoteStore};

    fn engine() -> (SyncEngine<MemoryRemoteStore>, Arc<MemoryRemoteStore>) {
        let remote = Arc::new(MemoryRemoteStore::new());
        let (transport, _rx) = ChannelDrainTransport::new();
        let deps = SyncDeps::new(
            Arc::clone(&remote),
            Arc::new(MemoryMirror::new()),
            Arc::new(transport),
        );
        let config = SyncConfig::new("p")
            .with_base_interval(Duration::from_millis(5000))
            .with_idle_delay(Duration::from_millis(3000));
        let engine = SyncEngine::new(config, deps, InitialState::default()).unwrap();
        (engine, remote)
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_reads_pending_and_timers() {
        let (engine, _remote) = engine();
        let probe = engine.probe();
        let start = tokio::time::Instant::now();

        assert!(probe.pending().is_none());
        assert!(probe.cadence_deadline().is_none());

        engine.ingest(StateSnapshot::new().with("coins", 3.0));

        assert_eq!(probe.pending(), Some(StateSnapshot::new().with("coins", 3.0)));
        assert_eq!(probe.cadence_deadline(), Some(start + Duration::from_millis(5000)));
        assert_eq!(probe.idle_deadline(), Some(start + Duration::from_millis(3000)));
        assert_eq!(probe.fencing_token(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_flush_dispatches_now() {
        let (engine, remote) = engine();
        let probe = engine.probe();

        assert!(!probe.force_flush());

        engine.ingest(StateSnapshot::new().with("coins", 3.0));
        assert!(probe.force_flush());
        assert!(probe.pending().is_none());
        assert!(probe.in_flight().is_some());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(remote.applied_count(), 1);
        assert!(probe.in_flight().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_override() {
        let (engine, _remote) = engine();
        let probe = engine.probe();
        let start = tokio::time::Instant::now();

        engine.ingest(StateSnapshot::new().with("coins", 3.0));
        probe.set_cadence_override(Some(Duration::from_millis(200)));

        assert_eq!(probe.schedule().cadence_interval, Duration::from_millis(200));
        assert_eq!(probe.cadence_deadline(), Some(start + Duration::from_millis(200)));

        probe.set_cadence_override(None);
        assert_eq!(probe.schedule().cadence_interval, Duration::from_millis(5000));
    }
}
