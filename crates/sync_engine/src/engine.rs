//! The sync engine.
//!
//! `SyncEngine` turns a stream of small progress mutations into a few remote
//! writes:
//!
//! - `ingest` sanitizes an update, merges it into the pending buffer and the
//!   full state, mirrors the full state locally, and lets the scheduler decide
//!   when to flush.
//! - Normal flushes are dispatched on the adaptive cadence or after an idle
//!   delay. The buffer is taken at dispatch, so mutations during the write
//!   start a fresh buffer.
//! - `critical_flush` advances the fencing token, drops whatever is buffered,
//!   and writes an authoritative snapshot directly. Any normal flush that was
//!   in flight is discarded when it settles, and the store refuses its write
//!   because it carries the older epoch.
//! - `drain` hands the unsent state to a teardown transport without waiting.
//!
//! All engine state lives behind one mutex that is never held across an
//! await. Timers are spawned tasks holding a weak reference to the engine, so
//! dropping every handle stops them.

use progress_model::{Sanitizer, StateSnapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use store::{
    DrainPayload, DrainTransport, LocalMirror, MirroredState, RecordKey, RemoteRecord,
    RemoteStore, StoreError, WriteKind,
};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::clock::{Clock, TokioClock};
use crate::config::SyncConfig;
use crate::drain::EmergencyDrain;
use crate::error::{SyncError, SyncResult};
use crate::fencing::FencingController;
use crate::pending::PendingBuffer;
use crate::probe::EngineProbe;
use crate::schedule::{FlushDecision, FlushSchedule};
use crate::status::{EnginePhase, SyncStats, SyncStatus};
use crate::writer::RemoteWriter;

/// Collaborators injected into an engine.
pub struct SyncDeps<R: RemoteStore> {
    pub remote: Arc<R>,
    pub mirror: Arc<dyn LocalMirror>,
    pub drain: Arc<dyn DrainTransport>,
    pub clock: Arc<dyn Clock>,
}

impl<R: RemoteStore> SyncDeps<R> {
    /// Dependencies using the tokio clock.
    pub fn new(
        remote: Arc<R>,
        mirror: Arc<dyn LocalMirror>,
        drain: Arc<dyn DrainTransport>,
    ) -> Self {
        Self {
            remote,
            mirror,
            drain,
            clock: Arc::new(TokioClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// State a session starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialState {
    /// Highest epoch already known for the record
    pub epoch: u64,
    /// Full state
    pub current: StateSnapshot,
    /// Fields that still have to reach the remote store
    pub pending: StateSnapshot,
    /// The full state is a critical snapshot the store never accepted, so
    /// the next flush must replace the record instead of patching it
    pub resend_critical: bool,
}

impl InitialState {
    pub fn new(epoch: u64, current: StateSnapshot) -> Self {
        Self {
            epoch,
            current,
            pending: StateSnapshot::new(),
            resend_critical: false,
        }
    }

    /// Pick the starting state from the remote record and the local mirror.
    ///
    /// A remote record from a newer epoch wins outright: a critical flush
    /// elsewhere superseded what this device mirrored. Otherwise the mirror
    /// wins, and whatever it holds that the remote record lacks is queued
    /// for flushing. A mirror from a newer epoch holds a critical snapshot
    /// that never reached the store; it is queued whole, to replace the
    /// record.
    pub fn resolve(remote: Option<RemoteRecord>, mirrored: Option<MirroredState>) -> Self {
        let remote_epoch = remote.as_ref().map_or(0, |record| record.epoch);

        match (remote, mirrored) {
            (Some(remote), Some(mirrored)) if remote.epoch > mirrored.epoch => {
                Self::new(remote.epoch, remote.fields)
            }
            (_, Some(mirrored)) if mirrored.epoch > remote_epoch => Self {
                epoch: mirrored.epoch,
                pending: mirrored.fields.clone(),
                current: mirrored.fields,
                resend_critical: true,
            },
            (remote, Some(mirrored)) => {
                let mut current = remote.map(|record| record.fields).unwrap_or_default();
                let pending = mirrored.fields.diff_from(&current);
                current.merge(pending.clone());
                Self {
                    epoch: remote_epoch.max(mirrored.epoch),
                    current,
                    pending,
                    resend_critical: false,
                }
            }
            (Some(remote), None) => Self::new(remote.epoch, remote.fields),
            (None, None) => Self::default(),
        }
    }
}

/// A buffered flush whose write has not settled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightFlush {
    pub id: u64,
    /// Fencing token captured at dispatch
    pub token: u64,
    /// `Critical` when the flush resends a critical snapshot that failed
    pub kind: WriteKind,
    pub dispatched_at: Instant,
    /// Number of fields in the write
    pub fields: usize,
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Cadence,
    Idle,
}

#[derive(Debug)]
pub(crate) struct Timer {
    id: u64,
    pub(crate) deadline: Instant,
    handle: AbortHandle,
}

impl Timer {
    fn cancel(self) {
        self.handle.abort();
    }
}

pub(crate) struct EngineState {
    pub(crate) current: StateSnapshot,
    pub(crate) pending: PendingBuffer,
    pub(crate) schedule: FlushSchedule,
    pub(crate) fencing: FencingController,
    pub(crate) in_flight: Option<InFlightFlush>,
    pub(crate) critical_in_progress: bool,
    pub(crate) critical_unsettled: bool,
    pub(crate) cadence_timer: Option<Timer>,
    pub(crate) idle_timer: Option<Timer>,
    pub(crate) disposed: bool,
    pub(crate) stats: SyncStats,
    next_id: u64,
}

impl EngineState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.cadence_timer.take() {
            timer.cancel();
        }
        if let Some(timer) = self.idle_timer.take() {
            timer.cancel();
        }
        self.schedule.idle_deadline = None;
    }
}

pub(crate) struct Shared<R: RemoteStore + 'static> {
    config: SyncConfig,
    key: RecordKey,
    session_id: Uuid,
    clock: Arc<dyn Clock>,
    sanitizer: Sanitizer,
    mirror: Arc<dyn LocalMirror>,
    writer: RemoteWriter<R>,
    drain: EmergencyDrain,
    runtime: Handle,
    state: Mutex<EngineState>,
    critical_latch: tokio::sync::Mutex<()>,
}

impl<R: RemoteStore + 'static> Shared<R> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    fn write_mirror(&self, state: &EngineState) {
        let mirrored = MirroredState::new(state.fencing.current(), state.current.clone());
        if let Err(e) = self.mirror.set(&self.key, &mirrored) {
            tracing::warn!("Mirror write for {} failed: {}", self.key, e);
        }
    }

    pub(crate) fn classify(&self, state: &mut EngineState) {
        let automation_active = state.current.flag(&self.config.automation_flag);
        state.schedule.classify(
            automation_active,
            self.config.base_interval(),
            self.config.automation_interval(),
        );
    }

    fn arm_idle(self: &Arc<Self>, state: &mut EngineState, now: Instant) {
        if let Some(timer) = state.idle_timer.take() {
            timer.cancel();
        }
        let deadline = now + self.config.idle_delay();
        let timer = self.spawn_timer(state, TimerKind::Idle, deadline);
        state.schedule.idle_deadline = Some(deadline);
        state.idle_timer = Some(timer);
    }

    fn arm_cadence(self: &Arc<Self>, state: &mut EngineState, deadline: Instant) {
        if state
            .cadence_timer
            .as_ref()
            .is_some_and(|timer| timer.deadline == deadline)
        {
            return;
        }
        if let Some(timer) = state.cadence_timer.take() {
            timer.cancel();
        }
        let timer = self.spawn_timer(state, TimerKind::Cadence, deadline);
        state.cadence_timer = Some(timer);
    }

    fn spawn_timer(
        self: &Arc<Self>,
        state: &mut EngineState,
        kind: TimerKind,
        deadline: Instant,
    ) -> Timer {
        let id = state.next_id();
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = self
            .runtime
            .spawn(async move {
                tokio::time::sleep_until(deadline).await;
                if let Some(shared) = weak.upgrade() {
                    shared.on_timer(kind, id);
                }
            })
            .abort_handle();

        Timer {
            id,
            deadline,
            handle,
        }
    }

    fn on_timer(self: &Arc<Self>, kind: TimerKind, id: u64) {
        let mut state = self.lock();
        let now = self.now();

        match kind {
            TimerKind::Cadence => {
                // Replaced or cancelled after this task woke.
                if !state.cadence_timer.as_ref().is_some_and(|t| t.id == id) {
                    return;
                }
                state.cadence_timer = None;
            }
            TimerKind::Idle => {
                if !state.idle_timer.as_ref().is_some_and(|t| t.id == id) {
                    return;
                }
                state.idle_timer = None;
                state.schedule.idle_deadline = None;
                if state.pending.is_empty() {
                    return;
                }
                tracing::debug!("Idle delay elapsed for {}", self.key);
                state.schedule.flush_due = true;
            }
        }

        self.try_schedule_flush(&mut state, now);
    }

    /// Dispatch now if allowed, otherwise arm the cadence timer for the
    /// earliest instant a dispatch could happen.
    ///
    /// Returns whether a flush was dispatched.
    pub(crate) fn try_schedule_flush(
        self: &Arc<Self>,
        state: &mut EngineState,
        now: Instant,
    ) -> bool {
        if state.disposed
            || state.pending.is_empty()
            || state.in_flight.is_some()
            || state.critical_in_progress
        {
            return false;
        }

        match state.schedule.decide(now) {
            FlushDecision::DispatchNow => {
                self.dispatch(state, now);
                true
            }
            FlushDecision::WaitUntil(deadline) => {
                self.arm_cadence(state, deadline);
                false
            }
        }
    }

    fn dispatch(self: &Arc<Self>, state: &mut EngineState, now: Instant) {
        let Some(diff) = state.pending.take() else {
            return;
        };
        if let Some(timer) = state.cadence_timer.take() {
            timer.cancel();
        }

        // A failed critical write goes out again as the whole state, which
        // already holds everything buffered since.
        let (kind, fields) = if state.critical_unsettled {
            (WriteKind::Critical, state.current.clone())
        } else {
            (WriteKind::Normal, diff)
        };

        let token = state.fencing.current();
        let id = state.next_id();
        state.in_flight = Some(InFlightFlush {
            id,
            token,
            kind,
            dispatched_at: now,
            fields: fields.len(),
        });
        state.schedule.flush_due = false;
        state.stats.flushes_dispatched += 1;

        tracing::debug!(
            "Dispatching {} flush {} for {} ({} fields, token {})",
            kind,
            id,
            self.key,
            fields.len(),
            token
        );

        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = shared.writer.upsert(kind, token, fields.clone()).await;
            shared.settle(id, token, kind, fields, result);
        });
    }

    fn settle(
        self: &Arc<Self>,
        id: u64,
        token: u64,
        kind: WriteKind,
        diff: StateSnapshot,
        result: Result<(), StoreError>,
    ) {
        let mut state = self.lock();
        let now = self.now();

        if !state.fencing.is_current(token) {
            state.stats.stale_discards += 1;
            tracing::debug!(
                "Discarding flush {} for {}: token {} superseded by {}",
                id,
                self.key,
                token,
                state.fencing.current()
            );
            return;
        }

        if state.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
            state.in_flight = None;
        }
        state.schedule.last_flush_attempt = now;

        match result {
            Ok(()) => {
                state.stats.flushes_succeeded += 1;
                if kind == WriteKind::Critical {
                    state.critical_unsettled = false;
                }
                tracing::debug!("Flush {} for {} settled", id, self.key);
            }
            Err(StoreError::StaleEpoch { submitted, current }) => {
                state.stats.stale_discards += 1;
                if kind == WriteKind::Critical {
                    state.critical_unsettled = false;
                }
                tracing::warn!(
                    "Store refused flush {} for {}: epoch {} is behind {}",
                    id,
                    self.key,
                    submitted,
                    current
                );
            }
            Err(e) => {
                state.stats.flushes_failed += 1;
                tracing::warn!(
                    "Flush {} for {} failed, re-merging {} fields: {}",
                    id,
                    self.key,
                    diff.len(),
                    e
                );
                state.pending.merge_older(diff);
            }
        }

        self.try_schedule_flush(&mut state, now);
    }
}

/// Handle to a sync session.
///
/// Cloning the handle shares the same session.
pub struct SyncEngine<R: RemoteStore + 'static> {
    shared: Arc<Shared<R>>,
}

impl<R: RemoteStore + 'static> Clone for SyncEngine<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: RemoteStore + 'static> SyncEngine<R> {
    /// Open a session, resolving the starting state from the remote record
    /// and the local mirror.
    ///
    /// A failed remote load is not fatal; the session starts from the mirror.
    pub async fn open(config: SyncConfig, deps: SyncDeps<R>) -> SyncResult<Self> {
        config.validate()?;
        let key = config.key();
        let sanitizer = Sanitizer::new(config.schema.clone());

        let remote = match deps.remote.load(&key).await {
            Ok(record) => {
                record.filter(|record| screen(&sanitizer, &key, "remote record", &record.fields))
            }
            Err(e) => {
                tracing::warn!("Failed to load remote record for {}, using mirror: {}", key, e);
                None
            }
        };

        let mirrored = match deps.mirror.get(&key) {
            Ok(state) => state.filter(|state| screen(&sanitizer, &key, "mirror", &state.fields)),
            Err(e) => {
                tracing::warn!("Failed to read mirror for {}: {}", key, e);
                None
            }
        };

        Self::new(config, deps, InitialState::resolve(remote, mirrored))
    }

    /// Create a session from a known starting state.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: SyncConfig, deps: SyncDeps<R>, initial: InitialState) -> SyncResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;

        let key = config.key();
        let session_id = Uuid::new_v4();
        let now = deps.clock.now();

        let state = EngineState {
            current: initial.current,
            pending: PendingBuffer::with_diff(initial.pending),
            schedule: FlushSchedule::new(now, config.base_interval()),
            fencing: FencingController::seeded(initial.epoch),
            in_flight: None,
            critical_in_progress: false,
            critical_unsettled: initial.resend_critical,
            cadence_timer: None,
            idle_timer: None,
            disposed: false,
            stats: SyncStats::default(),
            next_id: 0,
        };

        let shared = Arc::new(Shared {
            sanitizer: Sanitizer::new(config.schema.clone()),
            writer: RemoteWriter::new(deps.remote, key.clone()),
            drain: EmergencyDrain::new(deps.drain, key.clone(), session_id),
            mirror: deps.mirror,
            clock: deps.clock,
            runtime,
            key,
            session_id,
            config,
            state: Mutex::new(state),
            critical_latch: tokio::sync::Mutex::new(()),
        });

        {
            let mut state = shared.lock();
            shared.classify(&mut state);
            shared.write_mirror(&state);
            shared.try_schedule_flush(&mut state, now);

            tracing::info!(
                "Opened sync session {} for {} at epoch {} ({} fields pending)",
                session_id,
                shared.key,
                state.fencing.current(),
                state.pending.len()
            );
        }

        Ok(Self { shared })
    }

    /// Accept a mutation.
    ///
    /// Never fails and never blocks on the network. Rejected updates are
    /// logged and counted, and leave the buffer and mirror untouched.
    pub fn ingest(&self, update: StateSnapshot) {
        let shared = &self.shared;
        let mut state = shared.lock();

        if state.disposed {
            tracing::warn!("Ignoring update for {}: engine disposed", shared.key);
            return;
        }

        let sanitized = match shared.sanitizer.sanitize(update) {
            Ok(sanitized) => sanitized,
            Err(e) => {
                state.stats.rejected += 1;
                tracing::warn!("Rejected update for {}: {}", shared.key, e);
                return;
            }
        };
        if !sanitized.is_clean() {
            tracing::debug!(
                "Repaired update for {}: clamped {:?}, dropped {:?}",
                shared.key,
                sanitized.clamped,
                sanitized.dropped
            );
        }

        state.stats.ingested += 1;
        state.current.merge(sanitized.snapshot.clone());
        state.pending.merge(sanitized.snapshot);
        shared.write_mirror(&state);
        shared.classify(&mut state);

        let now = shared.now();
        shared.arm_idle(&mut state, now);
        shared.try_schedule_flush(&mut state, now);
    }

    /// Write an authoritative snapshot that no older write may overwrite.
    ///
    /// Advances the fencing token, drops the pending buffer, replaces the
    /// full state, and writes it directly. Normal flushes are held back for
    /// the cooldown window afterwards, whether or not the write succeeded.
    /// A failed write is resent as a full replacing write once the cooldown
    /// ends. Concurrent calls run one after another.
    pub async fn critical_flush(&self, snapshot: StateSnapshot) -> SyncResult<()> {
        let shared = &self.shared;
        let _latch = shared.critical_latch.lock().await;

        let (token, fields) = {
            let mut state = shared.lock();
            if state.disposed {
                return Err(SyncError::Disposed);
            }

            let sanitized = match shared.sanitizer.sanitize(snapshot) {
                Ok(sanitized) => sanitized,
                Err(e) => {
                    state.stats.rejected += 1;
                    tracing::warn!("Rejected critical snapshot for {}: {}", shared.key, e);
                    return Err(e.into());
                }
            };

            let token = state.fencing.advance();
            state.cancel_timers();
            state.pending.clear();
            state.in_flight = None;
            state.critical_in_progress = true;
            state.critical_unsettled = false;
            state.schedule.flush_due = false;
            state.current = sanitized.snapshot.clone();
            state.stats.critical_flushes += 1;
            shared.write_mirror(&state);
            shared.classify(&mut state);

            (token, sanitized.snapshot)
        };

        tracing::info!("Critical flush for {} at epoch {}", shared.key, token);
        let result = shared
            .writer
            .upsert(WriteKind::Critical, token, fields.clone())
            .await;

        let mut state = shared.lock();
        let now = shared.now();
        state.schedule.cooldown_until = Some(now + shared.config.cooldown());
        state.critical_in_progress = false;
        if let Err(e) = &result {
            state.stats.critical_failures += 1;
            tracing::warn!("Critical flush for {} failed: {}", shared.key, e);
            // The store still holds the old record. Resend the snapshot as a
            // replacing write once the cooldown ends; newer ingests win.
            state.critical_unsettled = true;
            state.pending.merge_older(fields);
        }
        shared.try_schedule_flush(&mut state, now);
        drop(state);

        result.map_err(SyncError::from)
    }

    /// Hand the unsent state to the teardown transport.
    ///
    /// Sends the pending diff, or the full state if nothing is pending or a
    /// failed critical write still has to replace the stored record. The
    /// buffer is kept, so a flush that still gets to run resends the same
    /// fields. Works after `dispose`.
    pub fn drain(&self) -> Option<DrainPayload> {
        let shared = &self.shared;
        let mut state = shared.lock();
        state.stats.drains += 1;

        let payload = shared.drain.send(
            state.pending.peek(),
            &state.current,
            state.fencing.current(),
            state.critical_unsettled,
        );
        if let Some(payload) = &payload {
            tracing::info!(
                "Drained {} fields for {} ({})",
                payload.fields.len(),
                shared.key,
                if payload.full { "full state" } else { "pending diff" }
            );
        }
        payload
    }

    /// Stop the session's timers. Later updates are ignored.
    ///
    /// A write already in flight still settles.
    pub fn dispose(&self) {
        let mut state = self.shared.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.cancel_timers();
        tracing::info!(
            "Disposed sync session {} for {}",
            self.shared.session_id,
            self.shared.key
        );
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.shared.lock();
        let now = self.shared.now();

        let phase = if state.critical_in_progress {
            EnginePhase::CriticalFlushing
        } else if state.in_flight.is_some() {
            EnginePhase::Flushing
        } else if state.schedule.in_cooldown(now) {
            EnginePhase::Cooldown
        } else if !state.pending.is_empty() {
            EnginePhase::Buffering
        } else {
            EnginePhase::Idle
        };

        SyncStatus {
            session_id: self.shared.session_id,
            phase,
            pending_fields: state.pending.len(),
            in_flight: state.in_flight.is_some(),
            fencing_token: state.fencing.current(),
            since_last_flush: now.saturating_duration_since(state.schedule.last_flush_attempt),
            cooldown_remaining: state.schedule.cooldown_remaining(now),
            disposed: state.disposed,
            stats: state.stats.clone(),
        }
    }

    /// The full merged state.
    pub fn snapshot(&self) -> StateSnapshot {
        self.shared.lock().current.clone()
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    pub fn key(&self) -> &RecordKey {
        &self.shared.key
    }

    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    /// Test and diagnostics control surface.
    pub fn probe(&self) -> EngineProbe<R> {
        EngineProbe::new(Arc::clone(&self.shared))
    }
}

/// Check loaded fields against the schema. Returns false if they must not
/// seed the session.
fn screen(sanitizer: &Sanitizer, key: &RecordKey, source: &str, fields: &StateSnapshot) -> bool {
    match sanitizer.sanitize(fields.clone()) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Ignoring corrupt {} for {}: {}", source, key, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{ChannelDrainTransport, MemoryMirror, MemoryRemoteStore};

    fn remote(epoch: u64, fields: StateSnapshot) -> RemoteRecord {
        RemoteRecord::new(RecordKey::new("p"), epoch, fields)
    }

    #[test]
    fn test_resolve_empty() {
        assert_eq!(InitialState::resolve(None, None), InitialState::default());
    }

    #[test]
    fn test_resolve_newer_remote_wins() {
        let initial = InitialState::resolve(
            Some(remote(3, StateSnapshot::new().with("coins", 0.0))),
            Some(MirroredState::new(2, StateSnapshot::new().with("coins", 900.0))),
        );

        assert_eq!(initial.epoch, 3);
        assert_eq!(initial.current.number("coins"), Some(0.0));
        assert!(initial.pending.is_empty());
    }

    #[test]
    fn test_resolve_mirror_wins_and_queues_difference() {
        let initial = InitialState::resolve(
            Some(remote(
                1,
                StateSnapshot::new().with("coins", 10.0).with("tier", 1.0).with("gems", 4.0),
            )),
            Some(MirroredState::new(
                1,
                StateSnapshot::new().with("coins", 25.0).with("tier", 1.0),
            )),
        );

        assert_eq!(initial.epoch, 1);
        assert_eq!(initial.current.number("coins"), Some(25.0));
        assert_eq!(initial.current.number("gems"), Some(4.0));
        assert_eq!(initial.pending, StateSnapshot::new().with("coins", 25.0));
        assert!(!initial.resend_critical);
    }

    #[test]
    fn test_resolve_mirror_only() {
        let initial = InitialState::resolve(
            None,
            Some(MirroredState::new(2, StateSnapshot::new().with("coins", 5.0))),
        );
        assert_eq!(initial.epoch, 2);
        assert_eq!(initial.pending, StateSnapshot::new().with("coins", 5.0));
        assert!(initial.resend_critical);
    }

    #[test]
    fn test_resolve_newer_mirror_replaces_remote() {
        let initial = InitialState::resolve(
            Some(remote(
                0,
                StateSnapshot::new().with("coins", 500.0).with("gems", 7.0),
            )),
            Some(MirroredState::new(
                1,
                StateSnapshot::new().with("coins", 0.0).with("tier", 1.0),
            )),
        );

        let reset = StateSnapshot::new().with("coins", 0.0).with("tier", 1.0);
        assert_eq!(initial.epoch, 1);
        assert_eq!(initial.current, reset);
        assert_eq!(initial.pending, reset);
        assert!(initial.resend_critical);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let (transport, _rx) = ChannelDrainTransport::new();
        let deps = SyncDeps::new(
            Arc::new(MemoryRemoteStore::new()),
            Arc::new(MemoryMirror::new()),
            Arc::new(transport),
        );

        let result = SyncEngine::new(SyncConfig::default(), deps, InitialState::default());
        assert!(matches!(result, Err(SyncError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_rejects_invalid_config() {
        let (transport, _rx) = ChannelDrainTransport::new();
        let deps = SyncDeps::new(
            Arc::new(MemoryRemoteStore::new()),
            Arc::new(MemoryMirror::new()),
            Arc::new(transport),
        );

        let config = SyncConfig::default().with_idle_delay(std::time::Duration::ZERO);
        let result = SyncEngine::new(config, deps, InitialState::default());
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
