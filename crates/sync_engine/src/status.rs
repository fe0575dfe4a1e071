//! Engine status reporting.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Where the engine is in its flush cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// Nothing buffered, nothing in flight
    #[default]
    Idle,
    /// Changes buffered, waiting for cadence or idle
    Buffering,
    /// A normal flush is in flight
    Flushing,
    /// A critical flush is in flight
    CriticalFlushing,
    /// Normal flushes are held back after a critical flush
    Cooldown,
}

impl EnginePhase {
    pub fn label(&self) -> &'static str {
        match self {
            EnginePhase::Idle => "Idle",
            EnginePhase::Buffering => "Buffering",
            EnginePhase::Flushing => "Flushing",
            EnginePhase::CriticalFlushing => "Critical flush",
            EnginePhase::Cooldown => "Cooldown",
        }
    }
}

/// Counters kept over the life of an engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Updates accepted by the sanitizer
    pub ingested: u64,
    /// Updates rejected as a whole
    pub rejected: u64,
    pub flushes_dispatched: u64,
    pub flushes_succeeded: u64,
    /// Normal flushes whose diff was re-merged after a transport failure
    pub flushes_failed: u64,
    /// Normal flush results discarded because the token or store epoch moved on
    pub stale_discards: u64,
    pub critical_flushes: u64,
    pub critical_failures: u64,
    pub drains: u64,
}

/// Snapshot of the engine's state for display and diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncStatus {
    pub session_id: Uuid,
    pub phase: EnginePhase,
    /// Number of buffered fields
    pub pending_fields: usize,
    /// Whether a normal flush is in flight
    pub in_flight: bool,
    pub fencing_token: u64,
    /// Time since the last normal flush settled
    pub since_last_flush: Duration,
    pub cooldown_remaining: Option<Duration>,
    pub disposed: bool,
    pub stats: SyncStats,
}

impl SyncStatus {
    /// Check whether any accepted change has not reached the store yet.
    pub fn has_unsynced_changes(&self) -> bool {
        self.pending_fields > 0 || self.in_flight
    }

    /// Format the time since the last flush for display.
    pub fn formatted_since_last_flush(&self) -> String {
        let seconds = self.since_last_flush.as_secs();
        if seconds < 60 {
            format!("{}s ago", seconds)
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }
}
