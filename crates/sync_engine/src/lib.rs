//! Sync Engine - buffered, fenced propagation of progress state
//!
//! This crate moves a rapidly mutating, single-writer progress state to a
//! slower remote store:
//!
//! - Updates are sanitized, mirrored locally on every mutation, and
//!   coalesced into a pending buffer.
//! - Flushes go out on an adaptive cadence, or after an idle delay when
//!   mutations stop.
//! - Critical flushes advance a fencing token so that no older write can
//!   overwrite them, locally or at the store.
//! - On teardown the unsent state is drained through a fire-and-forget
//!   transport.
//!
//! # Example
//!
//! ```ignore
//! let engine = SyncEngine::open(config, deps).await?;
//! engine.ingest(StateSnapshot::new().with("coins", 12.0));
//! engine.critical_flush(reset_snapshot).await?;
//! engine.drain();
//! ```

mod clock;
mod config;
mod drain;
mod engine;
mod error;
mod fencing;
mod pending;
mod probe;
mod schedule;
mod status;
mod writer;

pub use clock::{Clock, TokioClock};
pub use config::SyncConfig;
pub use drain::EmergencyDrain;
pub use engine::{InFlightFlush, InitialState, SyncDeps, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use fencing::FencingController;
pub use pending::PendingBuffer;
pub use probe::EngineProbe;
pub use schedule::{FlushDecision, FlushSchedule};
pub use status::{EnginePhase, SyncStats, SyncStatus};
pub use writer::RemoteWriter;
