//! Time source for scheduling decisions.

use tokio::time::Instant;

/// Source of the current time.
///
/// Timers are driven by tokio, so implementations must return instants on
/// the tokio clock. A timer that fires early by this clock is simply
/// re-armed.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by `tokio::time::Instant::now`.
///
/// Follows tokio's paused test clock when time is paused.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
