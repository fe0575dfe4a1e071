//! Fencing token for invalidating superseded flushes.

/// Monotonic token advanced only by critical flushes.
///
/// A normal flush captures the token when it is dispatched. If the token has
/// moved on by the time the write settles, the result is discarded. The
/// token is also sent to the store as the write's epoch so the store can
/// refuse writes from older epochs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FencingController {
    token: u64,
}

impl FencingController {
    /// Start at `epoch`, the highest epoch already known to the store or mirror.
    pub fn seeded(epoch: u64) -> Self {
        Self { token: epoch }
    }

    pub fn current(&self) -> u64 {
        self.token
    }

    /// Advance the token and return the new value.
    pub fn advance(&mut self) -> u64 {
        self.token += 1;
        self.token
    }

    /// Check whether a captured token is still current.
    pub fn is_current(&self, captured: u64) -> bool {
        self.token == captured
    }
}
