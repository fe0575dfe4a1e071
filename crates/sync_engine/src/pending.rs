//! Buffer of field changes not yet dispatched to the remote store.

use progress_model::StateSnapshot;

/// Accumulated diff since the last dispatch.
///
/// The buffer is created lazily by the first mutation after a dispatch and
/// is taken whole when a flush is dispatched, so mutations that arrive while
/// a write is in flight start a fresh buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingBuffer {
    diff: Option<StateSnapshot>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `diff`, or an empty one if `diff` is empty.
    pub fn with_diff(diff: StateSnapshot) -> Self {
        let mut buffer = Self::new();
        buffer.merge(diff);
        buffer
    }

    /// Merge a newer update, last write wins per field.
    pub fn merge(&mut self, update: StateSnapshot) {
        if update.is_empty() {
            return;
        }
        self.diff.get_or_insert_with(StateSnapshot::new).merge(update);
    }

    /// Fold a failed flush's diff back in under any newer changes.
    pub fn merge_older(&mut self, older: StateSnapshot) {
        if older.is_empty() {
            return;
        }
        self.diff.get_or_insert_with(StateSnapshot::new).merge_older(older);
    }

    /// Take the buffered diff, leaving the buffer empty.
    pub fn take(&mut self) -> Option<StateSnapshot> {
        self.diff.take()
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.diff = None;
    }

    /// Get the buffered diff without taking it.
    pub fn peek(&self) -> Option<&StateSnapshot> {
        self.diff.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.diff.is_none()
    }

    /// Number of buffered fields.
    pub fn len(&self) -> usize {
        self.diff.as_ref().map_or(0, StateSnapshot::len)
    }
}
