//! Emergency drain on teardown.

use chrono::Utc;
use progress_model::StateSnapshot;
use std::sync::Arc;
use store::{DrainPayload, DrainTransport, RecordKey};
use uuid::Uuid;

/// Serializes the unsent state and hands it to a teardown transport.
///
/// Nothing is awaited and nothing is retried. The local mirror already holds
/// the same state, so a drain that never lands only costs cross-device
/// freshness.
pub struct EmergencyDrain {
    transport: Arc<dyn DrainTransport>,
    key: RecordKey,
    session_id: Uuid,
}

impl EmergencyDrain {
    pub fn new(transport: Arc<dyn DrainTransport>, key: RecordKey, session_id: Uuid) -> Self {
        Self {
            transport,
            key,
            session_id,
        }
    }

    /// Send the pending diff, or the full state when nothing is pending.
    ///
    /// With `replace` set the full state is sent and marked to replace the
    /// stored record. Returns the payload handed to the transport, or `None`
    /// if it could not be serialized.
    pub fn send(
        &self,
        pending: Option<&StateSnapshot>,
        current: &StateSnapshot,
        epoch: u64,
        replace: bool,
    ) -> Option<DrainPayload> {
        let (fields, full) = match pending {
            Some(diff) if !replace => (diff.clone(), false),
            _ => (current.clone(), true),
        };

        let payload = DrainPayload {
            session_id: self.session_id.to_string(),
            key: self.key.clone(),
            epoch,
            full,
            replace,
            fields,
            sent_at: Utc::now(),
        };

        match payload.to_bytes() {
            Ok(body) => {
                self.transport.send(&self.key, body);
                Some(payload)
            }
            Err(e) => {
                tracing::warn!("Failed to serialize drain for {}: {}", self.key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::ChannelDrainTransport;

    #[test]
    fn test_sends_pending_diff() {
        let (transport, mut rx) = ChannelDrainTransport::new();
        let session_id = Uuid::new_v4();
        let drain = EmergencyDrain::new(Arc::new(transport), RecordKey::new("p"), session_id);

        let pending = StateSnapshot::new().with("coins", 5.0);
        let current = StateSnapshot::new().with("coins", 5.0).with("tier", 2.0);
        drain.send(Some(&pending), &current, 1, false).unwrap();

        let payload = rx.try_recv().unwrap().payload().unwrap();
        assert!(!payload.full);
        assert_eq!(payload.fields, pending);
        assert_eq!(payload.epoch, 1);
        assert_eq!(payload.session_id, session_id.to_string());
    }

    #[test]
    fn test_sends_full_state_when_nothing_pending() {
        let (transport, mut rx) = ChannelDrainTransport::new();
        let drain = EmergencyDrain::new(Arc::new(transport), RecordKey::new("p"), Uuid::new_v4());

        let current = StateSnapshot::new().with("coins", 5.0).with("tier", 2.0);
        drain.send(None, &current, 0, false).unwrap();

        let payload = rx.try_recv().unwrap().payload().unwrap();
        assert!(payload.full);
        assert!(!payload.replace);
        assert_eq!(payload.fields, current);
    }

    #[test]
    fn test_replacing_drain_sends_full_state() {
        let (transport, mut rx) = ChannelDrainTransport::new();
        let drain = EmergencyDrain::new(Arc::new(transport), RecordKey::new("p"), Uuid::new_v4());

        let pending = StateSnapshot::new().with("clicks", 1.0);
        let current = StateSnapshot::new().with("coins", 0.0).with("clicks", 1.0);
        drain.send(Some(&pending), &current, 3, true).unwrap();

        let payload = rx.try_recv().unwrap().payload().unwrap();
        assert!(payload.full);
        assert!(payload.replace);
        assert_eq!(payload.fields, current);
        assert_eq!(payload.to_write_request().kind, store::WriteKind::Critical);
    }
}
