//! Teardown drain transports.
//!
//! A drain is the last send a session makes while its host is tearing down.
//! The caller cannot wait for a response, so `DrainTransport::send` returns
//! nothing: delivery is attempted at most once and never acknowledged.

use chrono::{DateTime, Utc};
use progress_model::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::remote::{RecordKey, RemoteStore, WriteKind, WriteRequest};

/// Body of a drain send.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrainPayload {
    /// Session that produced the drain
    pub session_id: String,
    /// Record the fields belong to
    pub key: RecordKey,
    /// Fencing epoch at drain time
    pub epoch: u64,
    /// True when `fields` is the full state rather than the pending diff
    pub full: bool,
    /// True when `fields` must replace the stored record
    #[serde(default)]
    pub replace: bool,
    /// Fields to write
    pub fields: StateSnapshot,
    /// When the drain was issued
    pub sent_at: DateTime<Utc>,
}

impl DrainPayload {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The store write this drain stands for.
    ///
    /// A replacing drain carries a critical snapshot the store has not
    /// accepted yet, so it is written as a critical write.
    pub fn to_write_request(&self) -> WriteRequest {
        let kind = if self.replace {
            WriteKind::Critical
        } else {
            WriteKind::Drain
        };
        WriteRequest::new(kind, self.epoch, self.fields.clone())
    }
}

/// Fire-and-forget send primitive that survives teardown.
pub trait DrainTransport: Send + Sync {
    /// Hand `body` to the transport. No result is observable.
    fn send(&self, key: &RecordKey, body: Vec<u8>);
}

/// A drain handed to a `ChannelDrainTransport`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrainMessage {
    pub key: RecordKey,
    pub body: Vec<u8>,
}

impl DrainMessage {
    /// Decode the body.
    pub fn payload(&self) -> Result<DrainPayload> {
        DrainPayload::from_bytes(&self.body)
    }
}

/// Drain transport that forwards sends into a channel.
///
/// The receiver lives outside the session, the way a host keeps a keepalive
/// request alive after the page that issued it is gone.
#[derive(Debug, Clone)]
pub struct ChannelDrainTransport {
    tx: mpsc::UnboundedSender<DrainMessage>,
}

impl ChannelDrainTransport {
    /// Create a transport and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DrainMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DrainTransport for ChannelDrainTransport {
    fn send(&self, key: &RecordKey, body: Vec<u8>) {
        let message = DrainMessage {
            key: key.clone(),
            body,
        };
        if self.tx.send(message).is_err() {
            tracing::debug!("Drain receiver gone, dropping drain for {}", key);
        }
    }
}

/// Drain transport that writes straight to a `RemoteStore`.
///
/// Each send becomes a detached upsert task on the given runtime. Nobody
/// awaits it; failures are only logged.
pub struct StoreBeacon<R: RemoteStore + 'static> {
    store: Arc<R>,
    runtime: Handle,
}

impl<R: RemoteStore + 'static> StoreBeacon<R> {
    pub fn new(store: Arc<R>, runtime: Handle) -> Self {
        Self { store, runtime }
    }
}

impl<R: RemoteStore + 'static> DrainTransport for StoreBeacon<R> {
    fn send(&self, key: &RecordKey, body: Vec<u8>) {
        let payload = match DrainPayload::from_bytes(&body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Dropping undecodable drain for {}: {}", key, e);
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let key = key.clone();
        self.runtime.spawn(async move {
            if let Err(e) = store.upsert(&key, payload.to_write_request()).await {
                tracing::warn!("Drain write for {} failed: {}", key, e);
            }
        });
    }
}
