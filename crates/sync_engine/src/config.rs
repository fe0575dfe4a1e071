//! Sync engine configuration.

use progress_model::SnapshotSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use store::RecordKey;

use crate::error::{SyncError, SyncResult};

/// Timing and identity settings for a sync session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Identity the progress record is keyed by
    pub record_key: String,
    /// Cadence between routine flushes (milliseconds)
    pub base_interval_ms: u64,
    /// Wider cadence used while continuous automation is active (milliseconds)
    pub automation_interval_ms: u64,
    /// Quiet time after the last mutation before an idle flush (milliseconds)
    pub idle_delay_ms: u64,
    /// Window after a critical flush during which normal flushes wait (milliseconds)
    pub cooldown_ms: u64,
    /// Flag field that marks continuous automation
    pub automation_flag: String,
    /// Field declarations used by the sanitizer
    pub schema: SnapshotSchema,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            record_key: "local-player".to_string(),
            base_interval_ms: 5000,
            automation_interval_ms: 15000,
            idle_delay_ms: 3000,
            cooldown_ms: 2000,
            automation_flag: "auto_active".to_string(),
            schema: SnapshotSchema::default(),
        }
    }
}

impl SyncConfig {
    /// Create a config for the given record key.
    pub fn new(record_key: impl Into<String>) -> Self {
        Self {
            record_key: record_key.into(),
            ..Default::default()
        }
    }

    /// Load a config from a JSON file.
    ///
    /// A missing file yields the defaults. A file that fails to parse is
    /// logged and also yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<SyncConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("Failed to parse sync config, using defaults: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Set the record key.
    pub fn with_record_key(mut self, key: impl Into<String>) -> Self {
        self.record_key = key.into();
        self
    }

    /// Set the base cadence.
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the cadence used during continuous automation.
    pub fn with_automation_interval(mut self, interval: Duration) -> Self {
        self.automation_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the idle delay.
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the post-critical cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    /// Set the automation flag field.
    pub fn with_automation_flag(mut self, field: impl Into<String>) -> Self {
        self.automation_flag = field.into();
        self
    }

    /// Set the field schema.
    pub fn with_schema(mut self, schema: SnapshotSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.record_key.clone())
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn automation_interval(&self) -> Duration {
        Duration::from_millis(self.automation_interval_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Check the config for values the engine cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.record_key.is_empty() {
            return Err(SyncError::Config("record key must not be empty".to_string()));
        }

        let intervals = [
            ("base interval", self.base_interval_ms),
            ("automation interval", self.automation_interval_ms),
            ("idle delay", self.idle_delay_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(SyncError::Config(format!("{} must be positive", name)));
        }

        self.schema.validate()?;
        Ok(())
    }
}
