//! Field classification for progress snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ModelError, ModelResult};

/// Largest magnitude any numeric progress field may hold (2^53 - 1).
///
/// Beyond this, `f64` can no longer represent every integer, so counters
/// stop incrementing correctly.
pub const DEFAULT_MAGNITUDE_CAP: f64 = 9_007_199_254_740_991.0;

/// Shape of a declared field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Numeric progress field; unsigned fields are clamped to zero from below
    Progress { signed: bool },
    /// Set or list of owned identifiers
    Collection,
    /// Boolean flag
    Flag,
    /// Enumerated text value
    Enum,
}

impl FieldKind {
    /// Name of the value shape this kind expects.
    pub fn expected_name(&self) -> &'static str {
        match self {
            FieldKind::Progress { .. } => "number",
            FieldKind::Collection => "collection",
            FieldKind::Flag => "flag",
            FieldKind::Enum => "text",
        }
    }
}

/// Declaration of one snapshot field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Value shape
    pub kind: FieldKind,
    /// Whether corruption of this field invalidates the whole update
    #[serde(default)]
    pub core: bool,
}

impl FieldSpec {
    /// Non-negative numeric progress field.
    pub fn progress() -> Self {
        Self {
            kind: FieldKind::Progress { signed: false },
            core: false,
        }
    }

    /// Numeric progress field that may go negative.
    pub fn signed_progress() -> Self {
        Self {
            kind: FieldKind::Progress { signed: true },
            core: false,
        }
    }

    /// Collection of owned identifiers.
    pub fn collection() -> Self {
        Self {
            kind: FieldKind::Collection,
            core: false,
        }
    }

    /// Boolean flag.
    pub fn flag() -> Self {
        Self {
            kind: FieldKind::Flag,
            core: false,
        }
    }

    /// Enumerated text value.
    pub fn enumeration() -> Self {
        Self {
            kind: FieldKind::Enum,
            core: false,
        }
    }

    /// Mark this field as core.
    pub fn core(mut self) -> Self {
        self.core = true;
        self
    }
}

fn default_magnitude_cap() -> f64 {
    DEFAULT_MAGNITUDE_CAP
}

/// Declared fields of a progress record.
///
/// Numeric fields that are not declared are treated as non-core,
/// non-negative progress fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSchema {
    /// Magnitude cap applied to every numeric field
    #[serde(default = "default_magnitude_cap")]
    pub magnitude_cap: f64,
    /// Declared fields by name
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

impl Default for SnapshotSchema {
    fn default() -> Self {
        Self {
            magnitude_cap: DEFAULT_MAGNITUDE_CAP,
            fields: BTreeMap::new(),
        }
    }
}

impl SnapshotSchema {
    /// Create an empty schema with the default cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field.
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Set the magnitude cap.
    pub fn with_magnitude_cap(mut self, cap: f64) -> Self {
        self.magnitude_cap = cap;
        self
    }

    /// Look up a declared field.
    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Check whether a field is core.
    pub fn is_core(&self, name: &str) -> bool {
        self.spec(name).is_some_and(|spec| spec.core)
    }

    /// Names of the core fields.
    pub fn core_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.core)
            .map(|(name, _)| name.as_str())
    }

    /// Check the schema for consistency.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.magnitude_cap.is_finite() || self.magnitude_cap <= 0.0 {
            return Err(ModelError::InvalidSchema(format!(
                "magnitude cap must be finite and positive, got {}",
                self.magnitude_cap
            )));
        }
        if let Some((name, _)) = self.fields.iter().find(|(name, _)| name.is_empty()) {
            return Err(ModelError::InvalidSchema(format!(
                "field name must not be empty: {:?}",
                name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clicker_schema() -> SnapshotSchema {
        SnapshotSchema::new()
            .with_field("coins", FieldSpec::progress().core())
            .with_field("clicks", FieldSpec::progress().core())
            .with_field("tier", FieldSpec::progress().core())
            .with_field("balance_delta", FieldSpec::signed_progress())
            .with_field("owned", FieldSpec::collection())
            .with_field("auto_active", FieldSpec::flag())
    }

    #[test]
    fn test_core_fields() {
        let schema = clicker_schema();
        let core: Vec<&str> = schema.core_fields().collect();
        assert_eq!(core, vec!["clicks", "coins", "tier"]);
        assert!(schema.is_core("coins"));
        assert!(!schema.is_core("owned"));
        assert!(!schema.is_core("undeclared"));
    }

    #[test]
    fn test_validate() {
        assert!(clicker_schema().validate().is_ok());

        let bad = SnapshotSchema::new().with_magnitude_cap(f64::INFINITY);
        assert!(matches!(bad.validate(), Err(ModelError::InvalidSchema(_))));

        let bad = SnapshotSchema::new().with_magnitude_cap(0.0);
        assert!(bad.validate().is_err());

        let bad = SnapshotSchema::new().with_field("", FieldSpec::flag());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_schema_json() {
        let json = r#"{
            "fields": {
                "coins": {"kind": {"type": "progress", "signed": false}, "core": true},
                "owned": {"kind": {"type": "collection"}}
            }
        }"#;

        let schema: SnapshotSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.magnitude_cap, DEFAULT_MAGNITUDE_CAP);
        assert_eq!(schema.spec("coins"), Some(&FieldSpec::progress().core()));
        assert_eq!(schema.spec("owned"), Some(&FieldSpec::collection()));
    }
}
