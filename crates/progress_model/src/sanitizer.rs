//! Input sanitization for progress updates.
//!
//! Every update passes through the `Sanitizer` before it touches the pending
//! buffer, the local mirror, or the remote store. A corrupted remote record
//! seeds every future session, so the checks run before anything observable
//! changes.
//!
//! # Rules
//!
//! - A non-finite value (or a value of the wrong shape) in a core field
//!   rejects the entire update.
//! - A non-finite value in a non-core numeric field drops that field only.
//! - Finite numbers beyond the magnitude cap are clamped to the cap.
//! - Negative numbers in unsigned fields are clamped to zero.
//! - Values whose shape does not match a declared non-core field are dropped.
//! - Collections are deduplicated, keeping the first occurrence.

use std::collections::HashSet;

use crate::error::SanitizeError;
use crate::schema::{FieldKind, FieldSpec, SnapshotSchema};
use crate::snapshot::{FieldValue, StateSnapshot};

/// An accepted update together with the repairs applied to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Sanitized {
    /// The repaired update
    pub snapshot: StateSnapshot,
    /// Fields whose numeric value was clamped
    pub clamped: Vec<String>,
    /// Fields removed from the update
    pub dropped: Vec<String>,
}

impl Sanitized {
    /// Check whether the update passed through untouched.
    pub fn is_clean(&self) -> bool {
        self.clamped.is_empty() && self.dropped.is_empty()
    }
}

/// Validates and clamps updates against a `SnapshotSchema`.
#[derive(Clone, Debug)]
pub struct Sanitizer {
    schema: SnapshotSchema,
}

impl Sanitizer {
    /// Create a sanitizer for the given schema.
    pub fn new(schema: SnapshotSchema) -> Self {
        Self { schema }
    }

    /// Get the schema.
    pub fn schema(&self) -> &SnapshotSchema {
        &self.schema
    }

    /// Validate an update.
    ///
    /// Core fields are all checked before any output is built, so a rejected
    /// update never yields a partial result.
    pub fn sanitize(&self, update: StateSnapshot) -> Result<Sanitized, SanitizeError> {
        self.check_core_fields(&update)?;

        let mut sanitized = Sanitized {
            snapshot: StateSnapshot::new(),
            clamped: Vec::new(),
            dropped: Vec::new(),
        };

        for (field, value) in update {
            let spec = self
                .schema
                .spec(&field)
                .copied()
                .unwrap_or_else(|| Self::implicit_spec(&value));

            match self.repair(&spec, value) {
                Repair::Keep(value) => {
                    sanitized.snapshot.insert(field, value);
                }
                Repair::Clamped(value) => {
                    sanitized.clamped.push(field.clone());
                    sanitized.snapshot.insert(field, value);
                }
                Repair::Drop => sanitized.dropped.push(field),
            }
        }

        Ok(sanitized)
    }

    fn check_core_fields(&self, update: &StateSnapshot) -> Result<(), SanitizeError> {
        for (field, value) in update {
            let Some(spec) = self.schema.spec(field).filter(|spec| spec.core) else {
                continue;
            };

            if let FieldValue::Number(n) = value {
                if !n.is_finite() {
                    return Err(SanitizeError::NonFiniteCoreField {
                        field: field.clone(),
                        value: *n,
                    });
                }
            }

            if !Self::shape_matches(&spec.kind, value) {
                return Err(SanitizeError::CoreTypeMismatch {
                    field: field.clone(),
                    expected: spec.kind.expected_name(),
                    found: value.kind_name(),
                });
            }
        }
        Ok(())
    }

    /// Spec assumed for fields the schema does not declare.
    fn implicit_spec(value: &FieldValue) -> FieldSpec {
        match value {
            FieldValue::Number(_) => FieldSpec::progress(),
            FieldValue::Flag(_) => FieldSpec::flag(),
            FieldValue::Collection(_) => FieldSpec::collection(),
            FieldValue::Text(_) => FieldSpec::enumeration(),
        }
    }

    fn shape_matches(kind: &FieldKind, value: &FieldValue) -> bool {
        matches!(
            (kind, value),
            (FieldKind::Progress { .. }, FieldValue::Number(_))
                | (FieldKind::Collection, FieldValue::Collection(_))
                | (FieldKind::Flag, FieldValue::Flag(_))
                | (FieldKind::Enum, FieldValue::Text(_))
        )
    }

    fn repair(&self, spec: &FieldSpec, value: FieldValue) -> Repair {
        if !Self::shape_matches(&spec.kind, &value) {
            return Repair::Drop;
        }

        match (spec.kind, value) {
            (FieldKind::Progress { signed }, FieldValue::Number(n)) => {
                if !n.is_finite() {
                    return Repair::Drop;
                }
                let clamped = self.clamp(n, signed);
                if clamped == n {
                    Repair::Keep(FieldValue::Number(n))
                } else {
                    Repair::Clamped(FieldValue::Number(clamped))
                }
            }
            (_, FieldValue::Collection(ids)) => {
                let mut seen = HashSet::with_capacity(ids.len());
                let unique: Vec<String> =
                    ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
                Repair::Keep(FieldValue::Collection(unique))
            }
            (_, value) => Repair::Keep(value),
        }
    }

    fn clamp(&self, n: f64, signed: bool) -> f64 {
        let cap = self.schema.magnitude_cap;
        let floor = if signed { -cap } else { 0.0 };
        n.max(floor).min(cap)
    }
}

enum Repair {
    Keep(FieldValue),
    Clamped(FieldValue),
    Drop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DEFAULT_MAGNITUDE_CAP;
    use proptest::prelude::*;

    fn make_sanitizer() -> Sanitizer {
        Sanitizer::new(
            SnapshotSchema::new()
                .with_field("coins", FieldSpec::progress().core())
                .with_field("clicks", FieldSpec::progress().core())
                .with_field("tier", FieldSpec::progress().core())
                .with_field("gems", FieldSpec::progress())
                .with_field("net_worth", FieldSpec::signed_progress())
                .with_field("owned", FieldSpec::collection())
                .with_field("auto_active", FieldSpec::flag())
                .with_field("difficulty", FieldSpec::enumeration())
                .with_magnitude_cap(1_000_000.0),
        )
    }

    #[test]
    fn test_clean_update_passes() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new()
            .with("coins", 10.0)
            .with("auto_active", true)
            .with("difficulty", "hard");

        let result = sanitizer.sanitize(update.clone()).unwrap();
        assert!(result.is_clean());
        assert_eq!(result.snapshot, update);
    }

    #[test]
    fn test_non_finite_core_rejects_whole_update() {
        let sanitizer = make_sanitizer();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let update = StateSnapshot::new().with("coins", bad).with("gems", 5.0);
            let err = sanitizer.sanitize(update).unwrap_err();
            assert_eq!(err.field(), "coins");
        }
    }

    #[test]
    fn test_core_type_mismatch_rejects() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new().with("tier", "seven").with("gems", 5.0);

        let err = sanitizer.sanitize(update).unwrap_err();
        assert_eq!(
            err,
            SanitizeError::CoreTypeMismatch {
                field: "tier".to_string(),
                expected: "number",
                found: "text",
            }
        );
    }

    #[test]
    fn test_non_finite_non_core_drops_field_only() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new().with("gems", f64::NAN).with("coins", 3.0);

        let result = sanitizer.sanitize(update).unwrap();
        assert!(!result.snapshot.contains("gems"));
        assert_eq!(result.snapshot.number("coins"), Some(3.0));
        assert_eq!(result.dropped, vec!["gems".to_string()]);
    }

    #[test]
    fn test_clamps_to_cap() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new()
            .with("gems", 5e9)
            .with("coins", 2e6)
            .with("net_worth", -5e9);

        let result = sanitizer.sanitize(update).unwrap();
        assert_eq!(result.snapshot.number("gems"), Some(1_000_000.0));
        assert_eq!(result.snapshot.number("coins"), Some(1_000_000.0));
        assert_eq!(result.snapshot.number("net_worth"), Some(-1_000_000.0));
        assert_eq!(result.clamped.len(), 3);
    }

    #[test]
    fn test_negative_unsigned_clamped_to_zero() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new().with("gems", -4.0).with("net_worth", -4.0);

        let result = sanitizer.sanitize(update).unwrap();
        assert_eq!(result.snapshot.number("gems"), Some(0.0));
        assert_eq!(result.snapshot.number("net_worth"), Some(-4.0));
        assert_eq!(result.clamped, vec!["gems".to_string()]);
    }

    #[test]
    fn test_undeclared_numbers_are_unsigned_progress() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new().with("bonus", -1.0).with("label", "x");

        let result = sanitizer.sanitize(update).unwrap();
        assert_eq!(result.snapshot.number("bonus"), Some(0.0));
        assert!(result.snapshot.contains("label"));
    }

    #[test]
    fn test_non_core_shape_mismatch_dropped() {
        let sanitizer = make_sanitizer();
        let update = StateSnapshot::new().with("owned", 3.0).with("auto_active", "yes");

        let result = sanitizer.sanitize(update).unwrap();
        assert!(result.snapshot.is_empty());
        assert_eq!(result.dropped.len(), 2);
    }

    #[test]
    fn test_collection_deduplicated() {
        let sanitizer = make_sanitizer();
        let owned: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let update = StateSnapshot::new().with("owned", owned);

        let result = sanitizer.sanitize(update).unwrap();
        assert_eq!(
            result.snapshot.get("owned").and_then(FieldValue::as_collection),
            Some(&["b".to_string(), "a".to_string(), "c".to_string()][..])
        );
    }

    fn arb_number() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(f64::MAX),
            -1e20f64..1e20,
        ]
    }

    proptest! {
        #[test]
        fn prop_output_is_finite_and_capped(
            values in prop::collection::btree_map("(coins|gems|net_worth|extra)", arb_number(), 0..4)
        ) {
            let sanitizer = Sanitizer::new(
                SnapshotSchema::new()
                    .with_field("coins", FieldSpec::progress().core())
                    .with_field("gems", FieldSpec::progress())
                    .with_field("net_worth", FieldSpec::signed_progress()),
            );
            let update: StateSnapshot = values
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Number(v)))
                .collect();
            let core_bad = update.number("coins").is_some_and(|n| !n.is_finite());

            match sanitizer.sanitize(update) {
                Ok(result) => {
                    prop_assert!(!core_bad);
                    for (field, value) in &result.snapshot {
                        let n = value.as_number().unwrap();
                        prop_assert!(n.is_finite());
                        prop_assert!(n.abs() <= DEFAULT_MAGNITUDE_CAP);
                        if field != "net_worth" {
                            prop_assert!(n >= 0.0);
                        }
                    }
                }
                Err(_) => prop_assert!(core_bad),
            }
        }
    }
}
