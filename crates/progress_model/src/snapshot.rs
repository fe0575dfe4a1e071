//! Field-keyed progress snapshots.
//!
//! A `StateSnapshot` is either a full picture of the player's progress or a
//! partial diff of it. Both use the same type; merging is per field, last
//! write wins.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Value of a single snapshot field.
///
/// Serialized untagged, so a snapshot round-trips as a plain JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag (e.g. whether continuous automation is running)
    Flag(bool),
    /// Numeric progress value (currency, counters, tiers)
    Number(f64),
    /// Set or list of owned identifiers
    Collection(Vec<String>),
    /// Enum or free-form text value
    Text(String),
}

impl FieldValue {
    /// Short name of the value's shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Flag(_) => "flag",
            FieldValue::Number(_) => "number",
            FieldValue::Collection(_) => "collection",
            FieldValue::Text(_) => "text",
        }
    }

    /// Get the numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the flag value, if this is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the identifiers, if this is a collection.
    pub fn as_collection(&self) -> Option<&[String]> {
        match self {
            FieldValue::Collection(ids) => Some(ids),
            _ => None,
        }
    }

    /// Get the text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Collection(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// A mapping of field name to value.
///
/// Fields are kept in a `BTreeMap` so serialized snapshots are stable and
/// two snapshots with the same content serialize to the same bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    fields: BTreeMap<String, FieldValue>,
}

impl StateSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set a field, returning the previous value.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Get a numeric field.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    /// Get a flag field. Absent or non-flag fields read as `false`.
    pub fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(FieldValue::as_flag).unwrap_or(false)
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Check whether a field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the snapshot has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Merge `newer` into this snapshot, last write wins per field.
    ///
    /// Returns the number of fields whose value changed.
    pub fn merge(&mut self, newer: StateSnapshot) -> usize {
        let mut changed = 0;
        for (field, value) in newer.fields {
            match self.fields.entry(field) {
                btree_map::Entry::Occupied(mut slot) => {
                    if *slot.get() != value {
                        slot.insert(value);
                        changed += 1;
                    }
                }
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(value);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Fold an *older* diff under this one.
    ///
    /// Fields already present here are newer and are kept; only fields
    /// missing from this snapshot are taken from `older`.
    pub fn merge_older(&mut self, older: StateSnapshot) {
        for (field, value) in older.fields {
            self.fields.entry(field).or_insert(value);
        }
    }

    /// Fields of this snapshot whose value differs from (or is absent in) `base`.
    pub fn diff_from(&self, base: &StateSnapshot) -> StateSnapshot {
        self.fields
            .iter()
            .filter(|(field, value)| base.get(field) != Some(*value))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

impl FromIterator<(String, FieldValue)> for StateSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StateSnapshot {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a StateSnapshot {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
