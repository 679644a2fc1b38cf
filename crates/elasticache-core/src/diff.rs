//! Field-level configuration diffs
//!
//! The caller (an infrastructure-as-code engine) tells the core which fields
//! changed through the [`ResourceDiff`] trait. [`ConfigDiff`] is the map-backed
//! implementation used by callers that hold plain values, and by tests.
//!
//! `changed` is reported independently of the values, so a diff can claim a
//! change where old and new are equal. Planners only act on fields where both
//! hold: the field is changed and the values differ.

use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Narrow view of an old/new configuration pair
pub trait ResourceDiff {
    /// Whether the supplier reports a change for `field`
    fn changed(&self, field: &str) -> bool;

    /// Old and new values; `Value::Null` when unset
    fn values(&self, field: &str) -> (Value, Value);

    /// Mark `field` as requiring the resource to be replaced
    fn force_replacement(&mut self, field: &str);

    /// Whether the resource is being created in this operation
    fn is_new_resource(&self) -> bool;
}

/// A field whose value actually changed
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

impl FieldChange {
    /// Old value decoded as `T`, `None` when unset
    pub fn old_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        decode(&self.field, &self.old)
    }

    /// New value decoded as `T`, `None` when unset
    pub fn new_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        decode(&self.field, &self.new)
    }
}

/// Typed helpers over any [`ResourceDiff`]
pub trait DiffExt: ResourceDiff {
    /// The change for `field`, if it is reported changed and the values differ
    fn change(&self, field: &str) -> Option<FieldChange> {
        if !self.changed(field) {
            return None;
        }
        let (old, new) = self.values(field);
        if old == new {
            return None;
        }
        Some(FieldChange {
            field: field.to_string(),
            old,
            new,
        })
    }

    /// Returns true if any of `fields` has a real change
    fn has_any_change(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.change(f).is_some())
    }

    /// Desired value of `field` regardless of whether it changed
    fn new_value<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        let (_, new) = self.values(field);
        decode(field, &new)
    }

    /// Previous value of `field` regardless of whether it changed
    fn old_value<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        let (old, _) = self.values(field);
        decode(field, &old)
    }
}

impl<D: ResourceDiff + ?Sized> DiffExt for D {}

fn decode<T: DeserializeOwned>(field: &str, value: &Value) -> Result<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|e| CoreError::Validation(format!("field {field}: {e}")))
}

#[derive(Debug, Clone, PartialEq)]
struct FieldState {
    old: Value,
    new: Value,
    changed: bool,
}

/// Map-backed [`ResourceDiff`]
///
/// # Example
///
/// ```rust
/// use elasticache_core::diff::{ConfigDiff, DiffExt};
///
/// let diff = ConfigDiff::new()
///     .with_change("replicas_per_node_group", 2, 4)
///     .with_spurious_change("engine_version", "7.1");
///
/// assert!(diff.change("replicas_per_node_group").is_some());
/// assert!(diff.change("engine_version").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDiff {
    fields: BTreeMap<String, FieldState>,
    new_resource: bool,
    replacements: BTreeSet<String>,
}

impl ConfigDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff for a resource created in this operation
    pub fn for_new_resource() -> Self {
        Self {
            new_resource: true,
            ..Self::default()
        }
    }

    /// A reported change from `old` to `new`
    #[must_use]
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Self {
        self.fields.insert(
            field.into(),
            FieldState {
                old: old.into(),
                new: new.into(),
                changed: true,
            },
        );
        self
    }

    /// A field set for the first time
    #[must_use]
    pub fn with_added(self, field: impl Into<String>, new: impl Into<Value>) -> Self {
        self.with_change(field, Value::Null, new)
    }

    /// A field that was set and is now unset
    #[must_use]
    pub fn with_removed(self, field: impl Into<String>, old: impl Into<Value>) -> Self {
        self.with_change(field, old, Value::Null)
    }

    /// A change reported for a field whose value did not change
    #[must_use]
    pub fn with_spurious_change(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.fields.insert(
            field.into(),
            FieldState {
                old: value.clone(),
                new: value,
                changed: true,
            },
        );
        self
    }

    /// A field carried along without a change
    #[must_use]
    pub fn with_unchanged(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.fields.insert(
            field.into(),
            FieldState {
                old: value.clone(),
                new: value,
                changed: false,
            },
        );
        self
    }

    /// Fields marked as requiring replacement
    pub fn replacement_fields(&self) -> impl Iterator<Item = &str> {
        self.replacements.iter().map(String::as_str)
    }
}

impl ResourceDiff for ConfigDiff {
    fn changed(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|f| f.changed)
    }

    fn values(&self, field: &str) -> (Value, Value) {
        self.fields
            .get(field)
            .map(|f| (f.old.clone(), f.new.clone()))
            .unwrap_or((Value::Null, Value::Null))
    }

    fn force_replacement(&mut self, field: &str) {
        self.replacements.insert(field.to_string());
    }

    fn is_new_resource(&self) -> bool {
        self.new_resource
    }
}

/// Set difference over string lists: (added, removed), each sorted
pub fn string_set_delta(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let old: BTreeSet<&String> = old.iter().collect();
    let new: BTreeSet<&String> = new.iter().collect();
    let added = new.difference(&old).map(|s| (*s).clone()).collect();
    let removed = old.difference(&new).map(|s| (*s).clone()).collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_filters_equal_values() {
        let diff = ConfigDiff::new()
            .with_spurious_change("node_type", "cache.t3.small")
            .with_unchanged("description", "x")
            .with_change("num_cache_clusters", 2, 3);

        assert!(diff.changed("node_type"));
        assert!(diff.change("node_type").is_none());
        assert!(diff.change("description").is_none());
        assert!(diff.change("missing").is_none());

        let change = diff.change("num_cache_clusters").unwrap();
        assert_eq!(change.old_as::<i64>().unwrap(), Some(2));
        assert_eq!(change.new_as::<i64>().unwrap(), Some(3));
    }

    #[test]
    fn test_added_field_has_null_old() {
        let diff = ConfigDiff::new().with_added("engine_version", "7.1");
        let change = diff.change("engine_version").unwrap();
        assert_eq!(change.old_as::<String>().unwrap(), None);
        assert_eq!(change.new, json!("7.1"));
    }

    #[test]
    fn test_decode_mismatch_is_validation_error() {
        let diff = ConfigDiff::new().with_change("num_node_groups", "two", "three");
        let err = diff.change("num_node_groups").unwrap().new_as::<i32>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_force_replacement_is_recorded() {
        let mut diff = ConfigDiff::new();
        diff.force_replacement("engine_version");
        assert_eq!(diff.replacement_fields().collect::<Vec<_>>(), vec!["engine_version"]);
    }

    #[test]
    fn test_string_set_delta() {
        let old = vec!["a".to_string(), "b".to_string()];
        let new = vec!["b".to_string(), "c".to_string(), "d".to_string()];
        let (added, removed) = string_set_delta(&old, &new);
        assert_eq!(added, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(removed, vec!["a".to_string()]);
    }
}
