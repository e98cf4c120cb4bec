//! Property-level change sets
//!
//! Updates sent to the destination carry only the properties that actually
//! changed. [`ChangedFields`] is the result of comparing a desired entity with
//! the current destination record, field by field, via the explicit
//! per-model comparators in [`crate::domain::entity`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Ordered set of changed property names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedFields(BTreeSet<String>);

impl ChangedFields {
    /// Creates an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` as changed when `desired != current`
    pub fn compare<T: PartialEq + ?Sized>(&mut self, field: &str, desired: &T, current: &T) {
        if desired != current {
            self.0.insert(field.to_string());
        }
    }

    /// Marks a field as changed unconditionally
    pub fn insert(&mut self, field: impl Into<String>) {
        self.0.insert(field.into());
    }

    /// Whether the given field is part of the change set
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the changed field names in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for ChangedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for ChangedFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_records_only_differences() {
        let mut changed = ChangedFields::new();
        changed.compare("name", "Alice", "Alicia");
        changed.compare("email", &Some("a@x.org"), &Some("a@x.org"));

        assert_eq!(changed.len(), 1);
        assert!(changed.contains("name"));
        assert!(!changed.contains("email"));
    }

    #[test]
    fn test_display_is_sorted() {
        let changed: ChangedFields = ["name", "description"].into_iter().collect();
        assert_eq!(changed.to_string(), "{description, name}");
    }

    #[test]
    fn test_serializes_as_list() {
        let changed: ChangedFields = ["name"].into_iter().collect();
        assert_eq!(serde_json::to_string(&changed).unwrap(), "[\"name\"]");
    }
}
