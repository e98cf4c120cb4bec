//! Lookup filters
//!
//! A [`Filter`] is a boolean predicate tree over entity fields. Destinations
//! that can query remotely receive it serialized as JSON; in-process stores
//! evaluate it with [`Filter::matches`]. [`KeyProperties`] pairs a filter with
//! the external id it was built from and an optional post filter for
//! conditions the query layer cannot express.

use super::entity::SyncEntity;
use super::ids::ExternalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Comparison operator of a field condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Field equals the first value
    Equals,
    /// Field equals the first value, ignoring case
    EqualsIgnoreCase,
    /// Field contains the first value as a substring
    Contains,
    /// Field equals any of the values
    In,
}

/// Boolean predicate tree over entity fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Field condition
    Condition {
        field: String,
        operator: FilterOperator,
        values: Vec<String>,
    },
    /// Entity carries the given external id
    ExternalId(ExternalId),
    /// Entity carries an external id of the given source system
    LinkedTo { source: String },
    /// All sub-filters match (an empty list matches everything)
    And { filters: Vec<Filter> },
    /// Any sub-filter matches (an empty list matches nothing)
    Or { filters: Vec<Filter> },
    /// Sub-filter does not match
    Not { filter: Box<Filter> },
}

impl Filter {
    /// `field == value`
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Condition {
            field: field.into(),
            operator: FilterOperator::Equals,
            values: vec![value.into()],
        }
    }

    /// `field == value`, case-insensitive
    pub fn equals_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Condition {
            field: field.into(),
            operator: FilterOperator::EqualsIgnoreCase,
            values: vec![value.into()],
        }
    }

    /// `field` contains `value`
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Condition {
            field: field.into(),
            operator: FilterOperator::Contains,
            values: vec![value.into()],
        }
    }

    /// Entities owned by `system`
    pub fn owned_by(system: impl Into<String>) -> Self {
        Filter::equals_ignore_case("source", system)
    }

    /// Entities owned by `system` or linked to it by an external id
    pub fn managed_by(system: impl Into<String>) -> Self {
        let system = system.into();
        Filter::owned_by(system.clone()).or(Filter::LinkedTo { source: system })
    }

    /// Combines two filters with OR, flattening nested ORs
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or { mut filters } => {
                filters.push(other);
                Filter::Or { filters }
            }
            first => Filter::Or {
                filters: vec![first, other],
            },
        }
    }

    /// Combines two filters with AND, flattening nested ANDs
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            first => Filter::And {
                filters: vec![first, other],
            },
        }
    }

    /// Negates the filter
    pub fn negate(self) -> Self {
        Filter::Not {
            filter: Box::new(self),
        }
    }

    /// Evaluates the filter against an entity
    pub fn matches(&self, entity: &SyncEntity) -> bool {
        match self {
            Filter::Condition {
                field,
                operator,
                values,
            } => {
                let Some(actual) = entity.field(field) else {
                    return false;
                };
                match operator {
                    FilterOperator::Equals => values.first().is_some_and(|v| actual == v),
                    FilterOperator::EqualsIgnoreCase => values
                        .first()
                        .is_some_and(|v| actual.to_lowercase() == v.to_lowercase()),
                    FilterOperator::Contains => {
                        values.first().is_some_and(|v| actual.contains(v.as_str()))
                    }
                    FilterOperator::In => values.iter().any(|v| actual == v),
                }
            }
            Filter::ExternalId(ext) => entity
                .external_ids()
                .iter()
                .any(|e| e.id == ext.id && e.belongs_to(&ext.source)),
            Filter::LinkedTo { source } => {
                entity.external_ids().iter().any(|e| e.belongs_to(source))
            }
            Filter::And { filters } => filters.iter().all(|f| f.matches(entity)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(entity)),
            Filter::Not { filter } => !filter.matches(entity),
        }
    }
}

/// Predicate applied to query results after the destination returned them
pub type PostFilter = Arc<dyn Fn(&SyncEntity) -> bool + Send + Sync>;

/// Lookup key for one source entity
#[derive(Clone)]
pub struct KeyProperties {
    /// Current-system external id of the entity being looked up
    pub external_id: ExternalId,

    /// Query filter
    pub filter: Filter,

    /// Optional predicate applied after querying
    pub post_filter: Option<PostFilter>,
}

impl KeyProperties {
    /// Key matching the external id only
    pub fn new(external_id: ExternalId) -> Self {
        Self {
            filter: Filter::ExternalId(external_id.clone()),
            external_id,
            post_filter: None,
        }
    }

    /// Replaces the query filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the post filter
    pub fn with_post_filter(mut self, post_filter: PostFilter) -> Self {
        self.post_filter = Some(post_filter);
        self
    }

    /// Drops query results rejected by the post filter
    pub fn apply_post_filter(&self, entities: Vec<SyncEntity>) -> Vec<SyncEntity> {
        match &self.post_filter {
            Some(post) => entities.into_iter().filter(|e| post(e)).collect(),
            None => entities,
        }
    }

    /// Query filter and post filter both accept the entity
    pub fn matches(&self, entity: &SyncEntity) -> bool {
        self.filter.matches(entity) && self.post_filter.as_ref().map_or(true, |p| p(entity))
    }
}

impl fmt::Debug for KeyProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProperties")
            .field("external_id", &self.external_id)
            .field("filter", &self.filter)
            .field("post_filter", &self.post_filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Group, User};

    fn ldap(id: &str) -> ExternalId {
        ExternalId::new(id, "LDAP").unwrap()
    }

    #[test]
    fn test_external_id_filter() {
        let user: SyncEntity = User::new("alice").with_external_id(ldap("E1")).into();
        assert!(Filter::ExternalId(ExternalId::new("E1", "ldap").unwrap()).matches(&user));
        assert!(!Filter::ExternalId(ldap("E2")).matches(&user));
    }

    #[test]
    fn test_condition_operators() {
        let group: SyncEntity = Group::new("Engineering").into();

        assert!(Filter::equals("name", "Engineering").matches(&group));
        assert!(!Filter::equals("name", "engineering").matches(&group));
        assert!(Filter::equals_ignore_case("name", "engineering").matches(&group));
        assert!(Filter::contains("name", "gineer").matches(&group));
        assert!(Filter::Condition {
            field: "name".to_string(),
            operator: FilterOperator::In,
            values: vec!["Sales".to_string(), "Engineering".to_string()],
        }
        .matches(&group));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let group: SyncEntity = Group::new("Engineering").into();
        assert!(!Filter::equals("email", "x").matches(&group));
        assert!(!Filter::equals("display_name", "x").matches(&group));
    }

    #[test]
    fn test_boolean_combinators() {
        let user: SyncEntity = User::new("alice")
            .with_email("alice@example.org")
            .with_external_id(ldap("E1"))
            .into();

        let by_ext_or_mail =
            Filter::ExternalId(ldap("E9")).or(Filter::equals("email", "alice@example.org"));
        assert!(by_ext_or_mail.matches(&user));

        let both = Filter::ExternalId(ldap("E9")).and(Filter::equals("email", "alice@example.org"));
        assert!(!both.matches(&user));
        assert!(both.negate().matches(&user));
    }

    #[test]
    fn test_or_flattens() {
        let f = Filter::equals("a", "1")
            .or(Filter::equals("b", "2"))
            .or(Filter::equals("c", "3"));
        match f {
            Filter::Or { filters } => assert_eq!(filters.len(), 3),
            other => panic!("unexpected filter {other:?}"),
        }
    }

    #[test]
    fn test_managed_by_includes_linked_entities() {
        let created: SyncEntity = User::new("a").with_source("LDAP").into();
        let linked: SyncEntity = User::new("b")
            .with_source("Maverick")
            .with_external_id(ldap("E2"))
            .into();
        let manual: SyncEntity = User::new("c").with_source("Maverick").into();

        let filter = Filter::managed_by("ldap");
        assert!(filter.matches(&created));
        assert!(filter.matches(&linked));
        assert!(!filter.matches(&manual));
        assert!(!Filter::owned_by("LDAP").matches(&linked));
    }

    #[test]
    fn test_filter_serializes_tagged() {
        let f = Filter::owned_by("LDAP").and(Filter::ExternalId(ldap("E1")));
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "and");
        assert_eq!(json["filters"][0]["type"], "condition");
        assert_eq!(json["filters"][1]["type"], "external_id");
        assert_eq!(json["filters"][1]["source"], "LDAP");

        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_key_properties_post_filter() {
        let key = KeyProperties::new(ldap("E1"))
            .with_filter(Filter::contains("name", "ng"))
            .with_post_filter(Arc::new(|e: &SyncEntity| e.label().starts_with('E')));

        let kept = key.apply_post_filter(vec![
            Group::new("Engineering").into(),
            Group::new("Ring").into(),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label(), "Engineering");
        assert!(key.matches(&Group::new("Engineering").into()));
        assert!(!key.matches(&Group::new("Ring").into()));
    }
}
