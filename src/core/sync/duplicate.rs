//! Near-duplicate detection rules
//!
//! External systems key entities differently than the destination, so a
//! lookup by external id alone would miss records that exist but were never
//! linked (created manually, or by another system). [`DuplicateRules`]
//! widens the lookup with domain-specific predicates:
//!
//! - groups and organizations: name and display name, by equality or
//!   containment, optionally ignoring case
//! - users: e-mail address (unique across users)
//! - roles and functions: name equality
//!
//! Candidates already linked to a different id of the same source system are
//! removed by the post filter: they are another object of that system.

use crate::config::DuplicateDetectionConfig;
use crate::domain::entity::SyncEntity;
use crate::domain::filter::{Filter, KeyProperties, PostFilter};
use crate::domain::ids::ExternalId;
use std::sync::Arc;

/// Lookup key builder
#[derive(Debug, Clone)]
pub struct DuplicateRules {
    config: DuplicateDetectionConfig,
}

impl DuplicateRules {
    pub fn new(config: DuplicateDetectionConfig) -> Self {
        Self { config }
    }

    /// Builds the lookup key of `entity` linked by `external_id`
    pub fn key_for(&self, entity: &SyncEntity, external_id: &ExternalId) -> KeyProperties {
        let by_external_id = Filter::ExternalId(external_id.clone());
        let candidates = self
            .near_duplicate_conditions(entity)
            .into_iter()
            .fold(by_external_id, Filter::or);

        let filter = Filter::equals("object_type", entity.object_type().as_str()).and(candidates);

        KeyProperties::new(external_id.clone())
            .with_filter(filter)
            .with_post_filter(self.post_filter(entity, external_id))
    }

    fn near_duplicate_conditions(&self, entity: &SyncEntity) -> Vec<Filter> {
        let mut conditions = Vec::new();
        match entity {
            SyncEntity::Group(_) | SyncEntity::Organization(_) => {
                if self.config.match_names {
                    conditions.extend(self.name_conditions("name", entity.field("name")));
                }
                if self.config.match_display_names {
                    conditions.extend(
                        self.name_conditions("display_name", entity.field("display_name")),
                    );
                }
            }
            SyncEntity::User(user) => {
                if self.config.unique_email {
                    if let Some(email) = user.email.as_deref().filter(|e| !e.trim().is_empty()) {
                        conditions.push(Filter::equals_ignore_case("email", email.trim()));
                    }
                }
            }
            SyncEntity::Role(_) | SyncEntity::Function(_) => {
                if self.config.match_role_names {
                    conditions.extend(self.equality("name", entity.field("name")));
                }
            }
        }
        conditions
    }

    fn equality(&self, field: &str, value: Option<&str>) -> Option<Filter> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        Some(if self.config.ignore_case {
            Filter::equals_ignore_case(field, value)
        } else {
            Filter::equals(field, value)
        })
    }

    fn name_conditions(&self, field: &str, value: Option<&str>) -> Vec<Filter> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Vec::new();
        };
        if !self.config.containment {
            return self.equality(field, Some(value)).into_iter().collect();
        }

        // The query layer has no case-insensitive containment; ask for the
        // common spellings and let the post filter settle the rest.
        let mut conditions = vec![Filter::contains(field, value)];
        if self.config.ignore_case {
            let lower = value.to_lowercase();
            if lower != value {
                conditions.push(Filter::contains(field, lower));
            }
            conditions.push(Filter::equals_ignore_case(field, value));
        }
        conditions
    }

    fn post_filter(&self, entity: &SyncEntity, external_id: &ExternalId) -> PostFilter {
        let own = external_id.clone();
        let names: Vec<(String, String)> = if self.config.containment {
            ["name", "display_name"]
                .iter()
                .filter_map(|f| entity.field(f).map(|v| (f.to_string(), v.trim().to_string())))
                .filter(|(_, v)| !v.is_empty())
                .collect()
        } else {
            Vec::new()
        };
        let ignore_case = self.config.ignore_case;

        Arc::new(move |candidate: &SyncEntity| {
            match candidate.external_id_for(&own.source) {
                Some(linked) if linked.id == own.id => return true,
                Some(_) => return false,
                None => {}
            }
            if names.is_empty() {
                return true;
            }
            // Containment candidates must pass the case rule as well; other
            // near-duplicate conditions have been exact already.
            let contained = names.iter().any(|(field, value)| {
                candidate.field(field).is_some_and(|actual| {
                    if ignore_case {
                        actual.to_lowercase().contains(&value.to_lowercase())
                    } else {
                        actual.contains(value.as_str())
                    }
                })
            });
            contained || !matches!(candidate, SyncEntity::Group(_) | SyncEntity::Organization(_))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Group, Role, User};
    use test_case::test_case;

    fn ldap(id: &str) -> ExternalId {
        ExternalId::new(id, "LDAP").unwrap()
    }

    fn rules(containment: bool, ignore_case: bool) -> DuplicateRules {
        DuplicateRules::new(DuplicateDetectionConfig {
            containment,
            ignore_case,
            ..Default::default()
        })
    }

    fn candidates(key: &KeyProperties, stored: Vec<SyncEntity>) -> Vec<String> {
        let matched: Vec<SyncEntity> = stored.into_iter().filter(|e| key.filter.matches(e)).collect();
        key.apply_post_filter(matched)
            .iter()
            .map(|e| e.label().to_string())
            .collect()
    }

    #[test_case(false, false, "Engineering", true ; "exact name")]
    #[test_case(false, false, "engineering", false ; "case differs")]
    #[test_case(false, true, "engineering", true ; "case ignored")]
    #[test_case(true, false, "Engineering Team", true ; "contained")]
    #[test_case(true, true, "engineering team", true ; "contained ignoring case")]
    #[test_case(true, false, "Sales", false ; "unrelated")]
    fn test_group_name_rules(containment: bool, ignore_case: bool, stored: &str, found: bool) {
        let source: SyncEntity = Group::new("Engineering").into();
        let key = rules(containment, ignore_case).key_for(&source, &ldap("E1"));

        let result = candidates(&key, vec![Group::new(stored).into()]);
        assert_eq!(!result.is_empty(), found);
    }

    #[test]
    fn test_external_id_always_matches() {
        let source: SyncEntity = Group::new("Engineering").into();
        let key = rules(false, false).key_for(&source, &ldap("E1"));

        let result = candidates(
            &key,
            vec![Group::new("Renamed").with_external_id(ldap("E1")).into()],
        );
        assert_eq!(result, vec!["Renamed"]);
    }

    #[test]
    fn test_candidates_linked_elsewhere_are_dropped() {
        let source: SyncEntity = Group::new("Engineering").into();
        let key = rules(false, true).key_for(&source, &ldap("E1"));

        let result = candidates(
            &key,
            vec![
                Group::new("Engineering").with_external_id(ldap("E2")).into(),
                Group::new("engineering")
                    .with_external_id(ExternalId::new("X", "Workday").unwrap())
                    .into(),
            ],
        );
        assert_eq!(result, vec!["engineering"]);
    }

    #[test]
    fn test_object_type_is_part_of_the_key() {
        let source: SyncEntity = Group::new("Admins").into();
        let key = rules(false, true).key_for(&source, &ldap("E1"));

        let result = candidates(&key, vec![Role::new("Admins").into()]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_user_email_uniqueness() {
        let source: SyncEntity = User::new("alice").with_email("Alice@Example.org").into();
        let key = rules(false, true).key_for(&source, &ldap("E1"));

        let result = candidates(
            &key,
            vec![
                User::new("a.smith").with_email("alice@example.org").into(),
                User::new("bob").with_email("bob@example.org").into(),
            ],
        );
        assert_eq!(result, vec!["a.smith"]);
    }
}
