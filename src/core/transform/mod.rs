//! Source entity conversion
//!
//! Some source systems key entities differently from how they are linked in
//! the destination. A converter reshapes every fetched entity before it is
//! reconciled. Two converters are available:
//!
//! - **lowercase_external_ids**: lowercases the ids issued by the source
//! - **trim_external_ids**: strips surrounding whitespace from those ids
//!
//! Converters only touch external ids of the system being synchronized, on
//! the entity itself and on its related objects, so links of other systems
//! stay intact.

pub mod external_id;

use crate::domain::entity::SyncEntity;
use crate::domain::{Result, SyncError};
use std::str::FromStr;
use std::sync::Arc;

pub use external_id::ExternalIdConverter;

/// Reshapes source entities before reconciliation
pub trait EntityConverter: Send + Sync {
    /// Converts one entity
    fn convert(&self, entity: SyncEntity) -> SyncEntity;

    /// Name used in configuration and logs
    fn name(&self) -> &'static str;
}

/// Converter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    LowercaseExternalIds,
    TrimExternalIds,
}

impl FromStr for ConverterKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lowercase_external_ids" | "lowercase" => Ok(Self::LowercaseExternalIds),
            "trim_external_ids" | "trim" => Ok(Self::TrimExternalIds),
            _ => Err(SyncError::Configuration(format!(
                "Invalid converter: {s}. Expected 'lowercase_external_ids' or 'trim_external_ids'"
            ))),
        }
    }
}

/// Builds the converter named `name` for entities of `system`
///
/// # Errors
///
/// Returns a configuration error for unknown converter names
pub fn converter_for(name: &str, system: &str) -> Result<Arc<dyn EntityConverter>> {
    let kind = ConverterKind::from_str(name)?;
    Ok(Arc::new(ExternalIdConverter::new(kind, system)))
}

/// Applies an optional converter to every entity
pub fn convert_all(
    converter: Option<&Arc<dyn EntityConverter>>,
    entities: Vec<SyncEntity>,
) -> Vec<SyncEntity> {
    match converter {
        Some(converter) => {
            tracing::debug!(
                converter = converter.name(),
                count = entities.len(),
                "Converting source entities"
            );
            entities.into_iter().map(|e| converter.convert(e)).collect()
        }
        None => entities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::User;
    use crate::domain::ids::ExternalId;

    #[test]
    fn test_converter_kind_from_str() {
        assert_eq!(
            ConverterKind::from_str("lowercase_external_ids").unwrap(),
            ConverterKind::LowercaseExternalIds
        );
        assert_eq!(
            ConverterKind::from_str("Trim").unwrap(),
            ConverterKind::TrimExternalIds
        );
        assert!(ConverterKind::from_str("uppercase").is_err());
    }

    #[test]
    fn test_convert_all_without_converter_is_identity() {
        let entities: Vec<SyncEntity> = vec![User::new("alice")
            .with_external_id(ExternalId::new("CN=Alice", "LDAP").unwrap())
            .into()];
        let converted = convert_all(None, entities.clone());
        assert_eq!(converted, entities);
    }

    #[test]
    fn test_convert_all_applies_converter() {
        let converter = converter_for("lowercase_external_ids", "LDAP").unwrap();
        let entities: Vec<SyncEntity> = vec![User::new("alice")
            .with_external_id(ExternalId::new("CN=Alice", "LDAP").unwrap())
            .into()];

        let converted = convert_all(Some(&converter), entities);
        assert_eq!(converted[0].external_id_for("LDAP").unwrap().id, "cn=alice");
    }
}
