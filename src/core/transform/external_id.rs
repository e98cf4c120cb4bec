//! External id reshaping converters

use super::{ConverterKind, EntityConverter};
use crate::domain::entity::SyncEntity;
use crate::domain::ids::ExternalId;

/// Rewrites the external ids issued by one source system
pub struct ExternalIdConverter {
    kind: ConverterKind,
    system: String,
}

impl ExternalIdConverter {
    pub fn new(kind: ConverterKind, system: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
        }
    }

    fn reshape(&self, external_id: &mut ExternalId) {
        if !external_id.belongs_to(&self.system) {
            return;
        }
        let reshaped = match self.kind {
            ConverterKind::LowercaseExternalIds => external_id.id.to_lowercase(),
            ConverterKind::TrimExternalIds => external_id.id.trim().to_string(),
        };
        // A blank result would break the join key
        if !reshaped.is_empty() {
            external_id.id = reshaped;
        }
    }
}

impl EntityConverter for ExternalIdConverter {
    fn convert(&self, mut entity: SyncEntity) -> SyncEntity {
        let header = entity.header_mut();
        for external_id in &mut header.external_ids {
            self.reshape(external_id);
        }
        for relation in &mut header.related_objects {
            if let Some(external_id) = relation.external_id.as_mut() {
                self.reshape(external_id);
            }
        }
        entity
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ConverterKind::LowercaseExternalIds => "lowercase_external_ids",
            ConverterKind::TrimExternalIds => "trim_external_ids",
        }
    }
}
