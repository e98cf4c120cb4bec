//! In-memory source system

use super::traits::SourceSystem;
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::{Page, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Source system backed by a vector of entities
///
/// Used by tests and demos. Entities without an owning source are attributed
/// to this system when added.
pub struct InMemorySource {
    system_name: String,
    entities: RwLock<Vec<SyncEntity>>,
}

impl InMemorySource {
    pub fn new(system_name: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
            entities: RwLock::new(Vec::new()),
        }
    }

    /// Creates a source holding `entities`
    pub fn with_entities(system_name: impl Into<String>, entities: Vec<SyncEntity>) -> Self {
        let source = Self::new(system_name);
        let entities = entities
            .into_iter()
            .map(|e| source.attribute(e))
            .collect();
        Self {
            entities: RwLock::new(entities),
            ..source
        }
    }

    /// Replaces the content of the source
    pub async fn set_entities(&self, entities: Vec<SyncEntity>) {
        let entities = entities.into_iter().map(|e| self.attribute(e)).collect();
        *self.entities.write().await = entities;
    }

    fn attribute(&self, mut entity: SyncEntity) -> SyncEntity {
        if entity.header().source.is_empty() {
            entity.header_mut().source = self.system_name.clone();
        }
        entity
    }
}

#[async_trait]
impl SourceSystem for InMemorySource {
    fn system_name(&self) -> &str {
        &self.system_name
    }

    fn object_types(&self) -> Vec<ObjectType> {
        ObjectType::ALL.to_vec()
    }

    async fn get_batch(
        &self,
        object_type: ObjectType,
        start: usize,
        batch_size: usize,
    ) -> Result<Page<SyncEntity>> {
        let entities = self.entities.read().await;
        let of_type: Vec<SyncEntity> = entities
            .iter()
            .filter(|e| e.object_type() == object_type)
            .cloned()
            .collect();
        Ok(Page::slice(&of_type, start, batch_size))
    }
}
