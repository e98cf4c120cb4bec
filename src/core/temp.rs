//! Staged entities of a running process
//!
//! The entity engine stages every entity it reconciled, keyed by a fresh
//! command id. The relation engine reads them back to build the current
//! relation graph. Everything is scoped by process id and cleared after the
//! run.

use crate::adapters::storage::TempStore;
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::ids::{CommandId, ProcessId};
use crate::domain::Result;
use std::sync::Arc;

/// Temp store access for one process
#[derive(Clone)]
pub struct ProcessTempHandler {
    store: Arc<dyn TempStore>,
    process_id: ProcessId,
}

impl ProcessTempHandler {
    pub fn new(store: Arc<dyn TempStore>, process_id: ProcessId) -> Self {
        Self { store, process_id }
    }

    /// Stages `entity` under a new command id
    pub async fn stage(&self, entity: &SyncEntity) -> Result<CommandId> {
        let key = CommandId::new();
        self.store.put(self.process_id, key, entity).await?;
        Ok(key)
    }

    /// Every staged entity, in staging order
    pub async fn load_all(&self) -> Result<Vec<SyncEntity>> {
        let keys = self.store.get_keys(self.process_id).await?;
        let mut entities = Vec::with_capacity(keys.len());

        for key in keys {
            match self.store.get(self.process_id, key).await? {
                Some(entity) => entities.push(entity),
                None => tracing::debug!(key = %key, "Staged entity vanished"),
            }
        }

        Ok(entities)
    }

    /// Staged entities of one object type
    pub async fn load_of_type(&self, object_type: ObjectType) -> Result<Vec<SyncEntity>> {
        let mut entities = self.load_all().await?;
        entities.retain(|e| e.object_type() == object_type);
        Ok(entities)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(self.process_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::domain::entity::{Group, User};

    #[tokio::test]
    async fn test_stage_and_load_by_type() {
        let storage = Arc::new(MemoryStorage::default());
        let handler = ProcessTempHandler::new(storage.clone(), ProcessId::new());
        let other = ProcessTempHandler::new(storage, ProcessId::new());

        handler.stage(&User::new("alice").into()).await.unwrap();
        handler.stage(&Group::new("Engineering").into()).await.unwrap();
        handler.stage(&User::new("bob").into()).await.unwrap();
        other.stage(&User::new("carol").into()).await.unwrap();

        let users = handler.load_of_type(ObjectType::User).await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.label()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        handler.clear().await.unwrap();
        assert!(handler.load_all().await.unwrap().is_empty());
        assert_eq!(other.load_all().await.unwrap().len(), 1);
    }
}
