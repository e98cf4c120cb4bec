//! Write side of the Maverick destination

use crate::adapters::destination::{CommandPublisher, DestinationWrite};
use crate::core::relation::RelationDispatcher;
use crate::domain::command::{CommandResult, RelationProcessingObject, SyncCommand};
use crate::domain::diff::ChangedFields;
use crate::domain::entity::SyncEntity;
use crate::domain::errors::SyncError;
use crate::domain::ids::{CommandId, CorrelationId};
use crate::domain::relation::Relation;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns reconciliation decisions into commands for a publisher
pub struct MaverickDestination {
    publisher: Arc<dyn CommandPublisher>,
    dispatcher: RelationDispatcher,
}

impl MaverickDestination {
    pub fn new(publisher: Arc<dyn CommandPublisher>) -> Self {
        Self {
            dispatcher: RelationDispatcher::new(publisher.clone()),
            publisher,
        }
    }
}

#[async_trait]
impl DestinationWrite for MaverickDestination {
    async fn create(
        &self,
        entity: &SyncEntity,
        correlation_id: CorrelationId,
    ) -> Result<CommandResult> {
        self.publisher
            .publish(SyncCommand::Create {
                command_id: CommandId::new(),
                correlation_id,
                entity: entity.clone(),
            })
            .await
    }

    async fn update(
        &self,
        entity: &SyncEntity,
        changed_fields: &ChangedFields,
        correlation_id: CorrelationId,
    ) -> Result<CommandResult> {
        if entity.id().is_none() {
            return Err(SyncError::Validation(format!(
                "Cannot update {} '{}' without a destination id",
                entity.object_type(),
                entity.label()
            )));
        }

        self.publisher
            .publish(SyncCommand::Update {
                command_id: CommandId::new(),
                correlation_id,
                entity: entity.clone(),
                changed_fields: changed_fields.clone(),
            })
            .await
    }

    async fn delete(
        &self,
        entities: Vec<SyncEntity>,
        correlation_id: CorrelationId,
    ) -> Result<Vec<CommandResult>> {
        let mut results = Vec::with_capacity(entities.len());

        for entity in entities {
            let command_id = CommandId::new();
            let Some(id) = entity.id().cloned() else {
                results.push(CommandResult::failed(
                    command_id,
                    format!("{} '{}' has no destination id", entity.object_type(), entity.label()),
                ));
                continue;
            };

            let command = SyncCommand::Delete {
                command_id,
                correlation_id,
                object_type: entity.object_type(),
                id,
            };
            match self.publisher.publish(command).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(
                        entity = entity.label(),
                        error = %e,
                        "Delete command failed"
                    );
                    results.push(CommandResult::failed(command_id, e.to_string()));
                }
            }
        }

        Ok(results)
    }

    async fn handle_relations(
        &self,
        added: Vec<Relation>,
        removed: Vec<Relation>,
        correlation_id: CorrelationId,
    ) -> Result<Vec<RelationProcessingObject>> {
        Ok(self
            .dispatcher
            .dispatch(added, removed, correlation_id)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::destination::InMemoryDestination;
    use crate::domain::entity::User;
    use crate::domain::ids::MaverickId;

    #[tokio::test]
    async fn test_delete_reports_each_entity() {
        let store = Arc::new(InMemoryDestination::new());
        let kept = store.insert(User::new("alice").into()).await;
        let destination = MaverickDestination::new(store.clone());

        let results = destination
            .delete(
                vec![
                    User::new("alice").with_id(kept.clone()).into(),
                    User::new("ghost").with_id(MaverickId::generate()).into(),
                    User::new("no-id").into(),
                ],
                CorrelationId::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(!results[2].success);
        assert!(store.get(&kept).await.is_none());
    }

    #[tokio::test]
    async fn test_update_requires_destination_id() {
        let destination = MaverickDestination::new(Arc::new(InMemoryDestination::new()));
        let err = destination
            .update(
                &User::new("alice").into(),
                &ChangedFields::new(),
                CorrelationId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
