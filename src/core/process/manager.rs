//! Process manager for run persistence
//!
//! Creates synchronization processes from the configured entity list, persists
//! them through a [`ProcessRepository`] and serves as the checkpoint callback
//! of the reconciliation engines.

use crate::adapters::storage::ProcessRepository;
use crate::config::SyncSettings;
use crate::domain::ids::ProcessId;
use crate::domain::process::{Process, ProcessBuilder, StepKind};
use crate::domain::{Result, SyncError};
use async_trait::async_trait;
use std::sync::Arc;

/// Persists the state of a running process
///
/// Implementations must be idempotent: engines call `save` after every phase
/// and every few entities.
#[async_trait]
pub trait ProcessCheckpoint: Send + Sync {
    async fn save(&self, process: &Process) -> Result<()>;
}

/// Refreshes the activity timestamp and saves the process
///
/// A failed checkpoint is logged and does not interrupt the run: the next
/// checkpoint carries the same state.
pub async fn save_checkpoint(process: &mut Process, checkpoint: &dyn ProcessCheckpoint) {
    process.touch();
    if let Err(e) = checkpoint.save(process).await {
        tracing::warn!(
            process_id = %process.id,
            error = %e,
            "Failed to checkpoint process"
        );
    }
}

/// Process manager
pub struct ProcessManager {
    repository: Arc<dyn ProcessRepository>,
}

impl ProcessManager {
    /// Create a new ProcessManager with a process repository
    pub fn new(repository: Arc<dyn ProcessRepository>) -> Self {
        Self { repository }
    }

    /// Creates and saves a process for `system`
    ///
    /// The process holds one entity step per configured object type, in
    /// configuration order, followed by one relation step per object type
    /// with relation operations.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown operation names, or the
    /// repository error.
    pub async fn create(&self, system: &str, settings: &SyncSettings) -> Result<Process> {
        let mut builder = ProcessBuilder::new(system);

        for entity in &settings.entities {
            let operations = entity
                .entity_operations()
                .map_err(SyncError::Configuration)?;
            builder = builder.step(StepKind::Entities(entity.object_type), operations);
        }
        for entity in &settings.entities {
            let operations = entity
                .relation_operations()
                .map_err(SyncError::Configuration)?;
            if !operations.is_nothing() {
                builder = builder.step(StepKind::Relations(entity.object_type), operations);
            }
        }

        let process = builder.build();
        self.repository.save(&process).await?;

        tracing::info!(
            process_id = %process.id,
            correlation_id = %process.correlation_id,
            system = %process.system,
            steps = process.steps.len(),
            "Created synchronization process"
        );

        Ok(process)
    }

    pub async fn load(&self, id: ProcessId) -> Result<Option<Process>> {
        self.repository.load(id).await
    }

    /// The most recently created process
    pub async fn latest(&self) -> Result<Option<Process>> {
        self.repository.latest().await
    }

    pub async fn list_unfinished(&self) -> Result<Vec<Process>> {
        self.repository.list_unfinished().await
    }

    /// Aborts every unfinished process left behind by earlier runs
    ///
    /// Returns the ids of the aborted processes.
    pub async fn abort_unfinished(&self, reason: &str) -> Result<Vec<ProcessId>> {
        let mut aborted = Vec::new();

        for mut process in self.repository.list_unfinished().await? {
            process.abort(reason);
            self.repository.save(&process).await?;
            tracing::warn!(
                process_id = %process.id,
                created_at = %process.created_at,
                reason,
                "Aborted unfinished process"
            );
            aborted.push(process.id);
        }

        Ok(aborted)
    }
}

#[async_trait]
impl ProcessCheckpoint for ProcessManager {
    async fn save(&self, process: &Process) -> Result<()> {
        tracing::debug!(
            process_id = %process.id,
            status = %process.status,
            "Checkpointing process"
        );
        self.repository.save(process).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::config::EntitySyncConfig;
    use crate::domain::entity::ObjectType;
    use crate::domain::process::{ProcessStatus, StepStatus, SyncOperations};

    fn settings() -> SyncSettings {
        let toml = r#"
            [[entities]]
            object_type = "group"
            operations = ["all"]
            relations = ["add", "delete"]

            [[entities]]
            object_type = "user"
            operations = ["add", "update"]
        "#;
        toml::from_str(toml).unwrap()
    }

    fn manager() -> (ProcessManager, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        (ProcessManager::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_create_orders_entity_steps_before_relation_steps() {
        let (manager, _) = manager();
        let process = manager.create("LDAP", &settings()).await.unwrap();

        let kinds: Vec<StepKind> = process.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Entities(ObjectType::Group),
                StepKind::Entities(ObjectType::User),
                StepKind::Relations(ObjectType::Group),
            ]
        );
        assert_eq!(process.steps[1].operations, SyncOperations::ADD | SyncOperations::UPDATE);
        assert!(manager.load(process.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_operations() {
        let (manager, _) = manager();
        let mut settings = settings();
        settings.entities.push(EntitySyncConfig {
            object_type: ObjectType::Role,
            operations: vec!["merge".to_string()],
            relations: Vec::new(),
        });

        let err = manager.create("LDAP", &settings).await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_abort_unfinished() {
        let (manager, _) = manager();
        let stale = manager.create("LDAP", &settings()).await.unwrap();
        let mut done = manager.create("LDAP", &settings()).await.unwrap();
        for step in &mut done.steps {
            step.mark_completed();
        }
        done.mark_finished();
        manager.save(&done).await.unwrap();

        let aborted = manager.abort_unfinished("superseded").await.unwrap();
        assert_eq!(aborted, vec![stale.id]);

        let reloaded = manager.load(stale.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, ProcessStatus::Aborted);
        assert!(reloaded
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Aborted));
        assert!(manager.list_unfinished().await.unwrap().is_empty());
    }
}
