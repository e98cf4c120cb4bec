//! PostgreSQL storage implementing every store trait

use crate::adapters::postgresql::client::PostgresClient;
use crate::adapters::postgresql::models::{
    lock_from_row, schedule_from_row, staged_entity_from_row, ProcessRow,
};
use crate::adapters::storage::{LockStore, ProcessRepository, ScheduleStore, TempStore};
use crate::domain::entity::SyncEntity;
use crate::domain::ids::{CommandId, ProcessId};
use crate::domain::process::Process;
use crate::domain::sync::{Schedule, SyncLock};
use crate::domain::{Result, SyncError};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// PostgreSQL storage backend
pub struct PostgresStorage {
    client: Arc<PostgresClient>,
}

impl PostgresStorage {
    pub fn new(client: PostgresClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }
}

#[async_trait]
impl TempStore for PostgresStorage {
    async fn put(&self, process_id: ProcessId, key: CommandId, entity: &SyncEntity) -> Result<()> {
        let document = serde_json::to_value(entity)?;
        let object_type = entity.object_type().to_string();

        self.client
            .execute(
                r#"
                INSERT INTO sync_staged_entities (process_id, command_id, object_type, entity)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (process_id, command_id) DO UPDATE SET
                    object_type = EXCLUDED.object_type,
                    entity = EXCLUDED.entity
                "#,
                &[
                    process_id.as_uuid(),
                    key.as_uuid(),
                    &object_type,
                    &document,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_keys(&self, process_id: ProcessId) -> Result<Vec<CommandId>> {
        let rows = self
            .client
            .query(
                "SELECT command_id FROM sync_staged_entities WHERE process_id = $1 ORDER BY seq",
                &[process_id.as_uuid()],
            )
            .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, Uuid>("command_id")
                    .map(CommandId::from_uuid)
                    .map_err(|e| SyncError::Storage(format!("Invalid staged key: {e}")))
            })
            .collect()
    }

    async fn get(&self, process_id: ProcessId, key: CommandId) -> Result<Option<SyncEntity>> {
        let rows = self
            .client
            .query(
                "SELECT entity FROM sync_staged_entities WHERE process_id = $1 AND command_id = $2",
                &[process_id.as_uuid(), key.as_uuid()],
            )
            .await?;

        rows.first().map(staged_entity_from_row).transpose()
    }

    async fn clear(&self, process_id: ProcessId) -> Result<()> {
        let removed = self
            .client
            .execute(
                "DELETE FROM sync_staged_entities WHERE process_id = $1",
                &[process_id.as_uuid()],
            )
            .await?;
        tracing::debug!(process_id = %process_id, removed, "Cleared staged entities");
        Ok(())
    }
}

#[async_trait]
impl LockStore for PostgresStorage {
    async fn get(&self, key: &str) -> Result<Option<SyncLock>> {
        let rows = self
            .client
            .query(
                "SELECT is_released, updated_at FROM sync_locks WHERE key = $1 AND expires_at > NOW()",
                &[&key],
            )
            .await?;

        rows.first().map(lock_from_row).transpose()
    }

    async fn set(&self, key: &str, lock: &SyncLock, ttl_seconds: u64) -> Result<()> {
        let expires_at = SyncLock::expiry(ttl_seconds)?;

        self.client
            .execute(
                r#"
                INSERT INTO sync_locks (key, is_released, updated_at, expires_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (key) DO UPDATE SET
                    is_released = EXCLUDED.is_released,
                    updated_at = EXCLUDED.updated_at,
                    expires_at = EXCLUDED.expires_at
                "#,
                &[&key, &lock.is_released, &lock.updated_at, &expires_at],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for PostgresStorage {
    async fn get(&self) -> Result<Option<Schedule>> {
        let rows = self
            .client
            .query(
                "SELECT enabled, interval_seconds, updated_at FROM sync_schedule WHERE id = 1",
                &[],
            )
            .await?;

        rows.first().map(schedule_from_row).transpose()
    }

    async fn set(&self, schedule: &Schedule) -> Result<()> {
        let interval = i64::try_from(schedule.interval_seconds).map_err(|_| {
            SyncError::Validation(format!(
                "Schedule interval {} is out of range",
                schedule.interval_seconds
            ))
        })?;

        self.client
            .execute(
                r#"
                INSERT INTO sync_schedule (id, enabled, interval_seconds, updated_at)
                VALUES (1, $1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET
                    enabled = EXCLUDED.enabled,
                    interval_seconds = EXCLUDED.interval_seconds,
                    updated_at = EXCLUDED.updated_at
                "#,
                &[&schedule.enabled, &interval, &schedule.updated_at],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProcessRepository for PostgresStorage {
    async fn load(&self, id: ProcessId) -> Result<Option<Process>> {
        let rows = self
            .client
            .query("SELECT * FROM sync_processes WHERE id = $1", &[id.as_uuid()])
            .await?;

        rows.first()
            .map(|row| ProcessRow::from_row(row)?.to_domain())
            .transpose()
    }

    async fn save(&self, process: &Process) -> Result<()> {
        let row = ProcessRow::from_domain(process)?;

        self.client
            .execute(
                r#"
                INSERT INTO sync_processes (
                    id, correlation_id, system, status, state,
                    created_at, updated_at, finished_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    state = EXCLUDED.state,
                    updated_at = EXCLUDED.updated_at,
                    finished_at = EXCLUDED.finished_at
                "#,
                &[
                    &row.id,
                    &row.correlation_id,
                    &row.system,
                    &row.status,
                    &row.state,
                    &row.created_at,
                    &row.updated_at,
                    &row.finished_at,
                ],
            )
            .await?;

        tracing::debug!(process_id = %process.id, status = %process.status, "Saved process");
        Ok(())
    }

    async fn list_unfinished(&self) -> Result<Vec<Process>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM sync_processes WHERE finished_at IS NULL ORDER BY created_at",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| ProcessRow::from_row(row)?.to_domain())
            .collect()
    }

    async fn latest(&self) -> Result<Option<Process>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM sync_processes ORDER BY created_at DESC LIMIT 1",
                &[],
            )
            .await?;

        rows.first()
            .map(|row| ProcessRow::from_row(row)?.to_domain())
            .transpose()
    }
}
