//! PostgreSQL row models
//!
//! Processes and staged entities are stored as JSONB documents next to the
//! columns the queries filter on.

use crate::domain::entity::SyncEntity;
use crate::domain::process::Process;
use crate::domain::sync::{Schedule, SyncLock};
use crate::domain::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use uuid::Uuid;

/// Row of the `sync_processes` table
#[derive(Debug, Clone)]
pub struct ProcessRow {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub system: String,
    pub status: String,
    pub state: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessRow {
    pub fn from_domain(process: &Process) -> Result<Self> {
        Ok(Self {
            id: *process.id.as_uuid(),
            correlation_id: *process.correlation_id.as_uuid(),
            system: process.system.clone(),
            status: process.status.to_string(),
            state: serde_json::to_value(process)?,
            created_at: process.created_at,
            updated_at: process.updated_at,
            finished_at: process.finished_at,
        })
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: try_get(row, "id")?,
            correlation_id: try_get(row, "correlation_id")?,
            system: try_get(row, "system")?,
            status: try_get(row, "status")?,
            state: try_get(row, "state")?,
            created_at: try_get(row, "created_at")?,
            updated_at: try_get(row, "updated_at")?,
            finished_at: try_get(row, "finished_at")?,
        })
    }

    /// The persisted state document is authoritative
    pub fn to_domain(&self) -> Result<Process> {
        Ok(serde_json::from_value(self.state.clone())?)
    }
}

/// Decodes a staged entity document
pub fn staged_entity_from_row(row: &Row) -> Result<SyncEntity> {
    let entity: Value = try_get(row, "entity")?;
    Ok(serde_json::from_value(entity)?)
}

pub fn lock_from_row(row: &Row) -> Result<SyncLock> {
    Ok(SyncLock {
        is_released: try_get(row, "is_released")?,
        updated_at: try_get(row, "updated_at")?,
    })
}

pub fn schedule_from_row(row: &Row) -> Result<Schedule> {
    let interval: i64 = try_get(row, "interval_seconds")?;
    Ok(Schedule {
        enabled: try_get(row, "enabled")?,
        interval_seconds: u64::try_from(interval).map_err(|_| {
            SyncError::Storage(format!("Invalid schedule interval {interval}"))
        })?,
        updated_at: try_get(row, "updated_at")?,
    })
}

fn try_get<'a, T>(row: &'a Row, column: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| SyncError::Storage(format!("Failed to read column '{column}': {e}")))
}
