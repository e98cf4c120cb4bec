//! Storage abstractions
//!
//! Four small stores back a synchronization run: staged entities, the
//! distributed lock, the schedule record and the process repository. A
//! backend usually implements all of them.

use crate::domain::entity::SyncEntity;
use crate::domain::ids::{CommandId, ProcessId};
use crate::domain::process::Process;
use crate::domain::sync::{Schedule, SyncLock};
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Entities staged during a run, scoped by process id
#[async_trait]
pub trait TempStore: Send + Sync {
    /// Stores `entity` under `(process_id, key)`
    async fn put(&self, process_id: ProcessId, key: CommandId, entity: &SyncEntity) -> Result<()>;

    /// Keys staged for the process, in staging order
    async fn get_keys(&self, process_id: ProcessId) -> Result<Vec<CommandId>>;

    async fn get(&self, process_id: ProcessId, key: CommandId) -> Result<Option<SyncEntity>>;

    /// Drops everything staged for the process
    async fn clear(&self, process_id: ProcessId) -> Result<()>;
}

/// Keyed lock records with a time to live
#[async_trait]
pub trait LockStore: Send + Sync {
    /// The record under `key`, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<SyncLock>>;

    /// Creates or overwrites the record under `key`
    async fn set(&self, key: &str, lock: &SyncLock, ttl_seconds: u64) -> Result<()>;
}

/// Singleton schedule record
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self) -> Result<Option<Schedule>>;

    async fn set(&self, schedule: &Schedule) -> Result<()>;
}

/// Persisted process state
#[async_trait]
pub trait ProcessRepository: Send + Sync {
    async fn load(&self, id: ProcessId) -> Result<Option<Process>>;

    /// Inserts or replaces the process
    async fn save(&self, process: &Process) -> Result<()>;

    /// Processes without a finish time
    async fn list_unfinished(&self) -> Result<Vec<Process>>;

    /// Most recently created process
    async fn latest(&self) -> Result<Option<Process>>;
}

/// The stores a synchronization needs, usually backed by one backend
#[derive(Clone)]
pub struct Storage {
    pub temp: Arc<dyn TempStore>,
    pub locks: Arc<dyn LockStore>,
    pub schedule: Arc<dyn ScheduleStore>,
    pub processes: Arc<dyn ProcessRepository>,
}

impl Storage {
    /// Uses `backend` for every store
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TempStore + LockStore + ScheduleStore + ProcessRepository + 'static,
    {
        Self {
            temp: backend.clone(),
            locks: backend.clone(),
            schedule: backend.clone(),
            processes: backend,
        }
    }
}
