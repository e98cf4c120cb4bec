//! In-memory storage backend

use super::traits::{LockStore, ProcessRepository, ScheduleStore, TempStore};
use crate::domain::entity::SyncEntity;
use crate::domain::ids::{CommandId, ProcessId};
use crate::domain::process::Process;
use crate::domain::sync::{Schedule, SyncLock};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage held in process memory
///
/// Suitable for a single worker; everything is lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    staged: RwLock<HashMap<ProcessId, Vec<(CommandId, SyncEntity)>>>,
    locks: RwLock<HashMap<String, (SyncLock, DateTime<Utc>)>>,
    schedule: RwLock<Option<Schedule>>,
    processes: RwLock<HashMap<ProcessId, Process>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TempStore for MemoryStorage {
    async fn put(&self, process_id: ProcessId, key: CommandId, entity: &SyncEntity) -> Result<()> {
        let mut staged = self.staged.write().await;
        let entries = staged.entry(process_id).or_default();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = entity.clone(),
            None => entries.push((key, entity.clone())),
        }
        Ok(())
    }

    async fn get_keys(&self, process_id: ProcessId) -> Result<Vec<CommandId>> {
        Ok(self
            .staged
            .read()
            .await
            .get(&process_id)
            .map(|entries| entries.iter().map(|(k, _)| *k).collect())
            .unwrap_or_default())
    }

    async fn get(&self, process_id: ProcessId, key: CommandId) -> Result<Option<SyncEntity>> {
        Ok(self.staged.read().await.get(&process_id).and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, e)| e.clone())
        }))
    }

    async fn clear(&self, process_id: ProcessId) -> Result<()> {
        self.staged.write().await.remove(&process_id);
        Ok(())
    }
}

#[async_trait]
impl LockStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<SyncLock>> {
        let locks = self.locks.read().await;
        Ok(locks
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(lock, _)| lock.clone()))
    }

    async fn set(&self, key: &str, lock: &SyncLock, ttl_seconds: u64) -> Result<()> {
        let expires_at = SyncLock::expiry(ttl_seconds)?;
        self.locks
            .write()
            .await
            .insert(key.to_string(), (lock.clone(), expires_at));
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStorage {
    async fn get(&self) -> Result<Option<Schedule>> {
        Ok(self.schedule.read().await.clone())
    }

    async fn set(&self, schedule: &Schedule) -> Result<()> {
        *self.schedule.write().await = Some(schedule.clone());
        Ok(())
    }
}

#[async_trait]
impl ProcessRepository for MemoryStorage {
    async fn load(&self, id: ProcessId) -> Result<Option<Process>> {
        Ok(self.processes.read().await.get(&id).cloned())
    }

    async fn save(&self, process: &Process) -> Result<()> {
        self.processes
            .write()
            .await
            .insert(process.id, process.clone());
        Ok(())
    }

    async fn list_unfinished(&self) -> Result<Vec<Process>> {
        let mut unfinished: Vec<Process> = self
            .processes
            .read()
            .await
            .values()
            .filter(|p| !p.is_finished())
            .cloned()
            .collect();
        unfinished.sort_by_key(|p| p.created_at);
        Ok(unfinished)
    }

    async fn latest(&self) -> Result<Option<Process>> {
        Ok(self
            .processes
            .read()
            .await
            .values()
            .max_by_key(|p| p.created_at)
            .cloned())
    }
}
