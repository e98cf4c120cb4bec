//! Distributed synchronization lock
//!
//! A single keyed record in the lock store guards against concurrent runs.
//! The record expires after its TTL, so a crashed worker cannot block
//! synchronization forever.

use crate::adapters::storage::LockStore;
use crate::domain::sync::{SyncLock, SYNC_LOCK_KEY};
use crate::domain::Result;
use std::sync::Arc;

/// Lock operations of a synchronization worker
pub struct Synchronizer {
    locks: Arc<dyn LockStore>,
    ttl_seconds: u64,
}

impl Synchronizer {
    pub fn new(locks: Arc<dyn LockStore>, ttl_seconds: u64) -> Self {
        Self { locks, ttl_seconds }
    }

    /// Whether no run holds the lock (absent or released)
    pub async fn is_sync_lock_available(&self) -> Result<bool> {
        Ok(self
            .locks
            .get(SYNC_LOCK_KEY)
            .await?
            .map_or(true, |lock| lock.is_released))
    }

    /// Takes the lock
    ///
    /// Returns `false` when the lock is held, and also when the store fails:
    /// a run never starts without a confirmed lock.
    pub async fn try_set_lock(&self) -> bool {
        match self.is_sync_lock_available().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Synchronization lock is held by another run");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read synchronization lock");
                return false;
            }
        }

        match self
            .locks
            .set(SYNC_LOCK_KEY, &SyncLock::held(), self.ttl_seconds)
            .await
        {
            Ok(()) => {
                tracing::debug!(ttl_seconds = self.ttl_seconds, "Acquired synchronization lock");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to acquire synchronization lock");
                false
            }
        }
    }

    /// Releases the lock
    pub async fn release_lock(&self) -> Result<()> {
        self.locks
            .set(SYNC_LOCK_KEY, &SyncLock::released(), self.ttl_seconds)
            .await?;
        tracing::debug!("Released synchronization lock");
        Ok(())
    }
}
