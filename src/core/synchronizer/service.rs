//! Synchronization service
//!
//! Entry point for starting runs and reporting their status. A run is only
//! started under the distributed lock; processes left unfinished by earlier
//! runs are aborted first.

use super::coordinator::SyncCoordinator;
use super::lock::Synchronizer;
use super::summary::SyncSummary;
use crate::adapters::factory::{create_destination, create_source, create_storage, Destination};
use crate::adapters::source::SourceSystem;
use crate::adapters::storage::Storage;
use crate::config::SyncConfig;
use crate::core::process::ProcessManager;
use crate::core::relation::RelationHandler;
use crate::core::sync::{DuplicateRules, EntityProcessor, EntityProcessorSettings};
use crate::core::transform::converter_for;
use crate::domain::process::Process;
use crate::domain::sync::SyncStatus;
use crate::domain::{Result, SyncError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Starts synchronization runs for one source system
pub struct SynchronizationService {
    config: SyncConfig,
    synchronizer: Synchronizer,
    processes: Arc<ProcessManager>,
    coordinator: SyncCoordinator,
}

impl SynchronizationService {
    /// Wires the service from adapters
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown converter name.
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn SourceSystem>,
        destination: Destination,
        storage: Storage,
    ) -> Result<Self> {
        let system = config.source.system_name.clone();
        let settings = &config.sync;

        let mut entities = EntityProcessor::new(
            source,
            destination.clone(),
            storage.temp.clone(),
            DuplicateRules::new(config.duplicate_detection.clone()),
            EntityProcessorSettings {
                system: system.clone(),
                batch_size: settings.batch_size,
                checkpoint_every: settings.checkpoint_every,
            },
        );
        if let Some(name) = &config.source.converter {
            entities = entities.with_converter(converter_for(name, &system)?);
        }

        let relations = RelationHandler::new(
            destination,
            storage.temp.clone(),
            system,
            settings.batch_size,
        );
        let processes = Arc::new(ProcessManager::new(storage.processes.clone()));
        let coordinator = SyncCoordinator::new(
            entities,
            relations,
            processes.clone(),
            storage.temp.clone(),
            Duration::from_secs(settings.status_interval_seconds),
        );

        Ok(Self {
            synchronizer: Synchronizer::new(storage.locks.clone(), settings.lock_ttl_seconds),
            processes,
            coordinator,
            config,
        })
    }

    /// Wires the service from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter cannot be created.
    pub async fn from_config(config: SyncConfig) -> Result<Self> {
        let source = create_source(&config);
        let destination = create_destination(&config)?;
        let storage = create_storage(&config).await?;
        Self::new(config, source, destination, storage)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn processes(&self) -> &ProcessManager {
        &self.processes
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    /// Runs one synchronization
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Lock`] when another run holds the lock or the
    /// lock cannot be taken, and storage errors raised before the run starts.
    /// Step failures do not make this fail: they are reported in the
    /// summary.
    pub async fn start(&self, cancel: watch::Receiver<bool>) -> Result<SyncSummary> {
        if !self.synchronizer.is_sync_lock_available().await? {
            return Err(SyncError::Lock(
                "A synchronization is already running".to_string(),
            ));
        }

        let aborted = self
            .processes
            .abort_unfinished("Superseded by a new synchronization run")
            .await?;
        if !aborted.is_empty() {
            tracing::warn!(count = aborted.len(), "Aborted unfinished processes");
        }

        if !self.synchronizer.try_set_lock().await {
            return Err(SyncError::Lock(
                "Failed to acquire the synchronization lock".to_string(),
            ));
        }

        let outcome = self.run_locked(&cancel).await;

        if let Err(e) = self.synchronizer.release_lock().await {
            crate::log_error_with_context!(e, "releasing the synchronization lock");
        }
        outcome
    }

    async fn run_locked(&self, cancel: &watch::Receiver<bool>) -> Result<SyncSummary> {
        let mut process = self
            .processes
            .create(&self.config.source.system_name, &self.config.sync)
            .await?;
        self.coordinator.run(&mut process, cancel).await
    }

    /// Whether a synchronization is running, and whether it looks stuck
    ///
    /// A run is stuck when an unfinished process has shown no activity for
    /// longer than `sync.stuck_timeout_seconds`.
    pub async fn get_sync_status(&self) -> Result<SyncStatus> {
        let unfinished = self.processes.list_unfinished().await?;
        let timeout = chrono::Duration::seconds(
            i64::try_from(self.config.sync.stuck_timeout_seconds).unwrap_or(i64::MAX / 1000),
        );
        let now = Utc::now();

        if unfinished.iter().any(|p| p.is_stale(timeout, now)) {
            return Ok(SyncStatus::Stuck);
        }
        if !unfinished.is_empty() || !self.synchronizer.is_sync_lock_available().await? {
            return Ok(SyncStatus::Running);
        }
        Ok(SyncStatus::NotRunning)
    }

    /// The most recent process, for status reporting
    pub async fn latest_process(&self) -> Result<Option<Process>> {
        self.processes.latest().await
    }
}
