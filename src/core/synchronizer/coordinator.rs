//! Sync coordinator - runs the steps of a process
//!
//! Steps run strictly in order. Entity steps go to the [`EntityProcessor`],
//! relation steps to the [`RelationHandler`]. A failed entity step aborts the
//! relation step of the same object type, which depends on its staged
//! output. While the run is active a background task logs its status.

use super::summary::SyncSummary;
use crate::adapters::storage::TempStore;
use crate::core::process::{save_checkpoint, ProcessManager};
use crate::core::relation::RelationHandler;
use crate::core::sync::EntityProcessor;
use crate::core::temp::ProcessTempHandler;
use crate::domain::entity::ObjectType;
use crate::domain::ids::ProcessId;
use crate::domain::process::{Process, StepKind};
use crate::domain::{Result, SyncError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runs processes step by step
pub struct SyncCoordinator {
    entities: EntityProcessor,
    relations: RelationHandler,
    processes: Arc<ProcessManager>,
    temp: Arc<dyn TempStore>,
    status_interval: Duration,
}

impl SyncCoordinator {
    pub fn new(
        entities: EntityProcessor,
        relations: RelationHandler,
        processes: Arc<ProcessManager>,
        temp: Arc<dyn TempStore>,
        status_interval: Duration,
    ) -> Self {
        Self {
            entities,
            relations,
            processes,
            temp,
            status_interval,
        }
    }

    /// Runs every step of `process` and finishes it
    ///
    /// The process is saved after every step and once finished. Staged
    /// entities are cleared at the end, whatever the outcome. Cancellation
    /// aborts the remaining steps.
    pub async fn run(
        &self,
        process: &mut Process,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SyncSummary> {
        let start_time = Instant::now();
        let checkpoint = self.processes.as_ref();
        let correlation_id = process.correlation_id;
        let (stop_status, status_task) = self.spawn_status_logger(process.id);

        tracing::info!(
            process_id = %process.id,
            system = %process.system,
            steps = process.steps.len(),
            "Starting synchronization"
        );

        for index in 0..process.steps.len() {
            let kind = process.steps[index].kind;
            if process.steps[index].is_finished() {
                tracing::debug!(step = index, kind = %kind, "Skipping finished step");
                continue;
            }
            if *cancel.borrow() {
                process.abort("Synchronization cancelled");
                break;
            }

            let outcome = match kind {
                StepKind::Entities(_) => {
                    self.entities
                        .handle_entity_sync(process, index, correlation_id, checkpoint, cancel)
                        .await
                }
                StepKind::Relations(_) => {
                    self.relations
                        .handle_relations(process, index, checkpoint, cancel)
                        .await
                }
            };

            match outcome {
                Ok(()) => {}
                Err(SyncError::Cancelled) => {
                    tracing::warn!(step = index, kind = %kind, "Synchronization cancelled");
                    process.abort("Synchronization cancelled");
                    break;
                }
                Err(e) => {
                    crate::log_error_with_context!(e, format!("running step {index} ({kind})"));
                    process.steps[index].mark_failed(e.to_string());
                }
            }

            if let StepKind::Entities(object_type) = kind {
                if process.steps[index].is_failed() {
                    Self::abort_dependent(process, object_type);
                }
            }
            save_checkpoint(process, checkpoint).await;
        }

        if !process.is_finished() {
            process.mark_finished();
        }
        save_checkpoint(process, checkpoint).await;

        let temp = ProcessTempHandler::new(self.temp.clone(), process.id);
        if let Err(e) = temp.clear().await {
            tracing::warn!(process_id = %process.id, error = %e, "Failed to clear staged entities");
        }

        let _ = stop_status.send(true);
        if let Err(e) = status_task.await {
            tracing::debug!(error = %e, "Status logger ended abnormally");
        }

        let summary = SyncSummary::from_process(process, start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    fn abort_dependent(process: &mut Process, object_type: ObjectType) {
        if let Some(relation_index) = process.step_index_of(StepKind::Relations(object_type)) {
            let step = &mut process.steps[relation_index];
            if !step.is_finished() {
                step.mark_aborted(format!("{object_type} entity step failed"));
            }
        }
    }

    /// Logs the persisted state of the process every status interval
    fn spawn_status_logger(&self, process_id: ProcessId) -> (watch::Sender<bool>, JoinHandle<()>) {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let processes = self.processes.clone();
        let interval = self.status_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match processes.load(process_id).await {
                            Ok(Some(process)) => log_status(&process),
                            Ok(None) => {}
                            Err(e) => tracing::debug!(error = %e, "Failed to read process status"),
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        (stop_tx, handle)
    }
}

fn log_status(process: &Process) {
    let current = process.steps.iter().find(|s| !s.is_finished());
    let done = process.steps.iter().filter(|s| s.is_finished()).count();
    tracing::info!(
        process_id = %process.id,
        status = %process.status,
        steps_done = done,
        steps_total = process.steps.len(),
        current_step = current.map(|s| s.kind.to_string()).unwrap_or_default(),
        analyzed = current.map(|s| s.temporary.analyzed).unwrap_or_default(),
        "Synchronization in progress"
    );
}
