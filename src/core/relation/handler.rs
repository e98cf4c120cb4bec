//! Relation reconciliation engine
//!
//! Runs one relation step: compares the relations of the entities staged in
//! this run with the relations stored in the destination and sends the
//! difference through the destination's relation dispatch.

use super::graph::{CurrentGraph, RelationGraph};
use crate::adapters::factory::Destination;
use crate::adapters::storage::TempStore;
use crate::core::batch::fetch_all;
use crate::core::process::{save_checkpoint, ProcessCheckpoint};
use crate::core::temp::ProcessTempHandler;
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::filter::KeyProperties;
use crate::domain::ids::ExternalId;
use crate::domain::process::{Process, StepKind, StepStatus, SyncOperations};
use crate::domain::relation::Relation;
use crate::domain::{Result, SyncError};
use crate::{log_error_with_context, log_step_complete, log_step_start};
use std::sync::Arc;
use tokio::sync::watch;

/// Reconciles the relations of one object kind
pub struct RelationHandler {
    destination: Destination,
    temp: Arc<dyn TempStore>,
    system: String,
    batch_size: usize,
}

impl RelationHandler {
    pub fn new(
        destination: Destination,
        temp: Arc<dyn TempStore>,
        system: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            destination,
            temp,
            system: system.into(),
            batch_size,
        }
    }

    /// Runs the relation step at `step_index`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] when the step does not exist or
    /// is not a relation step, and [`SyncError::Cancelled`] when the
    /// cancellation signal is raised.
    pub async fn handle_relations(
        &self,
        process: &mut Process,
        step_index: usize,
        checkpoint: &dyn ProcessCheckpoint,
        cancel: &watch::Receiver<bool>,
    ) -> Result<()> {
        let object_type = match process.step(step_index).map(|s| s.kind) {
            Some(StepKind::Relations(object_type)) => object_type,
            Some(kind) => {
                return Err(SyncError::Configuration(format!(
                    "Step {step_index} ({kind}) is not a relation step"
                )))
            }
            None => {
                return Err(SyncError::Configuration(format!(
                    "Process {} has no step {step_index}",
                    process.id
                )))
            }
        };
        let system = self.system.as_str();
        let correlation_id = process.correlation_id;
        let temp = ProcessTempHandler::new(self.temp.clone(), process.id);

        let step = &mut process.steps[step_index];
        step.mark_started();
        log_step_start!(system, step);
        step.set_status(StepStatus::Fetching);
        save_checkpoint(process, checkpoint).await;

        let staged = match temp.load_all().await {
            Ok(staged) => staged,
            Err(e) => {
                log_error_with_context!(e, "reading staged entities");
                process.steps[step_index].mark_failed(format!("Reading staged entities failed: {e}"));
                return self.finish(process, step_index, checkpoint).await;
            }
        };
        let of_kind: Vec<_> = staged
            .iter()
            .filter(|e| e.object_type() == object_type)
            .cloned()
            .collect();
        let mut current = CurrentGraph::build(&of_kind, &staged, system);
        let targets = current.unresolved_targets();
        if !targets.is_empty() {
            if *cancel.borrow() {
                return Err(SyncError::Cancelled);
            }
            let known = self.look_up_targets(&targets).await;
            current.resolve_with(&known);
        }

        let existing = fetch_all(self.batch_size, cancel, |start, size| {
            self.destination
                .read
                .get_batch(object_type, start, size, None)
        })
        .await;
        let existing = match existing {
            Ok(entities) => entities,
            Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => {
                log_error_with_context!(e, format!("fetching destination {object_type}"));
                process.steps[step_index].mark_failed(format!("Destination fetch failed: {e}"));
                return self.finish(process, step_index, checkpoint).await;
            }
        };
        let stored = RelationGraph::from_destination(&existing, system);

        let step = &mut process.steps[step_index];
        step.set_status(StepStatus::InProgress);
        step.temporary.analyzed = (current.graph.edge_count() + stored.edge_count()) as u64;

        let added: Vec<Relation> = if step.allows(SyncOperations::ADD) {
            current.graph.missing_from(&stored)
        } else {
            Vec::new()
        };
        let removed: Vec<Relation> = if step.allows(SyncOperations::DELETE) {
            stored.stale_in(&current.graph, &current.seen, system)
        } else {
            Vec::new()
        };

        tracing::info!(
            object_type = %object_type,
            staged = of_kind.len(),
            current_edges = current.graph.edge_count(),
            stored_edges = stored.edge_count(),
            unresolved = current.unresolved,
            to_add = added.iter().map(|r| r.related_objects.len()).sum::<usize>(),
            to_remove = removed.iter().map(|r| r.related_objects.len()).sum::<usize>(),
            "Compared relation graphs"
        );

        if added.is_empty() && removed.is_empty() {
            process.steps[step_index].mark_completed();
            return self.finish(process, step_index, checkpoint).await;
        }
        if *cancel.borrow() {
            return Err(SyncError::Cancelled);
        }

        process.steps[step_index].set_status(StepStatus::WaitingForResponse);
        save_checkpoint(process, checkpoint).await;

        let dispatched = self
            .destination
            .write
            .handle_relations(added, removed, correlation_id)
            .await;

        let step = &mut process.steps[step_index];
        let mut failures = Vec::new();
        match dispatched {
            Ok(results) => {
                for processed in results {
                    let (added, removed) = processed.edge_counts();
                    if processed.is_success() {
                        step.final_counts.relations_added += added as u64;
                        step.final_counts.relations_removed += removed as u64;
                    } else {
                        let reason = processed
                            .result
                            .and_then(|r| r.error)
                            .unwrap_or_else(|| "no result".to_string());
                        failures.push(format!(
                            "{} message for {} failed: {reason}",
                            processed.message.kind(),
                            processed.message.body().object.object_type
                        ));
                    }
                }
            }
            Err(e) => failures.push(e.to_string()),
        }

        if !failures.is_empty() {
            if step.successful_operations() > 0 {
                for failure in failures {
                    tracing::warn!(object_type = %object_type, "{failure}");
                    step.add_hint(failure);
                }
            } else {
                step.mark_failed(format!("Relation dispatch failed: {}", failures.join("; ")));
                return self.finish(process, step_index, checkpoint).await;
            }
        }

        process.steps[step_index].mark_completed();
        self.finish(process, step_index, checkpoint).await
    }

    /// Looks up related objects that were not staged in this run
    ///
    /// A failed lookup leaves the object unresolved.
    async fn look_up_targets(&self, targets: &[(ExternalId, ObjectType)]) -> Vec<SyncEntity> {
        let mut found = Vec::new();
        for (external_id, object_type) in targets {
            let key = KeyProperties::new(external_id.clone());
            match self.destination.read.get_by_filter(&key).await {
                Ok(entities) => found.extend(
                    entities
                        .into_iter()
                        .filter(|e| e.object_type() == *object_type),
                ),
                Err(e) => tracing::warn!(
                    related = %external_id,
                    object_type = %object_type,
                    error = %e,
                    "Failed to look up related object"
                ),
            }
        }
        found
    }

    async fn finish(
        &self,
        process: &mut Process,
        step_index: usize,
        checkpoint: &dyn ProcessCheckpoint,
    ) -> Result<()> {
        log_step_complete!(self.system, process.steps[step_index]);
        save_checkpoint(process, checkpoint).await;
        Ok(())
    }
}
