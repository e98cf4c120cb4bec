//! Entity reconciliation engine
//!
//! Reconciles the entities of one object type between the source system and
//! the destination, within one entity step of a process:
//!
//! 1. Read the complete source collection (no partial processing)
//! 2. Convert it with the source system's converter, if any
//! 3. Per entity: look up destination candidates by external id and
//!    near-duplicate rules, then create or update
//! 4. Stage every reconciled entity for the relation step
//! 5. Delete destination entities of the current system that are no longer
//!    delivered by the source
//!
//! An empty source collection never deletes anything: it completes the step
//! with a hint instead.

use crate::adapters::factory::Destination;
use crate::adapters::source::SourceSystem;
use crate::adapters::storage::TempStore;
use crate::core::batch::fetch_all;
use crate::core::process::{save_checkpoint, ProcessCheckpoint};
use crate::core::sync::duplicate::DuplicateRules;
use crate::core::temp::ProcessTempHandler;
use crate::core::transform::{convert_all, EntityConverter};
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::filter::Filter;
use crate::domain::ids::{CorrelationId, ExternalId, MaverickId};
use crate::domain::process::{Process, Step, StepKind, StepStatus, SyncOperations};
use crate::domain::{Result, SyncError};
use crate::{log_error_with_context, log_step_complete, log_step_start};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Engine settings
#[derive(Debug, Clone)]
pub struct EntityProcessorSettings {
    /// Name of the source system; selects the "current" external ids
    pub system: String,
    /// Page size for source and destination reads
    pub batch_size: usize,
    /// Checkpoint every N entities
    pub checkpoint_every: usize,
}

/// Destination objects known to be delivered by the source in this run
#[derive(Debug, Default)]
struct SeenObjects {
    maverick_ids: HashSet<MaverickId>,
    external_ids: HashSet<String>,
}

impl SeenObjects {
    fn contains(&self, entity: &SyncEntity, system: &str) -> bool {
        entity.id().is_some_and(|id| self.maverick_ids.contains(id))
            || entity
                .external_id_for(system)
                .is_some_and(|ext| self.external_ids.contains(&ext.id))
    }
}

/// Reconciles entities of one object type
pub struct EntityProcessor {
    source: Arc<dyn SourceSystem>,
    destination: Destination,
    temp: Arc<dyn TempStore>,
    rules: DuplicateRules,
    converter: Option<Arc<dyn EntityConverter>>,
    settings: EntityProcessorSettings,
}

impl EntityProcessor {
    pub fn new(
        source: Arc<dyn SourceSystem>,
        destination: Destination,
        temp: Arc<dyn TempStore>,
        rules: DuplicateRules,
        settings: EntityProcessorSettings,
    ) -> Self {
        Self {
            source,
            destination,
            temp,
            rules,
            converter: None,
            settings,
        }
    }

    /// Sets the converter applied to every source entity
    pub fn with_converter(mut self, converter: Arc<dyn EntityConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Runs the entity step at `step_index`
    ///
    /// Step-level failures (source or destination unreachable) are recorded
    /// in the step and do not make this method fail; entity-level errors are
    /// recorded in `step.errors` and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] when the step does not exist or
    /// is not an entity step, and [`SyncError::Cancelled`] when the
    /// cancellation signal is raised.
    pub async fn handle_entity_sync(
        &self,
        process: &mut Process,
        step_index: usize,
        correlation_id: CorrelationId,
        checkpoint: &dyn ProcessCheckpoint,
        cancel: &watch::Receiver<bool>,
    ) -> Result<()> {
        let object_type = match process.step(step_index).map(|s| s.kind) {
            Some(StepKind::Entities(object_type)) => object_type,
            Some(kind) => {
                return Err(SyncError::Configuration(format!(
                    "Step {step_index} ({kind}) is not an entity step"
                )))
            }
            None => {
                return Err(SyncError::Configuration(format!(
                    "Process {} has no step {step_index}",
                    process.id
                )))
            }
        };
        let system = self.settings.system.as_str();
        let temp = ProcessTempHandler::new(self.temp.clone(), process.id);

        let step = &mut process.steps[step_index];
        step.mark_started();
        log_step_start!(system, step);
        step.set_status(StepStatus::Fetching);
        save_checkpoint(process, checkpoint).await;

        let fetched = fetch_all(self.settings.batch_size, cancel, |start, size| {
            self.source.get_batch(object_type, start, size)
        })
        .await;
        let fetched = match fetched {
            Ok(entities) => entities,
            Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => {
                log_error_with_context!(e, format!("fetching {object_type} from {system}"));
                process.steps[step_index].mark_failed(format!("Source fetch failed: {e}"));
                return self.finish(process, step_index, checkpoint).await;
            }
        };

        let entities = convert_all(
            self.converter.as_ref(),
            Self::of_type(fetched, object_type),
        );
        tracing::info!(
            system,
            object_type = %object_type,
            count = entities.len(),
            "Fetched source entities"
        );

        if entities.is_empty() {
            process.steps[step_index].mark_completed_with_hint(format!(
                "Source system {system} returned no {object_type} entities; nothing was synchronized"
            ));
            return self.finish(process, step_index, checkpoint).await;
        }

        process.steps[step_index].set_status(StepStatus::InProgress);
        save_checkpoint(process, checkpoint).await;

        let mut seen = SeenObjects::default();
        for (position, entity) in entities.into_iter().enumerate() {
            if *cancel.borrow() {
                return Err(SyncError::Cancelled);
            }

            let step = &mut process.steps[step_index];
            step.temporary.analyzed += 1;
            let label = entity.label().to_string();

            if let Err(e) = self
                .sync_entity(entity, step, correlation_id, &temp, &mut seen)
                .await
            {
                log_error_with_context!(e, format!("synchronizing {object_type} '{label}'"));
                step.add_error(format!("{object_type} '{label}': {e}"));
            }

            if (position + 1) % self.settings.checkpoint_every.max(1) == 0 {
                save_checkpoint(process, checkpoint).await;
            }
        }

        if process.steps[step_index].allows(SyncOperations::DELETE) {
            if *cancel.borrow() {
                return Err(SyncError::Cancelled);
            }
            process.steps[step_index].set_status(StepStatus::Fetching);
            save_checkpoint(process, checkpoint).await;

            let step = &mut process.steps[step_index];
            self.delete_stale(object_type, step, correlation_id, &seen, cancel)
                .await?;
            if step.is_failed() {
                return self.finish(process, step_index, checkpoint).await;
            }
        }

        process.steps[step_index].set_status(StepStatus::WaitingForResponse);
        save_checkpoint(process, checkpoint).await;

        process.steps[step_index].mark_completed();
        self.finish(process, step_index, checkpoint).await
    }

    async fn finish(
        &self,
        process: &mut Process,
        step_index: usize,
        checkpoint: &dyn ProcessCheckpoint,
    ) -> Result<()> {
        log_step_complete!(self.settings.system, process.steps[step_index]);
        save_checkpoint(process, checkpoint).await;
        Ok(())
    }

    fn of_type(entities: Vec<SyncEntity>, object_type: ObjectType) -> Vec<SyncEntity> {
        entities
            .into_iter()
            .filter(|e| {
                let matches = e.object_type() == object_type;
                if !matches {
                    tracing::warn!(
                        expected = %object_type,
                        actual = %e.object_type(),
                        label = e.label(),
                        "Skipping source entity of unexpected type"
                    );
                }
                matches
            })
            .collect()
    }

    /// Reconciles one entity, then stages it whatever the outcome
    async fn sync_entity(
        &self,
        entity: SyncEntity,
        step: &mut Step,
        correlation_id: CorrelationId,
        temp: &ProcessTempHandler,
        seen: &mut SeenObjects,
    ) -> Result<()> {
        let system = self.settings.system.as_str();
        let Some(external_id) = entity.external_id_for(system).cloned() else {
            tracing::warn!(
                system,
                object_type = %entity.object_type(),
                label = entity.label(),
                "Skipping entity without an external id of the current system"
            );
            return Ok(());
        };
        seen.external_ids.insert(external_id.id.clone());

        let mut staged = entity.clone();
        let outcome = self
            .reconcile(&entity, &external_id, step, correlation_id, seen, &mut staged)
            .await;

        temp.stage(&staged).await?;
        outcome
    }

    async fn reconcile(
        &self,
        entity: &SyncEntity,
        external_id: &ExternalId,
        step: &mut Step,
        correlation_id: CorrelationId,
        seen: &mut SeenObjects,
        staged: &mut SyncEntity,
    ) -> Result<()> {
        let system = self.settings.system.as_str();
        let key = self.rules.key_for(entity, external_id);
        let candidates = key.apply_post_filter(self.destination.read.get_by_filter(&key).await?);

        if candidates.is_empty() {
            if !step.allows(SyncOperations::ADD) {
                return Ok(());
            }
            let result = self
                .destination
                .write
                .create(&Self::payload(entity.clone()), correlation_id)
                .await?;
            if result.success {
                step.final_counts.create += 1;
                staged.header_mut().id = result.entity_id;
                tracing::debug!(label = entity.label(), "Created entity");
            } else {
                step.add_error(format!(
                    "Create of {} '{}' failed: {}",
                    entity.object_type(),
                    entity.label(),
                    result.error.unwrap_or_default()
                ));
            }
            return Ok(());
        }

        let linked: Vec<&SyncEntity> = candidates
            .iter()
            .filter(|c| {
                c.external_id_for(system)
                    .is_some_and(|ext| ext.id == external_id.id)
            })
            .collect();
        let targets: Vec<&SyncEntity> = if linked.is_empty() {
            if candidates.len() > 1 {
                tracing::warn!(
                    label = entity.label(),
                    candidates = candidates.len(),
                    "No candidate linked by external id; updating every match"
                );
            }
            candidates.iter().collect()
        } else {
            linked
        };

        for candidate in &targets {
            if let Some(id) = candidate.id() {
                seen.maverick_ids.insert(id.clone());
            }
        }
        if let Some(id) = targets.iter().find_map(|c| c.id()) {
            staged.header_mut().id = Some(id.clone());
        }

        if !step.allows(SyncOperations::UPDATE) {
            return Ok(());
        }

        for candidate in targets {
            let mut desired = Self::payload(entity.clone());
            desired.header_mut().id = candidate.id().cloned();
            desired
                .header_mut()
                .merge_foreign_external_ids(candidate.external_ids(), system);

            let changed = desired.diff(candidate)?;
            if changed.is_empty() {
                continue;
            }

            tracing::debug!(
                label = entity.label(),
                changed = %changed,
                "Updating entity"
            );
            let result = self
                .destination
                .write
                .update(&desired, &changed, correlation_id)
                .await?;
            if result.success {
                step.final_counts.update += 1;
            } else {
                step.add_error(format!(
                    "Update of {} '{}' failed: {}",
                    entity.object_type(),
                    entity.label(),
                    result.error.unwrap_or_default()
                ));
            }
        }

        Ok(())
    }

    /// Entity as sent to the destination; relations travel separately
    fn payload(mut entity: SyncEntity) -> SyncEntity {
        entity.header_mut().related_objects.clear();
        entity
    }

    /// Deletes destination entities of the current system missing from the
    /// source collection
    ///
    /// Entities created elsewhere but linked to the current system by an
    /// external id (duplicate matches) count as entities of the current
    /// system.
    ///
    /// A failure is tolerated (recorded as a hint) when the step already has
    /// successful operations; otherwise the step fails.
    async fn delete_stale(
        &self,
        object_type: ObjectType,
        step: &mut Step,
        correlation_id: CorrelationId,
        seen: &SeenObjects,
        cancel: &watch::Receiver<bool>,
    ) -> Result<()> {
        let system = self.settings.system.as_str();
        let owned = Filter::managed_by(system);

        let existing = fetch_all(self.settings.batch_size, cancel, |start, size| {
            self.destination
                .read
                .get_batch(object_type, start, size, Some(&owned))
        })
        .await;
        let existing = match existing {
            Ok(entities) => entities,
            Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => {
                log_error_with_context!(e, format!("fetching destination {object_type}"));
                step.mark_failed(format!("Destination fetch failed: {e}"));
                return Ok(());
            }
        };

        let stale: Vec<SyncEntity> = existing
            .into_iter()
            .filter(|e| !seen.contains(e, system))
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        tracing::info!(
            object_type = %object_type,
            count = stale.len(),
            "Deleting entities no longer delivered by the source"
        );
        step.set_status(StepStatus::InProgress);

        let mut failures = Vec::new();
        match self.destination.write.delete(stale, correlation_id).await {
            Ok(results) => {
                for result in results {
                    if result.success {
                        step.final_counts.delete += 1;
                    } else {
                        failures.push(result.error.unwrap_or_default());
                    }
                }
            }
            Err(e) => failures.push(e.to_string()),
        }

        if failures.is_empty() {
            return Ok(());
        }
        let summary = format!(
            "{} {object_type} deletion(s) failed: {}",
            failures.len(),
            failures.join("; ")
        );
        if step.successful_operations() > 0 {
            tracing::warn!(object_type = %object_type, "{summary}");
            step.add_hint(summary);
        } else {
            step.mark_failed(summary);
        }
        Ok(())
    }
}
