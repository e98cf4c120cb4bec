//! Synchronization summary and reporting

use crate::domain::ids::ProcessId;
use crate::domain::process::{FinalCounters, Process, ProcessStatus, StepKind, StepStatus};
use std::time::Duration;

/// Outcome of one step
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub kind: StepKind,
    pub status: StepStatus,
    pub counts: FinalCounters,
    pub hints: Vec<String>,
    pub errors: Vec<String>,
}

/// Summary of a synchronization run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub process_id: ProcessId,

    /// Source system
    pub system: String,

    pub status: ProcessStatus,

    /// Operation counters over all steps
    pub totals: FinalCounters,

    pub steps: Vec<StepSummary>,

    pub duration: Duration,
}

impl SyncSummary {
    /// Summarizes a finished process
    pub fn from_process(process: &Process, duration: Duration) -> Self {
        Self {
            process_id: process.id,
            system: process.system.clone(),
            status: process.status,
            totals: process.totals(),
            steps: process
                .steps
                .iter()
                .map(|s| StepSummary {
                    kind: s.kind,
                    status: s.status,
                    counts: s.final_counts,
                    hints: s.hints.clone(),
                    errors: s.errors.clone(),
                })
                .collect(),
            duration,
        }
    }

    /// Whether every step succeeded, possibly with hints
    pub fn is_successful(&self) -> bool {
        matches!(
            self.status,
            ProcessStatus::Completed | ProcessStatus::CompletedWithHints
        )
    }

    /// Entity and relation errors over all steps
    pub fn error_count(&self) -> usize {
        self.steps.iter().map(|s| s.errors.len()).sum()
    }

    pub fn hint_count(&self) -> usize {
        self.steps.iter().map(|s| s.hints.len()).sum()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            process_id = %self.process_id,
            system = %self.system,
            status = %self.status,
            created = self.totals.create,
            updated = self.totals.update,
            deleted = self.totals.delete,
            relations_added = self.totals.relations_added,
            relations_removed = self.totals.relations_removed,
            duration_secs = self.duration.as_secs(),
            "Synchronization finished"
        );

        for step in &self.steps {
            for hint in &step.hints {
                tracing::warn!(step = %step.kind, hint = %hint, "Step hint");
            }
            for error in &step.errors {
                tracing::warn!(step = %step.kind, error = %error, "Step error");
            }
        }
    }
}
