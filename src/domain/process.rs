//! Synchronization process state machine
//!
//! A [`Process`] is one synchronization run. It owns an ordered list of
//! [`Step`]s: one entity step per configured object type followed by one
//! relation step per object type with relations enabled. Engines mutate the
//! steps through the transition methods below and persist the process through
//! a checkpoint callback; nothing here performs I/O.
//!
//! # Examples
//!
//! ```
//! use profile_sync::domain::entity::ObjectType;
//! use profile_sync::domain::process::{ProcessBuilder, StepKind, SyncOperations};
//!
//! let process = ProcessBuilder::new("LDAP")
//!     .step(StepKind::Entities(ObjectType::Group), SyncOperations::ALL)
//!     .step(StepKind::Relations(ObjectType::Group), SyncOperations::ADD)
//!     .build();
//!
//! assert_eq!(process.steps.len(), 2);
//! assert!(!process.is_finished());
//! ```

use super::entity::ObjectType;
use super::ids::{CorrelationId, ProcessId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Operations a step is allowed to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncOperations(u8);

impl SyncOperations {
    pub const NOTHING: SyncOperations = SyncOperations(0);
    pub const ADD: SyncOperations = SyncOperations(0b001);
    pub const UPDATE: SyncOperations = SyncOperations(0b010);
    pub const DELETE: SyncOperations = SyncOperations(0b100);
    pub const ALL: SyncOperations = SyncOperations(0b111);

    /// Whether every flag of `other` is set
    pub fn contains(self, other: SyncOperations) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_nothing(self) -> bool {
        self.0 == 0
    }

    /// Parses a list of operation names (`add`, `update`, `delete`, `all`,
    /// `nothing`)
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names
            .iter()
            .try_fold(SyncOperations::NOTHING, |acc, name| {
                Ok(acc | name.as_ref().parse::<SyncOperations>()?)
            })
    }
}

impl BitOr for SyncOperations {
    type Output = SyncOperations;

    fn bitor(self, rhs: SyncOperations) -> SyncOperations {
        SyncOperations(self.0 | rhs.0)
    }
}

impl FromStr for SyncOperations {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nothing" | "none" => Ok(SyncOperations::NOTHING),
            "add" | "create" => Ok(SyncOperations::ADD),
            "update" => Ok(SyncOperations::UPDATE),
            "delete" => Ok(SyncOperations::DELETE),
            "all" => Ok(SyncOperations::ALL),
            other => Err(format!("Unknown synchronization operation '{other}'")),
        }
    }
}

impl fmt::Display for SyncOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nothing() {
            return f.write_str("nothing");
        }
        let mut names = Vec::new();
        if self.contains(SyncOperations::ADD) {
            names.push("add");
        }
        if self.contains(SyncOperations::UPDATE) {
            names.push("update");
        }
        if self.contains(SyncOperations::DELETE) {
            names.push("delete");
        }
        f.write_str(&names.join("|"))
    }
}

/// What a step reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Entities of one object type
    Entities(ObjectType),
    /// Relations of one object type
    Relations(ObjectType),
}

impl StepKind {
    pub fn object_type(&self) -> ObjectType {
        match self {
            StepKind::Entities(t) | StepKind::Relations(t) => *t,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Entities(t) => write!(f, "{t} entities"),
            StepKind::Relations(t) => write!(f, "{t} relations"),
        }
    }
}

/// Step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started yet
    #[default]
    Pending,
    InProgress,
    /// Reading source or destination batches
    Fetching,
    /// All commands sent
    WaitingForResponse,
    Success,
    SuccessWithHints,
    Failure,
    /// Skipped or interrupted
    Aborted,
}

impl StepStatus {
    /// Terminal statuses
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            StepStatus::Success
                | StepStatus::SuccessWithHints
                | StepStatus::Failure
                | StepStatus::Aborted
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Fetching => "fetching",
            StepStatus::WaitingForResponse => "waiting_for_response",
            StepStatus::Success => "success",
            StepStatus::SuccessWithHints => "success_with_hints",
            StepStatus::Failure => "failure",
            StepStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Process status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    #[default]
    Running,
    Completed,
    CompletedWithHints,
    Failed,
    Aborted,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Completed => "completed",
            ProcessStatus::CompletedWithHints => "completed_with_hints",
            ProcessStatus::Failed => "failed",
            ProcessStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Running counters, reset for every run of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemporaryCounters {
    /// Entities or relations looked at so far
    pub analyzed: u64,
}

/// Operation counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinalCounters {
    pub create: u64,
    pub update: u64,
    pub delete: u64,
    pub relations_added: u64,
    pub relations_removed: u64,
}

impl FinalCounters {
    /// Sum of every successful operation
    pub fn total(&self) -> u64 {
        self.create + self.update + self.delete + self.relations_added + self.relations_removed
    }
}

/// One unit of a synchronization process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Position in the process
    pub index: usize,

    pub kind: StepKind,

    pub operations: SyncOperations,

    pub status: StepStatus,

    #[serde(default)]
    pub temporary: TemporaryCounters,

    #[serde(default)]
    pub final_counts: FinalCounters,

    /// Anomalies worth operator attention that did not fail the step
    #[serde(default)]
    pub hints: Vec<String>,

    /// Errors of individual entities or relations, and the failure reason
    #[serde(default)]
    pub errors: Vec<String>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl Step {
    /// Creates a pending step
    pub fn new(index: usize, kind: StepKind, operations: SyncOperations) -> Self {
        Self {
            index,
            kind,
            operations,
            status: StepStatus::Pending,
            temporary: TemporaryCounters::default(),
            final_counts: FinalCounters::default(),
            hints: Vec::new(),
            errors: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Whether the step may perform `op`
    pub fn allows(&self, op: SyncOperations) -> bool {
        self.operations.contains(op)
    }

    /// Starts (or restarts) the step, resetting its counters
    pub fn mark_started(&mut self) {
        self.status = StepStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.temporary = TemporaryCounters::default();
        self.final_counts = FinalCounters::default();
        self.hints.clear();
        self.errors.clear();
    }

    /// Moves to an intermediate status
    pub fn set_status(&mut self, status: StepStatus) {
        self.status = status;
    }

    pub fn add_hint(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Number of successful operations in this step so far
    pub fn successful_operations(&self) -> u64 {
        self.final_counts.total()
    }

    /// Finishes the step as `Success`, or `SuccessWithHints` when hints were
    /// recorded
    pub fn mark_completed(&mut self) {
        self.status = if self.hints.is_empty() {
            StepStatus::Success
        } else {
            StepStatus::SuccessWithHints
        };
        self.finished_at = Some(Utc::now());
    }

    /// Finishes the step as `SuccessWithHints` with the given hint
    pub fn mark_completed_with_hint(&mut self, hint: impl Into<String>) {
        self.add_hint(hint);
        self.mark_completed();
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.add_error(reason);
        self.status = StepStatus::Failure;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_aborted(&mut self, reason: impl Into<String>) {
        self.add_hint(reason);
        self.status = StepStatus::Aborted;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failure
    }
}

/// One synchronization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,

    /// Correlates every command emitted during the run
    pub correlation_id: CorrelationId,

    /// Source system being synchronized
    pub system: String,

    pub status: ProcessStatus,

    pub steps: Vec<Step>,

    pub created_at: DateTime<Utc>,

    /// Last activity, refreshed on every checkpoint
    pub updated_at: DateTime<Utc>,

    /// Set once the run ended, whatever the outcome
    pub finished_at: Option<DateTime<Utc>>,
}

impl Process {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Refreshes the last-activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    /// The step reconciling the given kind, if configured
    pub fn step_index_of(&self, kind: StepKind) -> Option<usize> {
        self.steps.iter().position(|s| s.kind == kind)
    }

    /// Whether the last activity is older than `timeout`
    pub fn is_stale(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        !self.is_finished() && now - self.updated_at > timeout
    }

    /// Status derived from the step outcomes
    pub fn derived_status(&self) -> ProcessStatus {
        if self.steps.iter().any(|s| s.status == StepStatus::Failure) {
            ProcessStatus::Failed
        } else if self
            .steps
            .iter()
            .any(|s| s.status == StepStatus::Aborted || !s.is_finished())
        {
            ProcessStatus::Aborted
        } else if self
            .steps
            .iter()
            .any(|s| s.status == StepStatus::SuccessWithHints)
        {
            ProcessStatus::CompletedWithHints
        } else {
            ProcessStatus::Completed
        }
    }

    /// Ends the run with the status derived from its steps
    pub fn mark_finished(&mut self) {
        self.status = self.derived_status();
        let now = Utc::now();
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    /// Ends an interrupted run: every unfinished step becomes `Aborted`
    pub fn abort(&mut self, reason: &str) {
        for step in self.steps.iter_mut().filter(|s| !s.is_finished()) {
            step.mark_aborted(reason);
        }
        self.status = ProcessStatus::Aborted;
        let now = Utc::now();
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    /// Sum of all step counters
    pub fn totals(&self) -> FinalCounters {
        self.steps
            .iter()
            .fold(FinalCounters::default(), |mut acc, s| {
                acc.create += s.final_counts.create;
                acc.update += s.final_counts.update;
                acc.delete += s.final_counts.delete;
                acc.relations_added += s.final_counts.relations_added;
                acc.relations_removed += s.final_counts.relations_removed;
                acc
            })
    }
}

/// Builder for creating Process instances
pub struct ProcessBuilder {
    system: String,
    id: Option<ProcessId>,
    correlation_id: Option<CorrelationId>,
    steps: Vec<(StepKind, SyncOperations)>,
}

impl ProcessBuilder {
    /// Create a new ProcessBuilder for a source system
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            id: None,
            correlation_id: None,
            steps: Vec::new(),
        }
    }

    /// Set the process id
    pub fn id(mut self, id: ProcessId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the correlation id
    pub fn correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Append a step
    pub fn step(mut self, kind: StepKind, operations: SyncOperations) -> Self {
        self.steps.push((kind, operations));
        self
    }

    /// Build the Process instance
    pub fn build(self) -> Process {
        let now = Utc::now();
        Process {
            id: self.id.unwrap_or_default(),
            correlation_id: self.correlation_id.unwrap_or_default(),
            system: self.system,
            status: ProcessStatus::Running,
            steps: self
                .steps
                .into_iter()
                .enumerate()
                .map(|(index, (kind, ops))| Step::new(index, kind, ops))
                .collect(),
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }
}
