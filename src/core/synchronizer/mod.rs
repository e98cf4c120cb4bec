//! Process and lock synchronizer
//!
//! - [`Synchronizer`]: the distributed lock
//! - [`SynchronizationService`]: starts runs and reports their status
//! - [`SyncCoordinator`]: executes the steps of a process
//! - [`ScheduleService`] and [`run_scheduled`]: periodic runs

pub mod coordinator;
pub mod lock;
pub mod schedule;
pub mod service;
pub mod summary;

pub use coordinator::SyncCoordinator;
pub use lock::Synchronizer;
pub use schedule::{run_scheduled, ScheduleService};
pub use service::SynchronizationService;
pub use summary::{StepSummary, SyncSummary};
