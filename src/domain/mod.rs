//! Domain models and types for profile-sync.
//!
//! This module contains the types every other layer speaks: identifiers,
//! synchronized entities, relations, filters, commands and the process state
//! machine.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ExternalId`], [`MaverickId`], [`ProcessId`])
//! - **Entity models** ([`SyncEntity`] and its variants)
//! - **Relations** ([`Relation`], [`AssignmentType`])
//! - **Process state** ([`Process`], [`Step`])
//! - **Error types** ([`SyncError`], [`SourceSystemError`], [`DestinationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Destination ids and external ids are distinct types:
//!
//! ```rust
//! use profile_sync::domain::{ExternalId, MaverickId};
//!
//! # fn example() -> Result<(), String> {
//! let external = ExternalId::new("cn=alice", "LDAP")?;
//! let internal = MaverickId::new("7f1c")?;
//!
//! // This won't compile - a destination id is not an external id
//! // let wrong: ExternalId = internal;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod diff;
pub mod entity;
pub mod errors;
pub mod filter;
pub mod ids;
pub mod process;
pub mod relation;
pub mod result;
pub mod sync;

// Re-export commonly used types for convenience
pub use command::{
    CommandResult, ObjectAssignmentMessage, RelationMessage, RelationMessageKind,
    RelationProcessingObject, SyncCommand,
};
pub use diff::ChangedFields;
pub use entity::{
    EntityHeader, Function, Group, ObjectType, Organization, Role, SyncEntity, User,
};
pub use errors::{DestinationError, SourceSystemError, SyncError};
pub use filter::{Filter, FilterOperator, KeyProperties, PostFilter};
pub use ids::{CommandId, CorrelationId, ExternalId, MaverickId, ProcessId};
pub use process::{
    FinalCounters, Process, ProcessBuilder, ProcessStatus, Step, StepKind, StepStatus,
    SyncOperations, TemporaryCounters,
};
pub use relation::{
    AssignmentType, LookUpObject, ObjectRef, ObjectRelation, Relation, RelationIntent,
};
pub use result::Result;
pub use sync::{Schedule, SyncLock, SyncStatus, SYNC_LOCK_KEY};

/// Page of results returned by a batch read
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Authoritative: `false` means the collection is exhausted
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// Slices `all` into the page starting at `start`
    pub fn slice(all: &[T], start: usize, size: usize) -> Self
    where
        T: Clone,
    {
        let end = start.saturating_add(size).min(all.len());
        let items = if start < all.len() {
            all[start..end].to_vec()
        } else {
            Vec::new()
        };
        Self {
            items,
            has_more: end < all.len(),
        }
    }
}
