//! Destination system abstractions
//!
//! The destination is split into a read side (queries) and a write side
//! (operations turned into commands). Commands reach the destination through
//! a [`CommandPublisher`], so write-side implementations stay independent of
//! the transport.

use crate::domain::command::{CommandResult, RelationProcessingObject, SyncCommand};
use crate::domain::diff::ChangedFields;
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::filter::{Filter, KeyProperties};
use crate::domain::ids::CorrelationId;
use crate::domain::relation::Relation;
use crate::domain::{Page, Result};
use async_trait::async_trait;

/// Query side of the destination system
#[async_trait]
pub trait DestinationRead: Send + Sync {
    /// Entities matching the key's filter
    ///
    /// The post filter of `key` is not applied here; callers apply it with
    /// [`KeyProperties::apply_post_filter`]. Zero, one or many entities may
    /// match.
    async fn get_by_filter(&self, key: &KeyProperties) -> Result<Vec<SyncEntity>>;

    /// One page of entities of `object_type`, optionally filtered
    ///
    /// The filter is applied before paging, so `has_more` refers to the
    /// filtered collection.
    async fn get_batch(
        &self,
        object_type: ObjectType,
        start: usize,
        batch_size: usize,
        filter: Option<&Filter>,
    ) -> Result<Page<SyncEntity>>;
}

/// Operation side of the destination system
#[async_trait]
pub trait DestinationWrite: Send + Sync {
    /// Creates `entity`
    async fn create(
        &self,
        entity: &SyncEntity,
        correlation_id: CorrelationId,
    ) -> Result<CommandResult>;

    /// Updates the properties in `changed_fields` of the entity identified by
    /// `entity.id()`
    async fn update(
        &self,
        entity: &SyncEntity,
        changed_fields: &ChangedFields,
        correlation_id: CorrelationId,
    ) -> Result<CommandResult>;

    /// Deletes every entity, returning one result per entity
    async fn delete(
        &self,
        entities: Vec<SyncEntity>,
        correlation_id: CorrelationId,
    ) -> Result<Vec<CommandResult>>;

    /// Sends relation additions and removals
    ///
    /// Returns one processing object per dispatched message, each carrying
    /// its own result.
    async fn handle_relations(
        &self,
        added: Vec<Relation>,
        removed: Vec<Relation>,
        correlation_id: CorrelationId,
    ) -> Result<Vec<RelationProcessingObject>>;
}

/// Transport for commands sent to the destination
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    /// Publishes one command and waits for its outcome
    async fn publish(&self, command: SyncCommand) -> Result<CommandResult>;
}
