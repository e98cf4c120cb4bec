//! Source system abstraction

use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::{Page, Result};
use async_trait::async_trait;

/// External system of record supplying entities (e.g. LDAP)
///
/// Implementations return entities in fixed-size pages; `has_more` on the
/// returned page must be authoritative.
#[async_trait]
pub trait SourceSystem: Send + Sync {
    /// Name of the system; external ids issued by it carry this source
    fn system_name(&self) -> &str;

    /// Object types this source can deliver
    fn object_types(&self) -> Vec<ObjectType>;

    /// Reads one page of entities of `object_type`
    ///
    /// # Arguments
    ///
    /// * `object_type` - Kind of entity to read
    /// * `start` - Offset of the first entity
    /// * `batch_size` - Maximum number of entities in the page
    ///
    /// # Errors
    ///
    /// Returns a source error if the system cannot be read.
    async fn get_batch(
        &self,
        object_type: ObjectType,
        start: usize,
        batch_size: usize,
    ) -> Result<Page<SyncEntity>>;
}
