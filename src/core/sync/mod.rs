//! Entity synchronization
//!
//! [`EntityProcessor`] runs the entity steps of a process; [`DuplicateRules`]
//! builds the destination lookup key of every source entity.

pub mod duplicate;
pub mod entity;

pub use duplicate::DuplicateRules;
pub use entity::{EntityProcessor, EntityProcessorSettings};
