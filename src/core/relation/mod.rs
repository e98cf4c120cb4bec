//! Relation synchronization
//!
//! - [`RelationHandler`] runs the relation steps of a process
//! - [`RelationGraph`] compares current and stored edges
//! - [`RelationDispatcher`] groups changes into per-parent messages

pub mod dispatch;
pub mod graph;
pub mod handler;

pub use dispatch::RelationDispatcher;
pub use graph::{CurrentGraph, RelationGraph};
pub use handler::RelationHandler;
