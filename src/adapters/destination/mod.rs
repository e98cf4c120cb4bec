//! Destination system adapters
//!
//! The traits split querying ([`DestinationRead`]) from operations
//! ([`DestinationWrite`]) and transport ([`CommandPublisher`]).
//! [`InMemoryDestination`] implements the read side and the transport over an
//! in-process store; the Maverick adapters live in
//! [`crate::adapters::maverick`].

pub mod memory;
pub mod traits;

pub use memory::InMemoryDestination;
pub use traits::{CommandPublisher, DestinationRead, DestinationWrite};
