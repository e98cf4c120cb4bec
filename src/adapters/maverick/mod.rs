//! Maverick destination adapters
//!
//! - [`MaverickReader`]: query API (`/query`, `/entities/{type}`)
//! - [`MaverickDestination`]: operations as commands, relation dispatch
//! - [`HttpCommandPublisher`]: command gateway (`/commands`)
//! - [`DryRunPublisher`]: logs commands without sending them

pub mod client;
pub mod destination;
pub mod publisher;
pub mod reader;

pub use client::MaverickClient;
pub use destination::MaverickDestination;
pub use publisher::{DryRunPublisher, HttpCommandPublisher};
pub use reader::MaverickReader;
