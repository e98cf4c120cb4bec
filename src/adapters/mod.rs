//! External system integrations for profile-sync.
//!
//! - [`source`] - source systems delivering entity batches
//! - [`destination`] - destination read/write traits and the in-memory store
//! - [`maverick`] - Maverick HTTP reader, command destination and publishers
//! - [`storage`] - temp, lock, schedule and process stores
//! - [`postgresql`] - PostgreSQL storage backend
//! - [`factory`] - builds the adapters selected by the configuration
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind `async_trait` traits held as
//! `Arc<dyn Trait>`, so the engines run unchanged against in-memory
//! implementations in tests.
//!
//! ```rust
//! use profile_sync::adapters::destination::{DestinationRead, InMemoryDestination};
//! use profile_sync::adapters::maverick::MaverickDestination;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryDestination::new());
//! let read: Arc<dyn DestinationRead> = store.clone();
//! let write = MaverickDestination::new(store);
//! # let _ = (read, write);
//! ```

pub mod destination;
pub mod factory;
pub mod maverick;
pub mod postgresql;
pub mod source;
pub mod storage;
