//! Storage adapters
//!
//! [`MemoryStorage`] and [`crate::adapters::postgresql::PostgresStorage`]
//! implement every store trait.

pub mod memory;
pub mod traits;

pub use memory::MemoryStorage;
pub use traits::{LockStore, ProcessRepository, ScheduleStore, Storage, TempStore};
