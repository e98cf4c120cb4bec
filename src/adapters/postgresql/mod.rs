//! PostgreSQL storage integration
//!
//! Processes, staged entities, the lock and the schedule are kept in the
//! tables of `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgresStorage;
pub use client::PostgresClient;
pub use models::ProcessRow;
