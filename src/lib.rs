//! # profile-sync - Directory to Maverick synchronization
//!
//! profile-sync reconciles users, groups, organizations, roles and functions
//! held by an external directory (the *source system*, e.g. LDAP) with the
//! Maverick user profile backend (the *destination*).
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Reconciling** entities: create, update and delete in Maverick what changed in the source
//! - **Detecting duplicates** so existing Maverick entities get linked instead of recreated
//! - **Reconciling relations** (memberships, role and function assignments) in both directions
//! - **Tracking** every run as a persisted process with per-step counters, hints and errors
//! - **Guarding** runs with a distributed lock and an optional schedule
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Reconciliation engines, process tracking and orchestration
//! - [`adapters`] - Source systems, Maverick, and process/lock storage
//! - [`domain`] - Entities, relations, commands and the process state machine
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use profile_sync::config::load_config;
//! use profile_sync::core::synchronizer::SynchronizationService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("profile-sync.toml")?;
//!     let service = SynchronizationService::from_config(config).await?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let summary = service.start(shutdown_rx).await?;
//!
//!     println!("{} finished with status {}", summary.process_id, summary.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::SyncError`]. Failures of single entities or
//! relations do not fail a run: they are recorded on the step of the process
//! and the run carries on.
//!
//! ```rust,no_run
//! use profile_sync::domain::SyncError;
//!
//! fn example() -> Result<(), SyncError> {
//!     let config = profile_sync::config::load_config("profile-sync.toml")?;
//!     config.validate().map_err(SyncError::Configuration)?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
