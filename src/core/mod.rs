//! Core synchronization logic
//!
//! - [`batch`] - Paging through sources and destinations
//! - [`transform`] - Per-system entity converters
//! - [`sync`] - Entity reconciliation (create, update, delete)
//! - [`relation`] - Relation reconciliation between staged and destination graphs
//! - [`process`] - Process creation and persistence
//! - [`temp`] - Per-run staging of reconciled entities
//! - [`synchronizer`] - Lock, schedule and run orchestration
//!
//! # Synchronization Workflow
//!
//! 1. **Lock**: Abort stale processes and take the distributed lock
//! 2. **Create Process**: One entity step per configured object type, then the relation steps
//! 3. **Entities**: Fetch the source, create or update matches, delete what disappeared
//! 4. **Relations**: Diff staged relations against the destination and dispatch the deltas
//! 5. **Finish**: Derive the process status, clear staged entities, release the lock
//!
//! # Example
//!
//! ```rust,no_run
//! use profile_sync::config::load_config;
//! use profile_sync::core::synchronizer::SynchronizationService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("profile-sync.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let service = SynchronizationService::from_config(config).await?;
//! let summary = service.start(shutdown_rx).await?;
//!
//! println!("Status: {}", summary.status);
//! println!("Created: {}", summary.totals.create);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod process;
pub mod relation;
pub mod sync;
pub mod synchronizer;
pub mod temp;
pub mod transform;
