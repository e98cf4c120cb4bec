//! Adapter factory
//!
//! Builds the source, destination and storage adapters selected by the
//! configuration.

use crate::adapters::destination::{
    CommandPublisher, DestinationRead, DestinationWrite, InMemoryDestination,
};
use crate::adapters::maverick::{
    DryRunPublisher, HttpCommandPublisher, MaverickClient, MaverickDestination, MaverickReader,
};
use crate::adapters::postgresql::{PostgresClient, PostgresStorage};
use crate::adapters::source::{JsonFileSource, SourceSystem};
use crate::adapters::storage::{MemoryStorage, Storage};
use crate::config::{DestinationKind, StorageBackend, SyncConfig};
use crate::domain::{Result, SyncError};
use std::sync::Arc;

/// Read and write side of the destination
#[derive(Clone)]
pub struct Destination {
    pub read: Arc<dyn DestinationRead>,
    pub write: Arc<dyn DestinationWrite>,
}

/// Create the source system adapter
pub fn create_source(config: &SyncConfig) -> Arc<dyn SourceSystem> {
    tracing::info!(
        system = %config.source.system_name,
        path = %config.source.path,
        "Creating JSON export source"
    );
    Arc::new(JsonFileSource::new(
        config.source.system_name.clone(),
        &config.source.path,
    ))
}

/// Create the destination adapters
///
/// In dry-run mode commands are logged by a [`DryRunPublisher`] instead of
/// being published.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created
pub fn create_destination(config: &SyncConfig) -> Result<Destination> {
    match config.destination.kind {
        DestinationKind::Maverick => {
            tracing::info!(base_url = %config.destination.base_url, "Creating Maverick destination");
            let client = Arc::new(MaverickClient::new(&config.destination)?);
            let publisher: Arc<dyn CommandPublisher> = if config.dry_run() {
                Arc::new(DryRunPublisher)
            } else {
                Arc::new(HttpCommandPublisher::new(client.clone()))
            };

            Ok(Destination {
                read: Arc::new(MaverickReader::new(client)),
                write: Arc::new(MaverickDestination::new(publisher)),
            })
        }
        DestinationKind::Memory => {
            tracing::info!("Creating in-memory destination");
            let store = Arc::new(InMemoryDestination::new());
            let publisher: Arc<dyn CommandPublisher> = if config.dry_run() {
                Arc::new(DryRunPublisher)
            } else {
                store.clone()
            };

            Ok(Destination {
                read: store,
                write: Arc::new(MaverickDestination::new(publisher)),
            })
        }
    }
}

/// Create the storage backend
///
/// For PostgreSQL the schema is created if missing.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or initialized
pub async fn create_storage(config: &SyncConfig) -> Result<Storage> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Creating in-memory storage");
            Ok(Storage::from_backend(Arc::new(MemoryStorage::new())))
        }
        StorageBackend::PostgreSQL => {
            let pg_config = config.storage.postgresql.as_ref().ok_or_else(|| {
                SyncError::Configuration(
                    "storage.postgresql configuration is required when backend = 'postgresql'"
                        .to_string(),
                )
            })?;

            let client = PostgresClient::new(pg_config.clone()).await?;
            tracing::info!(
                target_db = %client.connection_string_safe(),
                "Creating PostgreSQL storage"
            );
            client.ensure_schema().await?;

            Ok(Storage::from_backend(Arc::new(PostgresStorage::new(client))))
        }
    }
}
