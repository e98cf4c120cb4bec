//! Shared harness for the synchronization integration tests
//!
//! Wires a [`SynchronizationService`] to an in-memory source, the in-memory
//! Maverick store (behind the real command destination) and in-memory
//! storage.

#![allow(dead_code)]

use profile_sync::adapters::destination::InMemoryDestination;
use profile_sync::adapters::factory::Destination;
use profile_sync::adapters::maverick::MaverickDestination;
use profile_sync::adapters::source::InMemorySource;
use profile_sync::adapters::storage::{MemoryStorage, Storage};
use profile_sync::config::{parse_config, SyncConfig};
use profile_sync::core::synchronizer::{SyncSummary, SynchronizationService};
use profile_sync::domain::entity::SyncEntity;
use profile_sync::domain::ids::ExternalId;
use std::sync::Arc;
use tokio::sync::watch;

pub const SYSTEM: &str = "LDAP";

pub fn ldap(id: &str) -> ExternalId {
    ExternalId::new(id, SYSTEM).unwrap()
}

/// Configuration with the given `[[sync.entities]]` tables
pub fn config_with(entities: &str) -> SyncConfig {
    parse_config(&format!(
        r#"
[application]
log_level = "debug"

[sync]
batch_size = 2
checkpoint_every = 1
status_interval_seconds = 3600

{entities}

[source]
system_name = "{SYSTEM}"
path = "unused.json"

[destination]
kind = "memory"

[logging]
local_enabled = false
"#
    ))
    .unwrap()
}

pub struct Harness {
    pub source: Arc<InMemorySource>,
    pub destination: Arc<InMemoryDestination>,
    pub storage: Arc<MemoryStorage>,
    pub service: SynchronizationService,
}

impl Harness {
    pub fn new(config: SyncConfig, entities: Vec<SyncEntity>) -> Self {
        let source = Arc::new(InMemorySource::with_entities(SYSTEM, entities));
        let destination = Arc::new(InMemoryDestination::new());
        let storage = Arc::new(MemoryStorage::default());

        let service = SynchronizationService::new(
            config,
            source.clone(),
            Destination {
                read: destination.clone(),
                write: Arc::new(MaverickDestination::new(destination.clone())),
            },
            Storage::from_backend(storage.clone()),
        )
        .unwrap();

        Self {
            source,
            destination,
            storage,
            service,
        }
    }

    /// Runs one synchronization to completion
    pub async fn run(&self) -> SyncSummary {
        let (_tx, rx) = watch::channel(false);
        self.service.start(rx).await.unwrap()
    }

    /// Number of published commands named `name`
    pub async fn command_count(&self, name: &str) -> usize {
        self.destination
            .commands()
            .await
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }
}
