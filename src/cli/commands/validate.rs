//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the profile-sync configuration file.

use crate::config::{load_config, DestinationKind, StorageBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            println!();
            return Ok(2);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.dry_run());
        println!("  Source System: {}", config.source.system_name);
        println!("  Source Path: {}", config.source.path);
        if let Some(converter) = &config.source.converter {
            println!("  Converter: {converter}");
        }

        match config.destination.kind {
            DestinationKind::Maverick => {
                println!("  Destination: Maverick ({})", config.destination.base_url);
                println!("  Max Retries: {}", config.destination.retry.max_retries);
            }
            DestinationKind::Memory => println!("  Destination: in-memory"),
        }

        match config.storage.backend {
            StorageBackend::Memory => println!("  Storage: in-memory"),
            StorageBackend::PostgreSQL => {
                if let Some(ref pg_config) = config.storage.postgresql {
                    use secrecy::ExposeSecret;
                    println!("  Storage: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        pg_config
                            .connection_string
                            .expose_secret()
                            .as_ref()
                            .split('@')
                            .next_back()
                            .unwrap_or("***")
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }

        println!("  Batch Size: {}", config.sync.batch_size);
        println!("  Lock TTL: {}s", config.sync.lock_ttl_seconds);
        println!("  Entities:");
        for entity in &config.sync.entities {
            let relations = if entity.relations.is_empty() {
                "none".to_string()
            } else {
                entity.relations.join(", ")
            };
            println!(
                "    - {}: operations [{}], relations [{}]",
                entity.object_type,
                entity.operations.join(", "),
                relations
            );
        }
        println!();
        Ok(0)
    }
}
