//! Configuration management for profile-sync.
//!
//! profile-sync reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PROFILE_SYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! The loaded [`SyncConfig`] is immutable and handed to the components that
//! need it at construction time.
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [sync]
//! batch_size = 500
//! entities = [
//!     { object_type = "organization", operations = ["all"], relations = ["add", "delete"] },
//!     { object_type = "group", operations = ["add", "update"], relations = ["add"] },
//!     { object_type = "user", operations = ["all"] },
//! ]
//!
//! [duplicate_detection]
//! match_display_names = true
//!
//! [source]
//! system_name = "LDAP"
//! path = "/var/lib/profile-sync/ldap-export.json"
//! converter = "lowercase_external_ids"
//!
//! [destination]
//! base_url = "https://maverick.example.com/api"
//! api_key = "${MAVERICK_API_KEY}"
//!
//! [storage]
//! backend = "postgresql"
//!
//! [storage.postgresql]
//! connection_string = "${PROFILE_SYNC_DATABASE_URL}"
//! ```
//!
//! # Validation
//!
//! ```rust,no_run
//! use profile_sync::config::load_config;
//!
//! # fn example() {
//! match load_config("profile-sync.toml") {
//!     Ok(config) => println!("Synchronizing {}", config.source.system_name),
//!     Err(e) => eprintln!("Configuration error: {}", e),
//! }
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, DestinationConfig, DestinationKind, DuplicateDetectionConfig,
    EntitySyncConfig, Environment, LoggingConfig, PostgreSQLConfig, RetryConfig,
    ScheduleConfig, SourceConfig, StorageBackend, StorageConfig, SyncConfig, SyncSettings,
};
pub use secret::{secret_string, SecretString, SecretValue};
