//! CLI command implementations
//!
//! Every command returns its process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Synchronization finished with failures |
//! | 2 | Configuration error |
//! | 3 | Synchronization lock unavailable |
//! | 4 | Connection error (source, destination or storage) |
//! | 5 | Fatal error |

pub mod schedule;
pub mod status;
pub mod sync;
pub mod validate;
pub mod worker;

use crate::config::{load_config, SyncConfig};
use crate::domain::{DestinationError, SourceSystemError, SyncError};

/// Exit code for an error that stopped a command
pub fn exit_code_for(error: &SyncError) -> i32 {
    match error {
        SyncError::Configuration(_) | SyncError::Validation(_) => 2,
        SyncError::Lock(_) => 3,
        SyncError::Storage(_)
        | SyncError::Source(SourceSystemError::ConnectionFailed(_))
        | SyncError::Destination(DestinationError::ConnectionFailed(_))
        | SyncError::Destination(DestinationError::Timeout(_)) => 4,
        _ => 5,
    }
}

/// Loads and validates the configuration, printing the failure
///
/// Returns the exit code to stop with when the configuration is unusable.
pub(crate) fn load_valid_config(config_path: &str) -> Result<SyncConfig, i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            return Err(2);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        println!("❌ Configuration validation failed");
        println!("   Error: {e}");
        return Err(2);
    }

    Ok(config)
}
