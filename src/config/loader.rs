//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::SyncConfig;
use super::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into SyncConfig
/// 4. Applies environment variable overrides (PROFILE_SYNC_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, a referenced
/// environment variable is missing, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use profile_sync::config::loader::load_config;
///
/// let config = load_config("profile-sync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration text
///
/// # Errors
///
/// Same as [`load_config`], minus the file access.
pub fn parse_config(contents: &str) -> Result<SyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SyncConfig = toml::from_str(&contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Applies environment variable overrides using PROFILE_SYNC_* prefix
///
/// Environment variables follow the pattern: PROFILE_SYNC_<SECTION>_<KEY>
/// For example: PROFILE_SYNC_DESTINATION_BASE_URL, PROFILE_SYNC_SYNC_BATCH_SIZE
fn apply_env_overrides(config: &mut SyncConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("PROFILE_SYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_parse("PROFILE_SYNC_APPLICATION_DRY_RUN") {
        config.application.dry_run = val;
    }

    // Sync overrides
    if let Some(val) = env_parse("PROFILE_SYNC_SYNC_BATCH_SIZE") {
        config.sync.batch_size = val;
    }
    if let Some(val) = env_parse("PROFILE_SYNC_SYNC_CHECKPOINT_EVERY") {
        config.sync.checkpoint_every = val;
    }
    if let Some(val) = env_parse("PROFILE_SYNC_SYNC_STUCK_TIMEOUT_SECONDS") {
        config.sync.stuck_timeout_seconds = val;
    }

    // Source overrides
    if let Ok(val) = std::env::var("PROFILE_SYNC_SOURCE_SYSTEM_NAME") {
        config.source.system_name = val;
    }
    if let Ok(val) = std::env::var("PROFILE_SYNC_SOURCE_PATH") {
        config.source.path = val;
    }

    // Destination overrides
    if let Ok(val) = std::env::var("PROFILE_SYNC_DESTINATION_BASE_URL") {
        config.destination.base_url = val;
    }
    if let Ok(val) = std::env::var("PROFILE_SYNC_DESTINATION_API_KEY") {
        config.destination.api_key = Some(secret_string(val));
    }
    if let Some(val) = env_parse("PROFILE_SYNC_DESTINATION_TIMEOUT_SECONDS") {
        config.destination.timeout_seconds = val;
    }

    // Storage overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.storage.postgresql {
        if let Ok(val) = std::env::var("PROFILE_SYNC_STORAGE_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = env_parse("PROFILE_SYNC_STORAGE_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = val;
        }
    }

    // Logging overrides
    if let Some(val) = env_parse("PROFILE_SYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("PROFILE_SYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
