//! Domain error types
//!
//! This module defines the error hierarchy for profile-sync. Errors are
//! domain-specific and don't expose third-party types: adapters convert
//! HTTP, database and serialization failures into these variants.

use thiserror::Error;

/// Main synchronization error type
///
/// This is the primary error type used throughout the crate.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors (never retryable)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source system errors
    #[error("Source system error: {0}")]
    Source(#[from] SourceSystemError),

    /// Destination system errors
    #[error("Destination system error: {0}")]
    Destination(#[from] DestinationError),

    /// Storage errors (temp store, process repository, lock store)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Synchronization lock errors
    #[error("Lock error: {0}")]
    Lock(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was cancelled through the shutdown signal
    #[error("Synchronization cancelled")]
    Cancelled,

    /// A known gap: the operation exists in the model but is not supported
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Whether retrying the failed operation can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Source(SourceSystemError::ConnectionFailed(_)) => true,
            SyncError::Destination(e) => e.is_retryable(),
            SyncError::Storage(_) | SyncError::Lock(_) => true,
            _ => false,
        }
    }
}

/// Source system errors
///
/// Errors that occur when reading entity batches from the external system.
#[derive(Debug, Error)]
pub enum SourceSystemError {
    /// Failed to connect to the source system
    #[error("Failed to connect to source system: {0}")]
    ConnectionFailed(String),

    /// Invalid response from the source system
    #[error("Invalid response from source system: {0}")]
    InvalidResponse(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

/// Destination system errors
///
/// Errors that occur when querying the Maverick profile store or publishing
/// commands to it.
#[derive(Debug, Error)]
pub enum DestinationError {
    /// Failed to connect to the destination
    #[error("Failed to connect to destination: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Command was rejected by the destination
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl DestinationError {
    /// Transient failures are connection problems, timeouts and 5xx responses
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DestinationError::ConnectionFailed(_)
                | DestinationError::Timeout(_)
                | DestinationError::ServerError { .. }
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_source_error_conversion() {
        let source_err = SourceSystemError::ConnectionFailed("Network error".to_string());
        let err: SyncError = source_err.into();
        assert!(matches!(err, SyncError::Source(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_destination_error_conversion() {
        let dest_err = DestinationError::ServerError {
            status: 503,
            message: "unavailable".to_string(),
        };
        let err: SyncError = dest_err.into();
        assert!(matches!(err, SyncError::Destination(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err: SyncError = DestinationError::ClientError {
            status: 400,
            message: "bad filter".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(!SyncError::Configuration("x".to_string()).is_retryable());
        assert!(!SyncError::Unsupported("x".to_string()).is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SyncError = io_err.into();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SyncError = json_err.into();
        assert!(matches!(err, SyncError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: SyncError = toml_err.into();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
