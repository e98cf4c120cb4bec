//! Result type alias for profile-sync
//!
//! This module provides a convenient Result type alias that uses SyncError
//! as the error type.

use super::errors::SyncError;

/// Result type alias for synchronization operations
///
/// # Examples
///
/// ```
/// use profile_sync::domain::result::Result;
/// use profile_sync::domain::errors::SyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;
