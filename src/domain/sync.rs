//! Lock, schedule and status records

use super::{Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of the singleton synchronization lock record
pub const SYNC_LOCK_KEY: &str = "profile-sync:lock";

/// Distributed synchronization lock
///
/// Absence of the record, or `is_released == true`, means a run may start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLock {
    pub is_released: bool,
    pub updated_at: DateTime<Utc>,
}

impl SyncLock {
    pub fn held() -> Self {
        Self {
            is_released: false,
            updated_at: Utc::now(),
        }
    }

    pub fn released() -> Self {
        Self {
            is_released: true,
            updated_at: Utc::now(),
        }
    }

    /// Expiry instant of a lock record written now with `ttl_seconds`
    pub fn expiry(ttl_seconds: u64) -> Result<DateTime<Utc>> {
        i64::try_from(ttl_seconds)
            .ok()
            .filter(|secs| *secs <= i64::MAX / 1000)
            .map(Duration::seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| SyncError::Lock(format!("Lock TTL of {ttl_seconds}s is out of range")))
    }
}

/// Periodic synchronization schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn enabled(interval_seconds: u64) -> Self {
        Self {
            enabled: true,
            interval_seconds,
            updated_at: Utc::now(),
        }
    }

    pub fn disabled(interval_seconds: u64) -> Self {
        Self {
            enabled: false,
            interval_seconds,
            updated_at: Utc::now(),
        }
    }
}

/// Tri-state answer of a status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    NotRunning,
    Running,
    /// An unfinished run has shown no activity for longer than the timeout
    Stuck,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::NotRunning => f.write_str("not running"),
            SyncStatus::Running => f.write_str("running"),
            SyncStatus::Stuck => f.write_str("stuck"),
        }
    }
}
