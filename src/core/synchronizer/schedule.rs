//! Periodic synchronization
//!
//! The schedule is a singleton record (`enabled`, `interval_seconds`) shared
//! by every worker. The worker loop polls it and starts a run whenever the
//! interval has elapsed since the last one. The lock keeps concurrent
//! workers from running at the same time.

use super::service::SynchronizationService;
use crate::adapters::storage::ScheduleStore;
use crate::domain::sync::Schedule;
use crate::domain::{Result, SyncError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Reads and changes the schedule
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
    default_interval_seconds: u64,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>, default_interval_seconds: u64) -> Self {
        Self {
            store,
            default_interval_seconds,
        }
    }

    /// Enables periodic synchronization
    ///
    /// Without an interval the stored one is kept, or the configured default
    /// when none is stored.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero interval, or the store error.
    pub async fn enable(&self, interval_seconds: Option<u64>) -> Result<Schedule> {
        let interval = match interval_seconds {
            Some(0) => {
                return Err(SyncError::Validation(
                    "Schedule interval must be positive".to_string(),
                ))
            }
            Some(seconds) => seconds,
            None => self.get().await?.interval_seconds,
        };

        let schedule = Schedule::enabled(interval);
        self.store.set(&schedule).await?;
        tracing::info!(interval_seconds = interval, "Enabled scheduled synchronization");
        Ok(schedule)
    }

    pub async fn disable(&self) -> Result<Schedule> {
        let schedule = Schedule::disabled(self.get().await?.interval_seconds);
        self.store.set(&schedule).await?;
        tracing::info!("Disabled scheduled synchronization");
        Ok(schedule)
    }

    /// The stored schedule, or a disabled one with the default interval
    pub async fn get(&self) -> Result<Schedule> {
        Ok(self
            .store
            .get()
            .await?
            .unwrap_or_else(|| Schedule::disabled(self.default_interval_seconds)))
    }
}

/// Runs synchronizations on schedule until `shutdown` is raised
///
/// The schedule is re-read every `poll` so enabling, disabling or changing
/// the interval takes effect without a restart. A run that cannot start
/// (lock held, storage error) is logged and retried at the next poll.
pub async fn run_scheduled(
    schedule: &ScheduleService,
    service: &SynchronizationService,
    poll: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut last_run: Option<Instant> = None;

    tracing::info!(poll_seconds = poll.as_secs(), "Schedule worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        match schedule.get().await {
            Ok(current) if current.enabled => {
                let due = last_run.map_or(true, |at| {
                    at.elapsed() >= Duration::from_secs(current.interval_seconds)
                });
                if due {
                    last_run = Some(Instant::now());
                    match service.start(shutdown.clone()).await {
                        Ok(summary) => tracing::info!(
                            process_id = %summary.process_id,
                            status = %summary.status,
                            "Scheduled synchronization finished"
                        ),
                        Err(SyncError::Lock(reason)) => {
                            tracing::info!(reason = %reason, "Scheduled synchronization skipped")
                        }
                        Err(e) => {
                            crate::log_error_with_context!(e, "scheduled synchronization");
                        }
                    }
                }
            }
            Ok(_) => tracing::trace!("Schedule disabled"),
            Err(e) => tracing::warn!(error = %e, "Failed to read schedule"),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("Schedule worker stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;

    fn service() -> ScheduleService {
        ScheduleService::new(Arc::new(MemoryStorage::default()), 3600)
    }

    #[tokio::test]
    async fn test_default_schedule_is_disabled() {
        let schedule = service().get().await.unwrap();
        assert!(!schedule.enabled);
        assert_eq!(schedule.interval_seconds, 3600);
    }

    #[tokio::test]
    async fn test_enable_and_disable_keep_interval() {
        let service = service();

        let enabled = service.enable(Some(900)).await.unwrap();
        assert!(enabled.enabled);
        assert_eq!(enabled.interval_seconds, 900);

        let disabled = service.disable().await.unwrap();
        assert!(!disabled.enabled);
        assert_eq!(disabled.interval_seconds, 900);

        let again = service.enable(None).await.unwrap();
        assert_eq!(again.interval_seconds, 900);
        assert!(service.get().await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        assert!(matches!(
            service().enable(Some(0)).await,
            Err(SyncError::Validation(_))
        ));
    }
}
