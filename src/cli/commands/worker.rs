//! Worker command implementation
//!
//! This module implements the `worker` command: a long-running process that
//! starts synchronizations according to the stored schedule until it
//! receives a shutdown signal.

use super::{exit_code_for, load_valid_config};
use crate::adapters::factory::{create_destination, create_source, create_storage};
use crate::core::synchronizer::{run_scheduled, ScheduleService, SynchronizationService};
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the worker command
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Enable the schedule before starting, with this interval in seconds
    #[arg(long)]
    pub enable_schedule: Option<u64>,
}

impl WorkerArgs {
    /// Execute the worker command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting worker command");

        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let storage = match create_storage(&config).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to connect to storage: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let destination = match create_destination(&config) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Failed to create destination: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let source = create_source(&config);

        let schedule = ScheduleService::new(
            storage.schedule.clone(),
            config.schedule.default_interval_seconds,
        );
        let poll = Duration::from_secs(config.schedule.poll_seconds);
        let shutdown_timeout = Duration::from_secs(config.sync.shutdown_timeout_secs);

        if self.enable_schedule.is_some() || config.schedule.enable_on_start {
            if let Err(e) = schedule.enable(self.enable_schedule).await {
                eprintln!("Failed to enable the schedule: {e}");
                return Ok(exit_code_for(&e));
            }
        }

        let service = match SynchronizationService::new(config, source, destination, storage) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to initialize synchronization: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🕒 Worker started, polling the schedule every {}s", poll.as_secs());

        let mut signal = shutdown_signal.clone();
        let worker = run_scheduled(&schedule, &service, poll, shutdown_signal);
        tokio::pin!(worker);

        // After a shutdown signal the active run gets `shutdown_timeout` to
        // abort its process and release the lock.
        let outcome = tokio::select! {
            outcome = &mut worker => outcome,
            _ = async {
                while !*signal.borrow() {
                    if signal.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                tracing::warn!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Worker did not stop within the shutdown timeout"
                );
                println!("⚠️  Worker did not stop within {}s", shutdown_timeout.as_secs());
                return Ok(5);
            }
        };

        match outcome {
            Ok(()) => {
                println!("✅ Worker stopped");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Worker failed");
                eprintln!("Worker failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
