//! Schedule command implementation
//!
//! This module implements `schedule enable|disable|show`. The schedule is
//! stored with the process state, so every worker sharing the storage sees
//! the change at its next poll.

use super::{exit_code_for, load_valid_config};
use crate::adapters::factory::create_storage;
use crate::config::StorageBackend;
use crate::core::synchronizer::ScheduleService;
use crate::domain::sync::Schedule;
use clap::{Args, Subcommand};

/// Arguments for the schedule command
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub action: ScheduleAction,
}

/// Schedule actions
#[derive(Subcommand, Debug)]
pub enum ScheduleAction {
    /// Enable scheduled synchronization
    Enable {
        /// Seconds between runs (defaults to the stored or configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Disable scheduled synchronization
    Disable,

    /// Show the current schedule
    Show,
}

impl ScheduleArgs {
    /// Execute the schedule command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if config.storage.backend == StorageBackend::Memory {
            println!("⚠️  storage.backend is 'memory': the schedule is not kept after this command");
        }

        let storage = match create_storage(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to storage");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let service = ScheduleService::new(
            storage.schedule.clone(),
            config.schedule.default_interval_seconds,
        );

        let outcome = match self.action {
            ScheduleAction::Enable { interval } => service.enable(interval).await,
            ScheduleAction::Disable => service.disable().await,
            ScheduleAction::Show => service.get().await,
        };

        match outcome {
            Ok(schedule) => {
                print_schedule(&schedule);
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Schedule command failed");
                println!("❌ Failed to update the schedule");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

fn print_schedule(schedule: &Schedule) {
    let state = if schedule.enabled {
        "✅ Enabled"
    } else {
        "⏸️  Disabled"
    };
    println!("Scheduled synchronization: {state}");
    println!("  Interval: {}s", schedule.interval_seconds);
}
