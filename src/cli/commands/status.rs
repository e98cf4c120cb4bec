//! Status command implementation
//!
//! This module implements the `status` command for displaying whether a
//! synchronization is running and the steps of the latest process.

use super::{exit_code_for, load_valid_config};
use crate::core::synchronizer::SynchronizationService;
use crate::domain::process::Process;
use crate::domain::sync::SyncStatus;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also print the hints and errors of every step
    #[arg(long)]
    pub verbose: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking synchronization status");

        println!("📊 Synchronization Status");
        println!();

        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let service = match SynchronizationService::from_config(config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to storage");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let status = match service.get_sync_status().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to read synchronization status");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let label = match status {
            SyncStatus::NotRunning => "⏸️  Not running",
            SyncStatus::Running => "🔄 Running",
            SyncStatus::Stuck => "❌ Stuck",
        };
        println!("Synchronization: {label}");
        println!();

        let latest = match service.latest_process().await {
            Ok(p) => p,
            Err(e) => {
                println!("❌ Failed to load processes");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        match latest {
            Some(process) => self.print_process(&process),
            None => {
                println!("No synchronization history found.");
                println!("Run 'profile-sync sync' to start synchronizing.");
            }
        }

        Ok(0)
    }

    fn print_process(&self, process: &Process) {
        println!("Latest process: {}", process.id);
        println!("  System: {}", process.system);
        println!("  Status: {}", process.status);
        println!("  Started: {}", process.created_at.format("%Y-%m-%d %H:%M:%S"));
        println!("  Last activity: {}", process.updated_at.format("%Y-%m-%d %H:%M:%S"));
        if let Some(finished_at) = process.finished_at {
            println!("  Finished: {}", finished_at.format("%Y-%m-%d %H:%M:%S"));
        }
        println!();

        println!(
            "{:<28} {:<22} {:>8} {:>7} {:>7} {:>7} {:>9} {:>9}",
            "Step", "Status", "Analyzed", "Create", "Update", "Delete", "Rel. add", "Rel. del"
        );
        println!("{}", "-".repeat(106));

        for step in &process.steps {
            println!(
                "{:<28} {:<22} {:>8} {:>7} {:>7} {:>7} {:>9} {:>9}",
                step.kind.to_string(),
                step.status.to_string(),
                step.temporary.analyzed,
                step.final_counts.create,
                step.final_counts.update,
                step.final_counts.delete,
                step.final_counts.relations_added,
                step.final_counts.relations_removed
            );

            if self.verbose {
                for hint in &step.hints {
                    println!("    hint: {hint}");
                }
                for error in &step.errors {
                    println!("    error: {error}");
                }
            }
        }
        println!();
    }
}
