//! Sync command implementation
//!
//! This module implements the `sync` command, which runs one
//! synchronization in the foreground and prints its summary.

use super::{exit_code_for, load_valid_config};
use crate::core::synchronizer::{SyncSummary, SynchronizationService};
use crate::domain::process::{ProcessStatus, StepStatus};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Dry run mode - log Maverick commands instead of publishing them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the page size used for source and destination reads
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size, "Overriding batch size from CLI");
            config.sync.batch_size = batch_size;
            if let Err(e) = config.validate() {
                println!("❌ Invalid --batch-size");
                println!("   Error: {e}");
                return Ok(2);
            }
        }

        if config.dry_run() {
            println!("🔍 DRY RUN MODE - No commands will be published to Maverick");
            println!();
        }

        let service = match SynchronizationService::from_config(config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create synchronization service");
                eprintln!("Failed to initialize synchronization: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🚀 Synchronizing {}...", service.config().source.system_name);
        println!();

        let summary = match service.start(shutdown_signal).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Synchronization failed");
                eprintln!("Synchronization failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        print_summary(&summary);
        Ok(exit_code(&summary))
    }
}

fn print_summary(summary: &SyncSummary) {
    println!("📊 Synchronization Summary:");
    println!("  Process: {}", summary.process_id);
    println!("  Status: {}", summary.status);
    println!("  Created: {}", summary.totals.create);
    println!("  Updated: {}", summary.totals.update);
    println!("  Deleted: {}", summary.totals.delete);
    println!("  Relations added: {}", summary.totals.relations_added);
    println!("  Relations removed: {}", summary.totals.relations_removed);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    println!(
        "{:<28} {:<22} {:>7} {:>7} {:>7} {:>7}",
        "Step", "Status", "Create", "Update", "Delete", "Errors"
    );
    println!("{}", "-".repeat(84));
    for step in &summary.steps {
        println!(
            "{:<28} {:<22} {:>7} {:>7} {:>7} {:>7}",
            step.kind.to_string(),
            step.status.to_string(),
            step.counts.create,
            step.counts.update,
            step.counts.delete,
            step.errors.len()
        );
    }
    println!();

    let notes: Vec<_> = summary
        .steps
        .iter()
        .flat_map(|s| s.hints.iter().chain(s.errors.iter()).map(move |m| (s.kind, m)))
        .collect();
    if !notes.is_empty() {
        println!("⚠️  Hints and errors:");
        for (kind, message) in notes.iter().take(10) {
            println!("  - {kind}: {message}");
        }
        if notes.len() > 10 {
            println!("  ... and {} more", notes.len() - 10);
        }
        println!();
    }
}

/// 0 for a clean run, 1 when a step failed or entities could not be synced
fn exit_code(summary: &SyncSummary) -> i32 {
    if summary.status == ProcessStatus::Aborted {
        println!("⚠️  Synchronization interrupted. The next run starts a fresh process.");
        tracing::info!("Synchronization interrupted by user signal");
        return 130;
    }

    let failed_steps = summary
        .steps
        .iter()
        .any(|s| s.status == StepStatus::Failure);
    if summary.status == ProcessStatus::Failed || failed_steps || summary.error_count() > 0 {
        println!("⚠️  Synchronization completed with failures");
        1
    } else {
        println!("✅ Synchronization completed successfully!");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::ProcessId;
    use crate::domain::process::FinalCounters;
    use std::time::Duration;

    fn summary(status: ProcessStatus) -> SyncSummary {
        SyncSummary {
            process_id: ProcessId::new(),
            system: "LDAP".to_string(),
            status,
            totals: FinalCounters::default(),
            steps: Vec::new(),
            duration: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_sync_args_defaults() {
        let args = SyncArgs {
            dry_run: false,
            batch_size: None,
        };
        assert!(!args.dry_run);
        assert!(args.batch_size.is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&summary(ProcessStatus::Completed)), 0);
        assert_eq!(exit_code(&summary(ProcessStatus::CompletedWithHints)), 0);
        assert_eq!(exit_code(&summary(ProcessStatus::Failed)), 1);
        assert_eq!(exit_code(&summary(ProcessStatus::Aborted)), 130);
    }
}
