//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for profile-sync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// profile-sync - Directory to Maverick synchronization
#[derive(Parser, Debug)]
#[command(name = "profile-sync")]
#[command(version, about, long_about = None)]
#[command(author = "Profile Sync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "profile-sync.toml", env = "PROFILE_SYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PROFILE_SYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one synchronization now
    Sync(commands::sync::SyncArgs),

    /// Show whether a synchronization is running and the latest process
    Status(commands::status::StatusArgs),

    /// Enable, disable or show scheduled synchronization
    Schedule(commands::schedule::ScheduleArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Run scheduled synchronizations until interrupted
    Worker(commands::worker::WorkerArgs),
}
