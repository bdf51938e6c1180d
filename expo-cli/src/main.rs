//! Expo — POS status log to expo-board bridge.
//!
//! # Usage
//!
//! ```text
//! expo daemon run
//! expo daemon status [--json]
//! expo daemon stop
//! expo sync [--force]
//! expo device open <id>
//! expo device close <id>
//! ```
//!
//! `--unattended` suppresses acknowledgment output for service managers;
//! `--home` overrides the directory under which `.expo/` is resolved.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{daemon::DaemonCommand, device::DeviceCommand, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "expo",
    version,
    about = "Bridge POS order status to kitchen expo boards",
    long_about = None,
)]
struct Cli {
    /// Resolve `.expo/` under this directory instead of the home directory.
    #[arg(long, global = true, hide = true)]
    home: Option<PathBuf>,

    /// Suppress acknowledgment output (for service managers and cron).
    #[arg(long, global = true)]
    unattended: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the background pipeline daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Run a content sync cycle on the running daemon.
    Sync(SyncArgs),

    /// Mark a prep station open or closed.
    Device {
        #[command(subcommand)]
        command: DeviceCommand,
    },
}

fn resolve_home(overridden: Option<PathBuf>) -> Result<PathBuf> {
    match overridden {
        Some(home) => Ok(home),
        None => dirs::home_dir().context("could not determine home directory"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = resolve_home(cli.home)?;
    let unattended = cli.unattended;

    match cli.command {
        Commands::Daemon { command } => commands::daemon::run(command, &home, unattended),
        Commands::Sync(args) => args.run(&home, unattended),
        Commands::Device { command } => commands::device::run(command, &home, unattended),
    }
}
