//! `expo daemon` — foreground pipeline run and socket lifecycle commands.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use expo_core::config::{config_path_at, load_at};
use expo_daemon::paths::socket_path;
use expo_daemon::{request_status, request_stop, start_blocking, DaemonError};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the pipeline in the foreground (log poll + sweeps + socket server).
    Run,
    /// Request graceful daemon shutdown over the unix socket.
    Stop,
    /// Query daemon runtime status over the unix socket.
    Status(DaemonStatusArgs),
}

#[derive(Args, Debug)]
pub struct DaemonStatusArgs {
    /// Print the raw status JSON instead of the summary.
    #[arg(long)]
    pub json: bool,
}

pub fn run(command: DaemonCommand, home: &Path, unattended: bool) -> Result<()> {
    match command {
        DaemonCommand::Run => {
            let config = load_at(&config_path_at(home))
                .context("failed to load pipeline config (~/.expo/config.yaml)")?;
            if !unattended {
                println!(
                    "starting expo pipeline (log: {})",
                    config.log_path.display()
                );
            }
            start_blocking(home, config).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match request_stop(home) {
            Ok(()) => {
                if !unattended {
                    println!("daemon stop requested");
                }
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                if !unattended {
                    println!("daemon is not running");
                }
            }
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status(args) => match request_status(home) {
            Ok(status) => print_status(&status, args.json)?,
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let payload = serde_json::json!({
                    "running": false,
                    "socket": socket_path(home).display().to_string(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        },
    }

    Ok(())
}

fn print_status(status: &serde_json::Value, raw: bool) -> Result<()> {
    if raw {
        println!(
            "{}",
            serde_json::to_string_pretty(status)
                .context("failed to render daemon status JSON")?
        );
        return Ok(());
    }

    println!("state: {}", status["state"].as_str().unwrap_or("unknown"));
    if let Some(devices) = status["devices"].as_array() {
        for device in devices {
            let closed = device["closed"].as_bool().unwrap_or(false);
            println!(
                "{}: {} preparing, {} ready{}",
                device["id"].as_str().unwrap_or("?"),
                device["preparing"],
                device["ready"],
                if closed { " (closed)" } else { "" },
            );
        }
    }
    if let Some(error) = status["last_error"].as_str() {
        println!("last error: {error}");
    }
    Ok(())
}
