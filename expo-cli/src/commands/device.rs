//! `expo device` — mark a prep station open or closed.
//!
//! The flag rides on the device's next published snapshot; a closed station's
//! board renders as closed until it is reopened.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use expo_daemon::request_mark_device;

#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    /// Mark a device open; its board shows the live queues again.
    Open { id: String },
    /// Mark a device closed.
    Close { id: String },
}

pub fn run(command: DeviceCommand, home: &Path, unattended: bool) -> Result<()> {
    let (id, closed) = match &command {
        DeviceCommand::Open { id } => (id, false),
        DeviceCommand::Close { id } => (id, true),
    };

    request_mark_device(home, id, closed)
        .context("failed to mark device (is the daemon running?)")?;
    if !unattended {
        println!(
            "device '{id}' marked {}",
            if closed { "closed" } else { "open" }
        );
    }
    Ok(())
}
