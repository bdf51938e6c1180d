//! `expo sync` — run a content sync cycle on the running daemon.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use expo_daemon::request_content_sync;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Re-upload everything, ignoring the recorded content hashes.
    #[arg(long)]
    pub force: bool,
}

impl SyncArgs {
    pub fn run(&self, home: &Path, unattended: bool) -> Result<()> {
        let summary = request_content_sync(home, self.force)
            .context("failed to request content sync (is the daemon running?)")?;
        if !unattended {
            println!(
                "content sync: {} attempted, {} uploaded, {} unchanged, {} failed",
                summary["attempted"], summary["uploaded"], summary["unchanged"], summary["failed"],
            );
        }
        Ok(())
    }
}
