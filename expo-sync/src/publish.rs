//! Snapshot publisher — renders a device snapshot into the wire payload and
//! pushes it to the endpoint.
//!
//! There is no automatic retry of a failed publish: the next state change for
//! the device triggers a fresh publish, which is the de facto retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::SecondsFormat;
use serde::Serialize;

use expo_state::Snapshot;

use crate::error::SyncError;
use crate::transport::Transport;

/// What `publish` did with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// One POST was issued and acknowledged.
    Published,
    /// Startup suppression is active; no network call was made.
    Suppressed,
    /// The device has no destination configured; nothing to publish until
    /// configuration is corrected.
    NoDestination,
}

#[derive(Debug, Serialize)]
struct PreparingEntry {
    id: String,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Debug, Serialize)]
struct ReadyEntry {
    id: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "readyAt")]
    ready_at: String,
}

#[derive(Debug, Serialize)]
struct SnapshotPayload {
    name: String,
    timestamp: String,
    status: &'static str,
    preparing: Vec<PreparingEntry>,
    ready: Vec<ReadyEntry>,
}

impl SnapshotPayload {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            timestamp: iso(snapshot.taken_at),
            status: if snapshot.closed { "closed" } else { "open" },
            preparing: snapshot
                .preparing
                .iter()
                .map(|order| PreparingEntry {
                    id: order.check.0.clone(),
                    created_at: iso(order.created_at),
                })
                .collect(),
            ready: snapshot
                .ready
                .iter()
                .map(|order| ReadyEntry {
                    id: order.check.0.clone(),
                    created_at: iso(order.created_at),
                    ready_at: iso(order.done_at.unwrap_or(order.created_at)),
                })
                .collect(),
        }
    }
}

fn iso(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Publishes device snapshots, honoring the startup-suppression flag.
pub struct SnapshotPublisher {
    transport: Arc<dyn Transport>,
    suppress: AtomicBool,
}

impl SnapshotPublisher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            suppress: AtomicBool::new(false),
        }
    }

    /// While set, `publish` is a no-op and makes no network calls.
    pub fn set_suppressed(&self, suppressed: bool) {
        self.suppress.store(suppressed, Ordering::SeqCst);
    }

    pub fn suppressed(&self) -> bool {
        self.suppress.load(Ordering::SeqCst)
    }

    /// Render `snapshot` and issue one HTTP POST to `/api{destination}`.
    pub fn publish(&self, snapshot: &Snapshot) -> Result<PublishOutcome, SyncError> {
        if self.suppressed() {
            tracing::debug!(device = %snapshot.device, "publish suppressed during startup");
            return Ok(PublishOutcome::Suppressed);
        }
        if snapshot.destination.is_empty() {
            tracing::warn!(device = %snapshot.device, "no destination configured; publish skipped");
            return Ok(PublishOutcome::NoDestination);
        }

        let payload = serde_json::to_string(&SnapshotPayload::from_snapshot(snapshot))?;
        let path = format!("/api{}", snapshot.destination);
        self.transport.post_json(&path, &payload)?;
        tracing::debug!(device = %snapshot.device, %path, "snapshot published");
        Ok(PublishOutcome::Published)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
