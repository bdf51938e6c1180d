//! # expo-sync
//!
//! Everything that leaves the process over HTTP: the snapshot publisher, the
//! destination-keyed content hash tracker, and the content sync cycle.
//!
//! All calls here are blocking (`ureq`); the daemon runs them through
//! `spawn_blocking` so no timer task is ever held up by a slow endpoint.

pub mod content;
pub mod error;
pub mod hash_store;
pub mod publish;
pub mod transport;

pub use content::{ContentSyncManager, CycleSummary};
pub use error::SyncError;
pub use publish::{PublishOutcome, SnapshotPublisher};
pub use transport::{HttpTransport, Transport};
