//! Content sync cycle — re-reads configured sources and uploads only the
//! destinations whose content actually changed.
//!
//! Each mapping is processed and reported independently: a missing source or
//! a failed upload never blocks the remaining mappings.

use std::fmt;
use std::sync::Arc;

use expo_core::ContentMapping;

use crate::hash_store::{has_changed, record_success, HashStore};
use crate::transport::Transport;

/// Per-cycle accounting, logged by the caller as the cycle summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub attempted: usize,
    pub uploaded: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted, {} uploaded, {} unchanged, {} failed",
            self.attempted, self.uploaded, self.unchanged, self.failed
        )
    }
}

/// Runs the hash-gated upload cycle over the configured mappings.
///
/// The hash store is caller-held so the daemon can persist it after each
/// cycle and clear it for `force_sync`.
pub struct ContentSyncManager {
    mappings: Vec<ContentMapping>,
    transport: Arc<dyn Transport>,
}

impl ContentSyncManager {
    pub fn new(mappings: Vec<ContentMapping>, transport: Arc<dyn Transport>) -> Self {
        Self {
            mappings,
            transport,
        }
    }

    /// One sync cycle: read every source, upload every changed destination.
    pub fn run_cycle(&self, store: &mut HashStore) -> CycleSummary {
        let mut summary = CycleSummary::default();
        for mapping in &self.mappings {
            summary.attempted += 1;
            let bytes = match std::fs::read(&mapping.source) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(
                        source = %mapping.source.display(),
                        destination = %mapping.destination,
                        error = %err,
                        "content source unreadable; mapping skipped this cycle"
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            if !has_changed(store, &mapping.destination, &bytes) {
                summary.unchanged += 1;
                continue;
            }

            match self.transport.post_bytes(&mapping.destination, &bytes) {
                Ok(()) => {
                    record_success(store, &mapping.destination, &bytes);
                    summary.uploaded += 1;
                    tracing::info!(
                        destination = %mapping.destination,
                        bytes = bytes.len(),
                        "content uploaded"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        destination = %mapping.destination,
                        error = %err,
                        "content upload failed; will retry next cycle"
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Manual cache-bust: forget every tracked digest, then run a cycle.
    pub fn force_sync(&self, store: &mut HashStore) -> CycleSummary {
        store.clear();
        self.run_cycle(store)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use crate::error::SyncError;

    #[derive(Default)]
    struct RecordingTransport {
        uploads: Mutex<Vec<String>>,
        failing: Mutex<HashSet<String>>,
    }

    impl RecordingTransport {
        fn fail_destination(&self, destination: &str) {
            self.failing.lock().unwrap().insert(destination.to_owned());
        }

        fn uploads(&self) -> Vec<String> {
            self.uploads.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn post_json(&self, _path: &str, _body: &str) -> Result<(), SyncError> {
            Ok(())
        }

        fn post_bytes(&self, path: &str, _body: &[u8]) -> Result<(), SyncError> {
            if self.failing.lock().unwrap().contains(path) {
                return Err(SyncError::Status {
                    status: 503,
                    path: path.to_owned(),
                });
            }
            self.uploads.lock().unwrap().push(path.to_owned());
            Ok(())
        }
    }

    fn mapping(source: PathBuf, destination: &str) -> ContentMapping {
        ContentMapping {
            source,
            destination: destination.to_owned(),
        }
    }

    #[test]
    fn second_cycle_with_unchanged_source_uploads_nothing() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("menu.json");
        std::fs::write(&source, b"menu v1").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let manager = ContentSyncManager::new(
            vec![mapping(source, "/content/menu")],
            transport.clone(),
        );
        let mut store = HashStore::new();

        let first = manager.run_cycle(&mut store);
        assert_eq!((first.uploaded, first.unchanged), (1, 0));

        let second = manager.run_cycle(&mut store);
        assert_eq!((second.uploaded, second.unchanged), (0, 1));
        assert_eq!(transport.uploads().len(), 1);
    }

    #[test]
    fn force_sync_reuploads_regardless_of_hash() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("menu.json");
        std::fs::write(&source, b"menu v1").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let manager = ContentSyncManager::new(
            vec![mapping(source, "/content/menu")],
            transport.clone(),
        );
        let mut store = HashStore::new();

        manager.run_cycle(&mut store);
        let forced = manager.force_sync(&mut store);
        assert_eq!(forced.uploaded, 1);
        assert_eq!(transport.uploads().len(), 2);
    }

    #[test]
    fn fan_out_destinations_upload_independently() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("menu.json");
        std::fs::write(&source, b"menu v1").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let manager = ContentSyncManager::new(
            vec![
                mapping(source.clone(), "/content/menu-a"),
                mapping(source.clone(), "/content/menu-b"),
                mapping(source.clone(), "/content/menu-c"),
            ],
            transport.clone(),
        );
        let mut store = HashStore::new();

        assert_eq!(manager.run_cycle(&mut store).uploaded, 3);

        // Source changes: all three destinations upload again, not just one.
        std::fs::write(&source, b"menu v2").unwrap();
        let changed = manager.run_cycle(&mut store);
        assert_eq!(changed.uploaded, 3);
        assert_eq!(transport.uploads().len(), 6);
    }

    #[test]
    fn one_failing_mapping_does_not_block_the_rest() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("menu.json");
        std::fs::write(&source, b"menu").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        transport.fail_destination("/content/menu-b");
        let manager = ContentSyncManager::new(
            vec![
                mapping(source.clone(), "/content/menu-a"),
                mapping(source.clone(), "/content/menu-b"),
                mapping(source.clone(), "/content/menu-c"),
            ],
            transport.clone(),
        );
        let mut store = HashStore::new();

        let summary = manager.run_cycle(&mut store);
        assert_eq!((summary.uploaded, summary.failed), (2, 1));
        assert_eq!(transport.uploads(), vec!["/content/menu-a", "/content/menu-c"]);

        // The failed destination retries next cycle; the others are settled.
        let retry = manager.run_cycle(&mut store);
        assert_eq!((retry.uploaded, retry.unchanged, retry.failed), (0, 2, 1));
    }

    #[test]
    fn missing_source_counts_failed_and_continues() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present.json");
        std::fs::write(&present, b"data").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let manager = ContentSyncManager::new(
            vec![
                mapping(dir.path().join("absent.json"), "/content/absent"),
                mapping(present, "/content/present"),
            ],
            transport.clone(),
        );
        let mut store = HashStore::new();

        let summary = manager.run_cycle(&mut store);
        assert_eq!((summary.attempted, summary.uploaded, summary.failed), (2, 1, 1));
        assert_eq!(transport.uploads(), vec!["/content/present"]);
    }

    #[test]
    fn failed_upload_does_not_record_digest() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("menu.json");
        std::fs::write(&source, b"menu").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        transport.fail_destination("/content/menu");
        let manager =
            ContentSyncManager::new(vec![mapping(source, "/content/menu")], transport.clone());
        let mut store = HashStore::new();

        manager.run_cycle(&mut store);
        assert!(store.is_empty(), "digest recorded only after success");
    }
}
