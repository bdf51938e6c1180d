//! Content hash tracker — SHA-256 digests of the last successfully uploaded
//! content, keyed by **destination path**, not by source.
//!
//! Keying by destination is what lets one source artifact fan out to several
//! destinations independently: each destination compares and uploads on its
//! own. Keyed by source, only the first of the fan-out uploads would happen.
//!
//! Persisted as a JSON document at `<home>/.expo/hashes.json` so a restart
//! does not re-upload unchanged content. Writes use an atomic `.tmp` + rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// In-memory tracker: destination path → last-uploaded SHA-256 hex digest.
pub type HashStore = HashMap<String, String>;

/// On-disk tracker payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashStoreFile {
    pub synced_at: DateTime<Utc>,
    pub destinations: HashStore,
}

/// `<home>/.expo/hashes.json`
pub fn store_path_at(home: &Path) -> PathBuf {
    home.join(".expo").join("hashes.json")
}

/// Load the tracker. Returns an empty store if the file does not yet exist.
pub fn load_at(home: &Path) -> Result<HashStoreFile, SyncError> {
    let path = store_path_at(home);
    if !path.exists() {
        return Ok(HashStoreFile {
            synced_at: Utc::now(),
            destinations: HashMap::new(),
        });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the tracker atomically: write `<path>.tmp`, then rename.
pub fn save_at(home: &Path, store: &HashStoreFile) -> Result<(), SyncError> {
    let path = store_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid hash store path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// SHA-256 hex digest of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Would uploading `bytes` to `destination` change what is already there?
/// An absent entry means changed.
pub fn has_changed(store: &HashStore, destination: &str, bytes: &[u8]) -> bool {
    store
        .get(destination)
        .map(|stored| stored != &digest(bytes))
        .unwrap_or(true)
}

/// Record a confirmed-successful upload. Never called speculatively.
pub fn record_success(store: &mut HashStore, destination: &str, bytes: &[u8]) {
    store.insert(destination.to_owned(), digest(bytes));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
