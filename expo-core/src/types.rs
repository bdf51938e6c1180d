//! Domain types shared across the expo workspace.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Destination values are URL path segments, so those stay `String`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a tracked device (production station).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed POS check number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckNumber(pub String);

impl fmt::Display for CheckNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CheckNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CheckNumber {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A configured device: id, human-facing name, and the URL path segment its
/// snapshots are published to (appended to `{base_url}/api`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub destination: String,
}

/// One configured content source → destination pairing.
///
/// Several mappings may share a `source`; hashing and upload tracking are
/// keyed by `destination` so each fan-out target is synced independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMapping {
    pub source: PathBuf,
    pub destination: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
