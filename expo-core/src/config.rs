//! YAML configuration for the expo pipeline.
//!
//! # Storage layout
//!
//! ```text
//! ~/.expo/
//!   config.yaml   (pipeline configuration, owned by the deployer)
//! ```
//!
//! # API pattern
//!
//! Loaders come in two forms:
//! - `load_at(path)` — explicit path; used in tests with `TempDir`
//! - `load()` — derives the path from `dirs::home_dir()`, delegates to `load_at`
//!
//! Tests must NEVER call the no-arg wrapper; always use `load_at`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{ContentMapping, Device};

/// Character width of the tailed log file.
///
/// The producing system writes with a fixed encoding; reading with the wrong
/// width makes every line silently fail to parse, so this is explicit config
/// rather than a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    #[default]
    Utf8,
    Utf16le,
}

/// Publish endpoint settings: base URL and the static API key header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Full pipeline configuration, read-only to the pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the append-only status log written by the POS controller.
    pub log_path: PathBuf,
    #[serde(default)]
    pub log_encoding: LogEncoding,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long a completed order stays visible in the ready list.
    #[serde(default = "default_ready_ttl_minutes")]
    pub ready_ttl_minutes: i64,
    /// Expiration sweep period — independent of log activity.
    #[serde(default = "default_expire_interval_secs")]
    pub expire_interval_secs: u64,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub content: Vec<ContentMapping>,
    #[serde(default = "default_content_sync_interval_secs")]
    pub content_sync_interval_secs: u64,
    pub endpoint: Endpoint,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_ready_ttl_minutes() -> i64 {
    30
}

fn default_expire_interval_secs() -> u64 {
    60
}

fn default_content_sync_interval_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    10
}

/// `<home>/.expo/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".expo").join("config.yaml")
}

/// Load the configuration from an explicit path.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// `load_at` convenience wrapper — resolves `~/.expo/config.yaml`.
pub fn load() -> Result<Config, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&config_path_at(&home))
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for device in &config.devices {
        if !seen.insert(&device.id) {
            return Err(ConfigError::DuplicateDevice {
                id: device.id.0.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).expect("write config");
        path
    }

    const MINIMAL: &str = r#"
log_path: /var/pos/status.log
endpoint:
  base_url: "https://boards.example.com"
  api_key: "k-123"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, MINIMAL);
        let config = load_at(&path).expect("load");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.ready_ttl_minutes, 30);
        assert_eq!(config.expire_interval_secs, 60);
        assert_eq!(config.content_sync_interval_secs, 300);
        assert_eq!(config.log_encoding, LogEncoding::Utf8);
        assert_eq!(config.endpoint.timeout_secs, 10);
        assert!(config.devices.is_empty());
        assert!(config.content.is_empty());
    }

    #[test]
    fn full_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
log_path: /var/pos/status.log
log_encoding: utf16le
poll_interval_ms: 250
ready_ttl_minutes: 5
devices:
  - id: grill
    name: Grill Station
    destination: /stations/grill
content:
  - source: /opt/pos/menu.json
    destination: /content/menu-a
  - source: /opt/pos/menu.json
    destination: /content/menu-b
endpoint:
  base_url: "https://boards.example.com"
  api_key: "k-123"
  timeout_secs: 3
"#,
        );
        let config = load_at(&path).expect("load");
        assert_eq!(config.log_encoding, LogEncoding::Utf16le);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].id.0, "grill");
        assert_eq!(config.content.len(), 2);
        assert_eq!(config.content[0].source, config.content[1].source);
        assert_eq!(config.endpoint.timeout_secs, 3);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_at(&dir.path().join("nope.yaml")).expect_err("missing");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error_with_path() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "log_path: [unclosed");
        let err = load_at(&path).expect_err("malformed");
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_device_id_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
log_path: /var/pos/status.log
devices:
  - { id: grill, name: A, destination: /a }
  - { id: grill, name: B, destination: /b }
endpoint:
  base_url: "https://boards.example.com"
  api_key: "k-123"
"#,
        );
        let err = load_at(&path).expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateDevice { id } if id == "grill"));
    }

    #[test]
    fn config_path_is_under_dot_expo() {
        let home = Path::new("/home/kitchen");
        assert_eq!(
            config_path_at(home),
            PathBuf::from("/home/kitchen/.expo/config.yaml")
        );
    }
}
