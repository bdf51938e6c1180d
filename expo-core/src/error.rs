//! Error types for expo-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found mid-read, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.expo/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// Two devices share one id; snapshots would race on the same destination.
    #[error("duplicate device id in config: {id}")]
    DuplicateDevice { id: String },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
