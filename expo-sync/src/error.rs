//! Error types for expo-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from publishing and content upload.
///
/// Every variant is recoverable: the caller logs it and the next cycle or
/// the next state change is the retry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (payloads, hash store).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned {status} for {path}")]
    Status { status: u16, path: String },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("transport error posting {path}: {message}")]
    Transport { path: String, message: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
