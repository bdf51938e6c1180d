//! Error types for expo-tail.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from tailing the status log.
///
/// Callers treat these as transient: log the error, report the tick as
/// "no new lines", and let the next poll retry.
#[derive(Debug, Error)]
pub enum TailError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`TailError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TailError {
    TailError::Io {
        path: path.into(),
        source,
    }
}
