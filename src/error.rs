/// Failure taxonomy for definition loading and observation
///
/// Loading failures are local to a single file and are collected into the
/// batch load report; they never abort a discovery pass. Watch failures
/// signal that the filesystem observer itself degraded.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a single definition file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported definition file extension: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("expected export '{symbol}' not found in {path}")]
    MissingExport { symbol: String, path: PathBuf },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Whether this failure is plausibly transient (racing editors, slow
    /// mounts) and worth retrying. Parse and format failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            LoadError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

/// Failure of the underlying filesystem notification backend, e.g. an
/// exhausted watch-descriptor limit.
#[derive(Debug, Error)]
#[error("filesystem watch failed: {message}")]
pub struct WatchError {
    pub message: String,
}
