//! Typed errors for shell profile updates.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single shell target. Targets are independent: one failing
/// never prevents the others from being updated.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The profile file exists but could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile file is not text, so it is left untouched.
    #[error("{} does not contain text and cannot be merged", .path.display())]
    Unmergeable { path: PathBuf },

    /// The merged content could not be written back.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persistent environment store rejected the write.
    #[error("Failed to persist {key}: {message}")]
    Store { key: String, message: String },
}
