//! Typed errors for the sync run and its external collaborators.

use sso_sync_config::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a sync run (or a single collaborator call).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Settings or AWS config failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    // -----------------------------------------------------------------------
    // Session token cache
    // -----------------------------------------------------------------------
    /// The SSO cache directory is missing or holds no cache file.
    #[error("No SSO cache file found in {}; run the SSO login first", .dir.display())]
    NoCacheFound { dir: PathBuf },

    /// The newest cache file could not be read or lacks an access token.
    #[error("Invalid SSO cache file {}: {message}", .path.display())]
    CacheRead { path: PathBuf, message: String },

    // -----------------------------------------------------------------------
    // aws CLI
    // -----------------------------------------------------------------------
    /// The external command could not be started.
    #[error("Failed to run '{program}': {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `aws sso login` exited unsuccessfully.
    #[error("AWS SSO login failed for profile '{profile}': {message}")]
    Login { profile: String, message: String },

    /// `aws sts get-caller-identity` failed or returned unreadable output.
    #[error("Credential verification failed: {0}")]
    IdentityCheck(String),

    /// An external command ran past the caller's deadline.
    #[error("'{program}' did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    // -----------------------------------------------------------------------
    // SSO portal
    // -----------------------------------------------------------------------
    /// Account or role enumeration failed.
    #[error("SSO portal request failed: {0}")]
    Portal(String),
}
