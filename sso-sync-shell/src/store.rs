//! Persistent user environment storage.
//!
//! On Windows the user environment lives in `HKCU\Environment`; `setx`
//! writes it there so new CMD and PowerShell windows pick the value up.
//! Other platforms have no equivalent key/value store.

use crate::error::ShellError;
use std::process::Command;

/// A last-write-wins key/value store for user environment variables.
pub trait EnvironmentStore {
    /// Human-readable name used in log and report output.
    fn name(&self) -> &str;

    /// Whether the store exists on this platform.
    fn is_available(&self) -> bool;

    /// Persist `key=value` for future sessions.
    fn set(&self, key: &str, value: &str) -> Result<(), ShellError>;
}

/// Writes user environment variables through `setx` (Windows only).
#[derive(Debug, Clone, Default)]
pub struct SetxStore;

impl EnvironmentStore for SetxStore {
    fn name(&self) -> &str {
        "Windows user environment"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "windows")
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ShellError> {
        let output = Command::new("setx")
            .args([key, value])
            .output()
            .map_err(|e| ShellError::Store {
                key: key.to_string(),
                message: format!("failed to run setx: {e}"),
            })?;

        if !output.status.success() {
            return Err(ShellError::Store {
                key: key.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        log::info!("Persisted {}={} via setx", key, value);
        Ok(())
    }
}
