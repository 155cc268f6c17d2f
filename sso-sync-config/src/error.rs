//! Typed error variants for the sso-sync-config crate.
//!
//! Callers at the binary boundary usually carry these through `anyhow`, but
//! the orchestrator matches on them to decide whether a failure aborts the
//! whole run or only the Role / target file it belongs to.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading settings or reading/writing the AWS CLI
/// config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------
    /// A required setting is absent or empty.
    #[error("Required setting '{key}' is missing from the configuration")]
    ConfigurationMissing {
        /// Name of the missing key (e.g. `sso_start_url`).
        key: String,
    },

    /// The settings file does not exist.
    #[error("Configuration file {} not found", .path.display())]
    SettingsNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The settings file exists but could not be read.
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    SettingsRead {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file contained invalid YAML.
    #[error("YAML parse error in {}: {source}", .path.display())]
    SettingsParse {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The home directory could not be determined.
    #[error("Could not determine home directory")]
    HomeDirUnavailable,

    // -----------------------------------------------------------------------
    // INI documents
    // -----------------------------------------------------------------------
    /// A line of an INI document could not be interpreted.
    #[error("INI syntax error on line {line}: {message}")]
    IniSyntax {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------
    /// A profile name does not follow the `sso-{account}-{role}` layout.
    #[error("Malformed profile name '{0}': expected sso-<account>-<role>")]
    MalformedProfileName(String),

    // -----------------------------------------------------------------------
    // AWS CLI config file
    // -----------------------------------------------------------------------
    /// The AWS CLI config file exists but could not be read as text.
    #[error("Failed to read AWS config {}: {source}", .path.display())]
    ConfigRead {
        /// Path of the AWS config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The AWS CLI config file could not be written.
    #[error("Failed to write AWS config {}: {source}", .path.display())]
    ConfigWrite {
        /// Path of the AWS config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::ConfigurationMissing`].
    pub fn missing(key: impl Into<String>) -> Self {
        ConfigError::ConfigurationMissing { key: key.into() }
    }
}
