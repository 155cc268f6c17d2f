//! Shell startup targets that receive the default AWS profile.
//!
//! Each [`ShellTarget`] provides two directives for the chosen profile name:
//! an assignment of `AWS_DEFAULT_PROFILE`, and a helper that clears the
//! session-scoped AWS variables and restores that assignment. File-based
//! targets hand them to [`merge_file`]; the persistent store writes one key.

use crate::error::ShellError;
use crate::merge::{Directive, MergeOutcome, merge_file};
use crate::store::EnvironmentStore;
use sso_sync_config::PathSettings;
use std::fmt;
use std::path::{Path, PathBuf};

/// Variable selecting the profile the AWS CLI uses without `--profile`.
pub const DEFAULT_PROFILE_VAR: &str = "AWS_DEFAULT_PROFILE";

/// Variables holding exported session credentials.
pub const SESSION_VARIABLES: [&str; 3] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
];

/// Most lines any `Clear-AWS` function this tool has written spans.
const CLEAR_AWS_SPAN: usize = 5;

/// `export AWS_DEFAULT_PROFILE=<profile>`
pub fn posix_export(profile: &str) -> String {
    format!("export {DEFAULT_PROFILE_VAR}={profile}")
}

/// `alias clear_aws='unset …; export AWS_DEFAULT_PROFILE=<profile>'`
pub fn posix_clear_alias(profile: &str) -> String {
    format!(
        "alias clear_aws='unset {}; export {DEFAULT_PROFILE_VAR}={profile}'",
        SESSION_VARIABLES.join(" ")
    )
}

/// `$env:AWS_DEFAULT_PROFILE = '<profile>'`
pub fn powershell_assignment(profile: &str) -> String {
    format!("$env:{DEFAULT_PROFILE_VAR} = '{profile}'")
}

/// The `Clear-AWS` PowerShell function.
pub fn powershell_clear_function(profile: &str) -> String {
    let items = SESSION_VARIABLES
        .iter()
        .map(|v| format!("Env:{v}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "function Clear-AWS {{\n    \
         Remove-Item {items} -ErrorAction SilentlyContinue\n    \
         {}\n    \
         Write-Host \"Cleared AWS environment variables and set default profile\"\n\
         }}",
        powershell_assignment(profile)
    )
}

/// Locations of the shell startup files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellPaths {
    pub posix_rc: PathBuf,
    pub powershell_profile: PathBuf,
}

impl ShellPaths {
    /// Default locations under `home`.
    pub fn under_home(home: &Path) -> Self {
        Self {
            posix_rc: home.join(".bashrc"),
            powershell_profile: home
                .join("Documents")
                .join("WindowsPowerShell")
                .join("Microsoft.PowerShell_profile.ps1"),
        }
    }

    /// Default locations with the overrides from settings applied.
    /// Overrides may start with `~/`.
    pub fn from_settings(home: &Path, paths: &PathSettings) -> Self {
        let mut resolved = Self::under_home(home);
        if let Some(rc) = &paths.posix_rc_file {
            resolved.posix_rc = expand_home(rc, home);
        }
        if let Some(ps) = &paths.powershell_profile {
            resolved.powershell_profile = expand_home(ps, home);
        }
        resolved
    }
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Result of applying one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A startup file was merged.
    File { path: PathBuf, outcome: MergeOutcome },
    /// The key was written to the persistent store.
    Stored { store: String, key: String },
    /// The target does not exist on this platform.
    Skipped { reason: String },
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::File { path, outcome } => {
                let verb = match outcome {
                    MergeOutcome::Created => "created",
                    MergeOutcome::Updated => "updated",
                    MergeOutcome::Unchanged => "already up to date",
                };
                write!(f, "{} {}", path.display(), verb)
            }
            ApplyOutcome::Stored { store, key } => write!(f, "{key} written to {store}"),
            ApplyOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

/// Closed set of places the default profile is installed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellTarget {
    /// POSIX shell rc file (`~/.bashrc`).
    PosixShell,
    /// PowerShell profile script.
    PowerShell,
    /// Persistent user environment (Windows registry via `setx`).
    PersistentStore,
}

impl ShellTarget {
    pub const ALL: [ShellTarget; 3] = [
        ShellTarget::PosixShell,
        ShellTarget::PowerShell,
        ShellTarget::PersistentStore,
    ];

    /// Display name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PosixShell => "Bash profile",
            Self::PowerShell => "PowerShell profile",
            Self::PersistentStore => "CMD environment",
        }
    }

    /// What the user runs to pick up the change in an open session.
    pub fn reload_hint(&self) -> &'static str {
        match self {
            Self::PosixShell => "source ~/.bashrc",
            Self::PowerShell => ". $PROFILE",
            Self::PersistentStore => "open a new command prompt window",
        }
    }

    /// Startup file this target edits, if it is file based.
    pub fn file_path<'a>(&self, paths: &'a ShellPaths) -> Option<&'a Path> {
        match self {
            Self::PosixShell => Some(&paths.posix_rc),
            Self::PowerShell => Some(&paths.powershell_profile),
            Self::PersistentStore => None,
        }
    }

    /// Assignment and helper directives for `profile`.
    pub fn directives(&self, profile: &str) -> Vec<Directive> {
        match self {
            Self::PosixShell => vec![
                Directive::line("export", posix_export(profile), |line| {
                    line.trim_start()
                        .starts_with(&format!("export {DEFAULT_PROFILE_VAR}="))
                }),
                Directive::line("clear_aws alias", posix_clear_alias(profile), |line| {
                    line.trim_start().starts_with("alias clear_aws=")
                }),
            ],
            Self::PowerShell => vec![
                Directive::line("env assignment", powershell_assignment(profile), |line| {
                    line.trim_start()
                        .starts_with(&format!("$env:{DEFAULT_PROFILE_VAR}"))
                }),
                Directive::block(
                    "Clear-AWS function",
                    &powershell_clear_function(profile),
                    |line| line.trim_start().starts_with("function Clear-AWS"),
                )
                .with_span(CLEAR_AWS_SPAN),
            ],
            Self::PersistentStore => Vec::new(),
        }
    }

    /// Install `profile` into this target.
    pub fn apply(
        &self,
        profile: &str,
        paths: &ShellPaths,
        store: &dyn EnvironmentStore,
    ) -> Result<ApplyOutcome, ShellError> {
        match self.file_path(paths) {
            Some(path) => {
                let outcome = merge_file(path, &self.directives(profile))?;
                log::info!("{}: {:?} {:?}", self.display_name(), path, outcome);
                Ok(ApplyOutcome::File {
                    path: path.to_path_buf(),
                    outcome,
                })
            }
            None if !store.is_available() => Ok(ApplyOutcome::Skipped {
                reason: format!("{} not available on this platform", store.name()),
            }),
            None => {
                store.set(DEFAULT_PROFILE_VAR, profile)?;
                Ok(ApplyOutcome::Stored {
                    store: store.name().to_string(),
                    key: DEFAULT_PROFILE_VAR.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for ShellTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
