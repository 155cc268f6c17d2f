//! Shell startup file maintenance for aws-sso-sync.
//!
//! - `merge`: idempotent line/block directive merging with atomic writes
//! - `adapter`: the POSIX, PowerShell and persistent-store targets
//! - `store`: persistent user environment storage (`setx` on Windows)

pub mod adapter;
pub mod error;
pub mod merge;
pub mod store;

pub use adapter::{
    ApplyOutcome, DEFAULT_PROFILE_VAR, SESSION_VARIABLES, ShellPaths, ShellTarget,
};
pub use error::ShellError;
pub use merge::{Directive, MergeOutcome, merge_directives, merge_file, merge_text};
pub use store::{EnvironmentStore, SetxStore};
