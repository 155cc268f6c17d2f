//! Settings and AWS CLI configuration handling for aws-sso-sync.
//!
//! - `settings`: tool settings (YAML or legacy INI) and resolved AWS paths
//! - `profile`: canonical `sso-{account}-{role}` profile names
//! - `ini`: order-preserving INI document used for the AWS CLI config
//! - `aws_config`: idempotent `[default]` / `[profile …]` section writer
//! - `atomic`: write-temp-then-rename file replacement

pub mod atomic;
pub mod aws_config;
pub mod error;
pub mod ini;
pub mod profile;
pub mod settings;

pub use atomic::write_atomic;
pub use aws_config::{AwsConfigFile, DEFAULT_SECTION, RegionSettings, normalize_start_url};
pub use error::ConfigError;
pub use ini::{IniDocument, Section};
pub use profile::{ProfileName, Role};
pub use settings::{AwsPaths, PathSettings, Settings};
