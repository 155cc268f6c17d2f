//! Writes SSO profile sections into the AWS CLI config file.
//!
//! Every synced Role gets a `[profile sso-{account}-{role}]` section, and the
//! last synced Role also becomes `[default]` so commands work without a
//! `--profile` flag. Both carry the same keys:
//!
//! ```ini
//! [profile sso-111111111111-AdministratorAccess]
//! sso_start_url = https://d-abc123.awsapps.com/start/#
//! sso_region = us-east-1
//! sso_account_id = 111111111111
//! sso_role_name = AdministratorAccess
//! region = us-east-1
//! output = json
//! ```

use crate::atomic::write_atomic;
use crate::error::ConfigError;
use crate::ini::IniDocument;
use crate::profile::{ProfileName, named_profile_section};
use crate::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};

/// Section name of the zero-flag default profile.
pub const DEFAULT_SECTION: &str = "default";

/// Fragment marker the start URL must end with.
const START_URL_SUFFIX: &str = "/#";

/// Ensure `url` ends with `/#` exactly once: strip any trailing run of `/`
/// and `/#`, then append `/#`. An already normalized URL is returned
/// unchanged.
pub fn normalize_start_url(url: &str) -> String {
    let mut base = url;
    loop {
        if let Some(rest) = base.strip_suffix(START_URL_SUFFIX) {
            base = rest;
        } else if let Some(rest) = base.strip_suffix('/') {
            base = rest;
        } else {
            break;
        }
    }
    format!("{base}{START_URL_SUFFIX}")
}

/// Per-run values shared by every generated profile section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSettings {
    pub sso_start_url: String,
    pub sso_region: String,
    pub region: String,
    pub output: String,
}

impl From<&Settings> for RegionSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            sso_start_url: settings.sso_start_url.clone(),
            sso_region: settings.sso_region.clone(),
            region: settings.default_region.clone(),
            output: settings.output_format.clone(),
        }
    }
}

/// The AWS CLI config file, loaded into memory.
#[derive(Debug, Clone)]
pub struct AwsConfigFile {
    path: PathBuf,
    document: IniDocument,
}

impl AwsConfigFile {
    /// Load the config at `path`; a missing file is an empty document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = match fs::read_to_string(path) {
            Ok(text) => IniDocument::parse(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IniDocument::new(),
            Err(source) => {
                return Err(ConfigError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &IniDocument {
        &self.document
    }

    /// Write `[default]` and `[profile <name>]` for `profile`.
    ///
    /// Account id and role name come from parsing the profile name. Existing
    /// sections are replaced wholesale, so repeated runs converge. A malformed
    /// name fails before anything is changed.
    pub fn upsert_default_and_named_section(
        &mut self,
        profile: &ProfileName,
        region: &RegionSettings,
    ) -> Result<(), ConfigError> {
        let role = profile.role()?;
        let entries = [
            ("sso_start_url", normalize_start_url(&region.sso_start_url)),
            ("sso_region", region.sso_region.clone()),
            ("sso_account_id", role.account_id),
            ("sso_role_name", role.role_name),
            ("region", region.region.clone()),
            ("output", region.output.clone()),
        ];

        self.document
            .replace_section(DEFAULT_SECTION, entries.clone());
        self.document
            .replace_section(&profile.section_name(), entries);

        log::debug!("Upserted sections for profile {}", profile);
        Ok(())
    }

    /// Make sure the profile used for `aws sso login` exists.
    ///
    /// An existing section is left alone. Returns `true` when it was added.
    pub fn ensure_login_profile(&mut self, settings: &Settings) -> bool {
        let section = named_profile_section(&settings.sso_profile);
        let added = self.document.insert_section_if_missing(
            &section,
            [
                ("sso_start_url", settings.sso_start_url.as_str()),
                ("sso_region", settings.sso_region.as_str()),
                ("region", settings.default_region.as_str()),
                ("output", settings.output_format.as_str()),
            ],
        );
        if added {
            log::info!("Created SSO login profile '{}'", settings.sso_profile);
        }
        added
    }

    /// Render the document as file text.
    pub fn render(&self) -> String {
        self.document.to_string()
    }

    /// Atomically persist the document to its path.
    pub fn save(&self) -> Result<(), ConfigError> {
        write_atomic(&self.path, self.render().as_bytes()).map_err(|source| {
            ConfigError::ConfigWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        log::info!("Updated AWS config file {:?}", self.path);
        Ok(())
    }
}
