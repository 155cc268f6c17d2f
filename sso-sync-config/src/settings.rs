//! Tool settings: where the SSO portal lives and where AWS files are kept.
//!
//! Settings come from a YAML file (`~/.config/aws-sso-sync/config.yaml` by
//! default) or, for compatibility with older setups, from an INI file with
//! `[aws]` and `[paths]` sections (`sso_config.ini`).
//!
//! ```yaml
//! sso_profile: my-sso
//! sso_start_url: https://d-abc123.awsapps.com/start
//! sso_region: us-east-1
//! default_region: eu-west-1
//! output_format: json
//! shell_profile: default
//! # portal_url: https://portal.sso.us-east-1.amazonaws.com
//! paths:
//!   aws_folder_name: .aws
//!   config_file: config
//!   sso_cache_folder: sso/cache
//! ```

use crate::error::ConfigError;
use crate::ini::IniDocument;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternative settings file.
pub const CONFIG_PATH_ENV: &str = "AWS_SSO_SYNC_CONFIG";

/// Settings file name looked up in the working directory.
pub const LEGACY_INI_NAME: &str = "sso_config.ini";

/// Settings as they appear on disk; every field optional until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawSettings {
    sso_profile: Option<String>,
    sso_start_url: Option<String>,
    sso_region: Option<String>,
    default_region: Option<String>,
    output_format: Option<String>,
    shell_profile: Option<String>,
    portal_url: Option<String>,
    paths: RawPaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawPaths {
    aws_folder_name: Option<String>,
    config_file: Option<String>,
    sso_cache_folder: Option<String>,
    posix_rc_file: Option<PathBuf>,
    powershell_profile: Option<PathBuf>,
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Profile used for `aws sso login --profile <sso_profile>`.
    pub sso_profile: String,
    /// SSO portal start URL as configured (normalized only when written).
    pub sso_start_url: String,
    /// Region hosting the SSO portal.
    pub sso_region: String,
    /// Region written into every generated profile.
    pub default_region: String,
    /// CLI output format written into every generated profile.
    pub output_format: String,
    /// Profile name assigned to `AWS_DEFAULT_PROFILE` in shell startup files.
    pub shell_profile: String,
    /// Portal API endpoint overriding the one derived from `sso_region`.
    pub portal_url: Option<String>,
    pub paths: PathSettings,
}

/// File-system layout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    /// AWS folder name under the home directory.
    pub aws_folder_name: String,
    /// AWS CLI config file name inside the AWS folder.
    pub config_file: String,
    /// SSO token cache folder, relative to the AWS folder.
    pub sso_cache_folder: String,
    /// Overrides the POSIX rc file (default `~/.bashrc`).
    pub posix_rc_file: Option<PathBuf>,
    /// Overrides the PowerShell profile script location.
    pub powershell_profile: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            aws_folder_name: ".aws".to_string(),
            config_file: "config".to_string(),
            sso_cache_folder: "sso/cache".to_string(),
            posix_rc_file: None,
            powershell_profile: None,
        }
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::missing(key))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawSettings {
    fn validate(self) -> Result<Settings, ConfigError> {
        let sso_profile = required(self.sso_profile, "sso_profile")?;
        let sso_start_url = required(self.sso_start_url, "sso_start_url")?;
        let sso_region = required(self.sso_region, "sso_region")?;
        let defaults = PathSettings::default();

        Ok(Settings {
            default_region: optional(self.default_region).unwrap_or_else(|| sso_region.clone()),
            output_format: optional(self.output_format).unwrap_or_else(|| "json".to_string()),
            shell_profile: optional(self.shell_profile).unwrap_or_else(|| "default".to_string()),
            portal_url: optional(self.portal_url),
            sso_profile,
            sso_start_url,
            sso_region,
            paths: PathSettings {
                aws_folder_name: optional(self.paths.aws_folder_name)
                    .unwrap_or(defaults.aws_folder_name),
                config_file: optional(self.paths.config_file).unwrap_or(defaults.config_file),
                sso_cache_folder: optional(self.paths.sso_cache_folder)
                    .unwrap_or(defaults.sso_cache_folder),
                posix_rc_file: self.paths.posix_rc_file,
                powershell_profile: self.paths.powershell_profile,
            },
        })
    }
}

impl Settings {
    /// Parse YAML settings text.
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawSettings =
            serde_yaml_ng::from_str(text).map_err(|source| ConfigError::SettingsParse {
                path: origin.to_path_buf(),
                source,
            })?;
        raw.validate()
    }

    /// Parse INI settings text (`[aws]` and `[paths]` sections).
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let doc = IniDocument::parse(text)?;
        let aws = |key: &str| doc.get("aws", key).map(str::to_string);
        let path = |key: &str| doc.get("paths", key).map(str::to_string);

        RawSettings {
            sso_profile: aws("sso_profile"),
            sso_start_url: aws("sso_start_url"),
            sso_region: aws("sso_region"),
            default_region: aws("default_region"),
            output_format: aws("output_format"),
            shell_profile: aws("shell_profile"),
            portal_url: aws("portal_url"),
            paths: RawPaths {
                aws_folder_name: path("aws_folder_name"),
                config_file: path("config_file"),
                sso_cache_folder: path("sso_cache_folder"),
                posix_rc_file: path("posix_rc_file").map(PathBuf::from),
                powershell_profile: path("powershell_profile").map(PathBuf::from),
            },
        }
        .validate()
    }

    /// Load settings from `path`, choosing the format by file extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Settings path: {:?}", path);

        if !path.exists() {
            return Err(ConfigError::SettingsNotFound {
                path: path.to_path_buf(),
            });
        }

        // The settings name the SSO portal and account layout; warn when
        // other users on a shared machine can read them.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o044 != 0 {
                    log::warn!(
                        "Settings file {:?} is readable by group or others (mode {:04o}). \
                         Run: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path,
                    );
                }
            }
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_ini = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));
        if is_ini {
            Self::from_ini_str(&text)
        } else {
            Self::from_yaml_str(&text, path)
        }
    }

    /// Pick the settings file to use.
    ///
    /// Order: explicit path, `AWS_SSO_SYNC_CONFIG`, `./sso_config.ini` when it
    /// exists, then [`Settings::default_path`].
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return PathBuf::from(path);
        }
        let legacy = PathBuf::from(LEGACY_INI_NAME);
        if legacy.exists() {
            return legacy;
        }
        Self::default_path()
    }

    /// Default settings location (XDG layout on Unix and macOS).
    pub fn default_path() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("aws-sso-sync").join("config.yaml")
            } else {
                PathBuf::from("config.yaml")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir
                    .join(".config")
                    .join("aws-sso-sync")
                    .join("config.yaml")
            } else {
                PathBuf::from("config.yaml")
            }
        }
    }
}

/// Resolved locations of the AWS files this tool reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsPaths {
    pub aws_folder: PathBuf,
    pub config_file: PathBuf,
    pub sso_cache_dir: PathBuf,
}

impl AwsPaths {
    /// Lay the AWS files out under `aws_folder`.
    pub fn under(aws_folder: impl Into<PathBuf>, paths: &PathSettings) -> Self {
        let aws_folder = aws_folder.into();
        Self {
            config_file: aws_folder.join(&paths.config_file),
            sso_cache_dir: aws_folder.join(&paths.sso_cache_folder),
            aws_folder,
        }
    }

    /// Resolve the AWS folder under the user's home directory.
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
        Ok(Self::under(
            home.join(&settings.paths.aws_folder_name),
            &settings.paths,
        ))
    }

    /// Create the AWS folder if it does not exist yet.
    pub fn ensure_aws_folder(&self) -> Result<(), ConfigError> {
        if !self.aws_folder.exists() {
            log::info!("Creating AWS folder {:?}", self.aws_folder);
            fs::create_dir_all(&self.aws_folder).map_err(|source| ConfigError::ConfigWrite {
                path: self.aws_folder.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
