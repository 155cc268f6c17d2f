//! Shared integration test helpers for aws-sso-sync.
//!
//! Fakes for the external collaborators (the `aws` CLI, the SSO portal and
//! the persistent environment store) plus a temp-home fixture.
//!
//! ```ignore
//! mod common;
//! use common::{FakeSession, FakeRoles, MemoryStore, TestHome};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers is used per file.

#![allow(dead_code)]

use aws_sso_sync::{CallerIdentity, RoleSource, SessionToken, SsoSession, SyncError};
use sso_sync_config::{AwsPaths, Role, Settings};
use sso_sync_shell::{EnvironmentStore, ShellError, ShellPaths};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const START_URL: &str = "https://d-abc123.awsapps.com/start";
pub const LOGIN_PROFILE: &str = "my-sso";

/// A fake home directory with settings and resolved paths inside it.
///
/// The `TempDir` must stay alive for the duration of the test.
pub struct TestHome {
    pub dir: TempDir,
    pub settings: Settings,
    pub aws_paths: AwsPaths,
    pub shell_paths: ShellPaths,
}

impl TestHome {
    /// Home with settings and an SSO cache holding a valid token.
    pub fn new() -> Self {
        let home = Self::without_token();
        home.write_token("token-from-login");
        home
    }

    /// Home whose SSO cache directory does not exist.
    pub fn without_token() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let yaml = format!(
            "sso_profile: {LOGIN_PROFILE}\n\
             sso_start_url: {START_URL}\n\
             sso_region: us-east-1\n\
             default_region: eu-west-1\n"
        );
        let settings = Settings::from_yaml_str(&yaml, Path::new("config.yaml"))
            .expect("Failed to parse test settings");
        let aws_paths = AwsPaths::under(dir.path().join(".aws"), &settings.paths);
        let shell_paths = ShellPaths::under_home(dir.path());
        Self {
            dir,
            settings,
            aws_paths,
            shell_paths,
        }
    }

    pub fn write_token(&self, token: &str) {
        fs::create_dir_all(&self.aws_paths.sso_cache_dir).expect("Failed to create cache dir");
        fs::write(
            self.aws_paths.sso_cache_dir.join("session.json"),
            format!(r#"{{"accessToken":"{token}","expiresAt":"2099-01-01T00:00:00Z"}}"#),
        )
        .expect("Failed to write token cache");
    }

    pub fn config_text(&self) -> String {
        fs::read_to_string(&self.aws_paths.config_file).unwrap_or_default()
    }

    pub fn bashrc(&self) -> PathBuf {
        self.shell_paths.posix_rc.clone()
    }

    pub fn powershell_profile(&self) -> PathBuf {
        self.shell_paths.powershell_profile.clone()
    }
}

/// Scripted stand-in for the `aws` CLI.
#[derive(Default)]
pub struct FakeSession {
    pub logins: RefCell<Vec<String>>,
    pub identity_calls: RefCell<usize>,
    fail_login: bool,
    /// `false` entries make the matching identity call fail; empty means ok.
    identity_script: RefCell<VecDeque<bool>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_login() -> Self {
        Self {
            fail_login: true,
            ..Self::default()
        }
    }

    pub fn with_identity_script(script: &[bool]) -> Self {
        Self {
            identity_script: RefCell::new(script.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.borrow().clone()
    }
}

impl SsoSession for FakeSession {
    fn login(&self, profile: &str) -> Result<(), SyncError> {
        self.logins.borrow_mut().push(profile.to_string());
        if self.fail_login {
            return Err(SyncError::Login {
                profile: profile.to_string(),
                message: "aws exited with exit status: 255".to_string(),
            });
        }
        Ok(())
    }

    fn caller_identity(&self) -> Result<CallerIdentity, SyncError> {
        *self.identity_calls.borrow_mut() += 1;
        match self.identity_script.borrow_mut().pop_front() {
            Some(false) => Err(SyncError::IdentityCheck(
                "The SSO session associated with this profile has expired".to_string(),
            )),
            _ => Ok(CallerIdentity {
                account: "111111111111".to_string(),
                arn: "arn:aws:sts::111111111111:assumed-role/AdministratorAccess/me".to_string(),
                user_id: None,
            }),
        }
    }
}

/// Fixed role list, or a portal failure.
pub struct FakeRoles {
    roles: Option<Vec<Role>>,
    pub seen_tokens: RefCell<Vec<String>>,
}

impl FakeRoles {
    pub fn new(roles: &[(&str, &str)]) -> Self {
        Self {
            roles: Some(roles.iter().map(|(a, r)| Role::new(*a, *r)).collect()),
            seen_tokens: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            roles: None,
            seen_tokens: RefCell::new(Vec::new()),
        }
    }
}

impl RoleSource for FakeRoles {
    fn list_roles(&self, token: &SessionToken) -> Result<Vec<Role>, SyncError> {
        self.seen_tokens
            .borrow_mut()
            .push(token.expose().to_string());
        self.roles
            .clone()
            .ok_or_else(|| SyncError::Portal("/assignment/accounts: HTTP 500".to_string()))
    }
}

/// In-memory persistent environment.
pub struct MemoryStore {
    available: bool,
    pub values: RefCell<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            available: true,
            values: RefCell::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            values: RefCell::new(Vec::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .borrow()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl EnvironmentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory store"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ShellError> {
        self.values
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}
