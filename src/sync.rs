//! One sync run: login, enumerate roles, write profiles, install the default
//! profile into the shells, verify.
//!
//! Steps before any profile is written (login, token lookup, role listing)
//! abort the run with a [`SyncError`]. Later steps are independent targets:
//! their failures are recorded in the [`SyncReport`] and the remaining
//! targets still run.

use crate::aws_cli::{CallerIdentity, SsoSession};
use crate::error::SyncError;
use crate::portal::RoleSource;
use crate::token_cache;
use sso_sync_config::{
    AwsConfigFile, AwsPaths, ConfigError, DEFAULT_SECTION, ProfileName, RegionSettings, Role,
    Settings,
};
use sso_sync_shell::{ApplyOutcome, EnvironmentStore, ShellError, ShellPaths, ShellTarget};

/// A role whose profile could not be written.
#[derive(Debug)]
pub struct RoleFailure {
    pub role: Role,
    pub error: ConfigError,
}

/// Result of the final credential check.
#[derive(Debug)]
pub enum IdentityOutcome {
    Verified(CallerIdentity),
    /// Verified after re-authenticating the default profile.
    VerifiedAfterRetry(CallerIdentity),
    Failed(SyncError),
}

impl IdentityOutcome {
    pub fn identity(&self) -> Option<&CallerIdentity> {
        match self {
            Self::Verified(id) | Self::VerifiedAfterRetry(id) => Some(id),
            Self::Failed(_) => None,
        }
    }
}

/// Everything a run did, per target.
#[derive(Debug)]
pub struct SyncReport {
    /// The login profile section had to be created.
    pub login_profile_created: bool,
    /// Profiles written, in portal order.
    pub profiles: Vec<ProfileName>,
    pub role_failures: Vec<RoleFailure>,
    /// Outcome of flushing the AWS config file.
    pub config_saved: Result<(), ConfigError>,
    pub shell: Vec<(ShellTarget, Result<ApplyOutcome, ShellError>)>,
    /// Why no shell target was touched, when the step was skipped.
    pub shell_skipped: Option<String>,
    pub identity: IdentityOutcome,
}

impl SyncReport {
    /// Whether any target failed.
    pub fn has_fatal(&self) -> bool {
        !self.role_failures.is_empty()
            || self.config_saved.is_err()
            || self.shell.iter().any(|(_, result)| result.is_err())
            || matches!(self.identity, IdentityOutcome::Failed(_))
    }
}

/// Apply every shell target for `profile`, collecting each outcome.
pub fn apply_shell_targets(
    profile: &str,
    paths: &ShellPaths,
    store: &dyn EnvironmentStore,
) -> Vec<(ShellTarget, Result<ApplyOutcome, ShellError>)> {
    ShellTarget::ALL
        .iter()
        .map(|target| {
            let result = target.apply(profile, paths, store);
            if let Err(e) = &result {
                log::error!("{}: {}", target.display_name(), e);
            }
            (*target, result)
        })
        .collect()
}

/// Check credentials, re-authenticating the default profile once on failure.
pub fn verify_with_retry(session: &dyn SsoSession) -> IdentityOutcome {
    let first = match session.caller_identity() {
        Ok(identity) => return IdentityOutcome::Verified(identity),
        Err(e) => e,
    };

    log::warn!("Identity check failed ({first}); logging in to '{DEFAULT_SECTION}' and retrying");
    if let Err(e) = session.login(DEFAULT_SECTION) {
        return IdentityOutcome::Failed(e);
    }

    match session.caller_identity() {
        Ok(identity) => IdentityOutcome::VerifiedAfterRetry(identity),
        Err(e) => {
            log::error!("Identity check failed after re-authentication: {e}");
            IdentityOutcome::Failed(e)
        }
    }
}

/// Drives a full run against injected collaborators.
pub struct SyncOrchestrator<'a> {
    settings: &'a Settings,
    aws_paths: &'a AwsPaths,
    shell_paths: &'a ShellPaths,
    session: &'a dyn SsoSession,
    roles: &'a dyn RoleSource,
    store: &'a dyn EnvironmentStore,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        settings: &'a Settings,
        aws_paths: &'a AwsPaths,
        shell_paths: &'a ShellPaths,
        session: &'a dyn SsoSession,
        roles: &'a dyn RoleSource,
        store: &'a dyn EnvironmentStore,
    ) -> Self {
        Self {
            settings,
            aws_paths,
            shell_paths,
            session,
            roles,
            store,
        }
    }

    /// Load the AWS config, adding the login profile if it is missing.
    fn prepare_config(&self) -> Result<(AwsConfigFile, bool), SyncError> {
        self.aws_paths.ensure_aws_folder()?;
        let mut config = AwsConfigFile::load(&self.aws_paths.config_file)?;
        let created = config.ensure_login_profile(self.settings);
        if created {
            config.save()?;
        }
        Ok((config, created))
    }

    /// Log in and list every reachable role.
    pub fn discover_roles(&self) -> Result<Vec<Role>, SyncError> {
        self.session.login(&self.settings.sso_profile)?;
        let token = token_cache::latest_access_token(&self.aws_paths.sso_cache_dir)?;
        let roles = self.roles.list_roles(&token)?;
        log::info!("Discovered {} roles", roles.len());
        Ok(roles)
    }

    /// Run every step and report per-target outcomes.
    pub fn run(&self) -> Result<SyncReport, SyncError> {
        let (mut config, login_profile_created) = self.prepare_config()?;
        let roles = self.discover_roles()?;

        let region = RegionSettings::from(self.settings);
        let mut profiles = Vec::with_capacity(roles.len());
        let mut role_failures = Vec::new();
        for role in roles {
            let profile = ProfileName::format(&role);
            match config.upsert_default_and_named_section(&profile, &region) {
                Ok(()) => profiles.push(profile),
                Err(error) => {
                    log::error!("Skipping role {}: {}", role, error);
                    role_failures.push(RoleFailure { role, error });
                }
            }
        }

        let config_saved = config.save();
        if let Err(e) = &config_saved {
            log::error!("{e}");
        }

        let (shell, shell_skipped) = if profiles.is_empty() {
            let reason = "no profiles were written".to_string();
            log::warn!("Skipping shell profiles: {}", reason);
            (Vec::new(), Some(reason))
        } else {
            let shell = apply_shell_targets(
                &self.settings.shell_profile,
                self.shell_paths,
                self.store,
            );
            (shell, None)
        };
        let identity = verify_with_retry(self.session);

        Ok(SyncReport {
            login_profile_created,
            profiles,
            role_failures,
            config_saved,
            shell,
            shell_skipped,
            identity,
        })
    }
}
