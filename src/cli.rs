//! Command-line interface for aws-sso-sync.
//!
//! Without a subcommand the full sync runs. `roles`, `shell` and `verify`
//! run single stages of it.

use crate::aws_cli::{AwsCli, SsoSession};
use crate::debug;
use crate::environment::{AWS_ENV_VARS, clear_process_environment};
use crate::portal::{PortalClient, console_url};
use crate::sync::{IdentityOutcome, SyncOrchestrator, SyncReport, apply_shell_targets, verify_with_retry};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use sso_sync_config::{AwsPaths, ConfigError, Settings};
use sso_sync_shell::{ApplyOutcome, SetxStore, ShellError, ShellPaths, ShellTarget};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// aws-sso-sync - Generate AWS CLI profiles for every SSO role you can assume
#[derive(Parser)]
#[command(name = "aws-sso-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (YAML, or INI with [aws] and [paths] sections)
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Shell the next-step hints are written for
    #[arg(long, value_enum, default_value_t = ShellKind::Posix, global = true)]
    pub shell: ShellKind,

    /// Kill `aws` commands still running after this many seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Log level for the debug log (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", value_parser = parse_log_level, global = true)]
    pub log_level: Option<LevelFilter>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and list the roles the portal exposes, without writing anything
    Roles,
    /// Only install the default profile into the shell startup files
    Shell {
        /// Profile to make the default (overrides `shell_profile` from settings)
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Check that the default credentials work, re-authenticating once if not
    Verify,
}

/// Shell families the final hints can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellKind {
    Posix,
    Powershell,
    Cmd,
}

impl ShellKind {
    fn target(self) -> ShellTarget {
        match self {
            Self::Posix => ShellTarget::PosixShell,
            Self::Powershell => ShellTarget::PowerShell,
            Self::Cmd => ShellTarget::PersistentStore,
        }
    }
}

fn parse_log_level(raw: &str) -> std::result::Result<LevelFilter, String> {
    debug::parse_level(raw).ok_or_else(|| format!("unknown log level '{raw}'"))
}

/// Parse arguments, run the selected command and return the exit code.
pub fn process_cli() -> i32 {
    let cli = Cli::parse();
    debug::init_log_bridge(cli.log_level);
    log::info!("Starting aws-sso-sync {}", crate::VERSION);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            1
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let settings_path = Settings::resolve_path(cli.config.as_deref());
    let settings = Settings::load(&settings_path)?;
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    let shell_paths = ShellPaths::from_settings(&home, &settings.paths);
    let session = AwsCli::new().with_timeout(cli.timeout.map(Duration::from_secs));

    match cli.command {
        Some(Commands::Shell { profile }) => {
            let profile = profile.unwrap_or_else(|| settings.shell_profile.clone());
            Ok(run_shell(&profile, &shell_paths, cli.shell))
        }
        Some(Commands::Verify) => {
            clear_process_environment(&AWS_ENV_VARS);
            Ok(run_verify(&session))
        }
        Some(Commands::Roles) => {
            clear_process_environment(&AWS_ENV_VARS);
            let aws_paths = AwsPaths::resolve(&settings)?;
            run_roles(&settings, &aws_paths, &shell_paths, &session)
        }
        None => {
            clear_process_environment(&AWS_ENV_VARS);
            let aws_paths = AwsPaths::resolve(&settings)?;
            let portal = PortalClient::from_settings(&settings)?;
            let store = SetxStore;

            print_banner(&settings_path);
            let report = SyncOrchestrator::new(
                &settings,
                &aws_paths,
                &shell_paths,
                &session,
                &portal,
                &store,
            )
            .run()?;

            print_report(&report, &settings, &aws_paths, cli.shell);
            Ok(if report.has_fatal() { 1 } else { 0 })
        }
    }
}

fn print_banner(settings_path: &Path) {
    println!("=============================================");
    println!("  AWS SSO profile sync");
    println!("=============================================");
    println!();
    println!("Settings: {}", settings_path.display());
    println!();
}

fn run_roles(
    settings: &Settings,
    aws_paths: &AwsPaths,
    shell_paths: &ShellPaths,
    session: &AwsCli,
) -> Result<i32> {
    let portal = PortalClient::from_settings(settings)?;
    let store = SetxStore;
    let roles = SyncOrchestrator::new(settings, aws_paths, shell_paths, session, &portal, &store)
        .discover_roles()?;

    println!("{} roles available:", roles.len());
    for role in &roles {
        println!("  {}", role);
        println!("    {}", console_url(&settings.sso_start_url, role));
    }
    Ok(0)
}

fn run_shell(profile: &str, shell_paths: &ShellPaths, shell: ShellKind) -> i32 {
    let results = apply_shell_targets(profile, shell_paths, &SetxStore);
    let failed = print_shell_results(&results);
    println!();
    println!("Default profile '{}' installed. To use it now:", profile);
    println!("  {}", shell.target().reload_hint());
    if failed { 1 } else { 0 }
}

fn run_verify(session: &dyn SsoSession) -> i32 {
    match verify_with_retry(session) {
        IdentityOutcome::Verified(id) | IdentityOutcome::VerifiedAfterRetry(id) => {
            println!("Credentials OK: {} (account {})", id.arn, id.account);
            0
        }
        IdentityOutcome::Failed(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

/// Print one line per shell target; returns whether any failed.
fn print_shell_results(results: &[(ShellTarget, Result<ApplyOutcome, ShellError>)]) -> bool {
    println!("Shell profiles:");
    let mut failed = false;
    for (target, result) in results {
        match result {
            Ok(outcome) => println!("  {}: {}", target, outcome),
            Err(e) => {
                failed = true;
                println!("  {}: FAILED: {}", target, e);
            }
        }
    }
    failed
}

fn print_report(report: &SyncReport, settings: &Settings, aws_paths: &AwsPaths, shell: ShellKind) {
    if report.login_profile_created {
        println!(
            "Created login profile '{}' in {}",
            settings.sso_profile,
            aws_paths.config_file.display()
        );
    }

    println!("Profiles ({}):", report.profiles.len());
    for profile in &report.profiles {
        println!("  {}", profile);
        if let Ok(role) = profile.role() {
            println!("    console: {}", console_url(&settings.sso_start_url, &role));
        }
    }

    if !report.role_failures.is_empty() {
        println!();
        println!("Skipped roles:");
        for failure in &report.role_failures {
            println!("  {}: {}", failure.role, failure.error);
        }
    }

    println!();
    match &report.config_saved {
        Ok(()) => println!("AWS config: {} updated", aws_paths.config_file.display()),
        Err(e) => println!("AWS config: FAILED: {}", e),
    }

    println!();
    match &report.shell_skipped {
        Some(reason) => println!("Shell profiles: skipped ({})", reason),
        None => {
            print_shell_results(&report.shell);
        }
    }

    println!();
    match &report.identity {
        IdentityOutcome::Verified(id) => println!("Credentials OK: {}", id.arn),
        IdentityOutcome::VerifiedAfterRetry(id) => {
            println!("Credentials OK after re-authentication: {}", id.arn)
        }
        IdentityOutcome::Failed(e) => println!("Credential check FAILED: {}", e),
    }

    println!();
    println!("Next steps:");
    println!("  {}", shell.target().reload_hint());
    if let Some(profile) = report.profiles.first() {
        println!("  aws sts get-caller-identity --profile {}", profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_is_full_sync() {
        let cli = Cli::try_parse_from(["aws-sso-sync", "my.yaml", "--timeout", "90"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("my.yaml")));
        assert_eq!(cli.timeout, Some(90));
        assert_eq!(cli.shell, ShellKind::Posix);
    }

    #[test]
    fn test_shell_subcommand_with_profile() {
        let cli = Cli::try_parse_from([
            "aws-sso-sync",
            "shell",
            "--profile",
            "sso-111111111111-Admin",
            "--shell",
            "powershell",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Shell { profile }) => {
                assert_eq!(profile.as_deref(), Some("sso-111111111111-Admin"))
            }
            _ => panic!("expected shell subcommand"),
        }
        assert_eq!(cli.shell.target(), ShellTarget::PowerShell);
    }

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["aws-sso-sync", "--log-level", "debug", "verify"]).unwrap();
        assert_eq!(cli.log_level, Some(LevelFilter::Debug));
        assert!(matches!(cli.command, Some(Commands::Verify)));

        assert!(Cli::try_parse_from(["aws-sso-sync", "--log-level", "loud"]).is_err());
    }
}
