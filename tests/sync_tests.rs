//! End-to-end tests for a full sync run against fake collaborators.

mod common;

use aws_sso_sync::{IdentityOutcome, SyncError, SyncOrchestrator};
use common::{FakeRoles, FakeSession, LOGIN_PROFILE, MemoryStore, TestHome};
use sso_sync_config::IniDocument;
use sso_sync_shell::{ApplyOutcome, MergeOutcome, ShellError, ShellTarget};
use std::fs;

const TWO_ROLES: [(&str, &str); 2] = [
    ("111111111111", "AdministratorAccess"),
    ("222222222222", "ReadOnly"),
];

// ============================================================================
// Happy path
// ============================================================================

#[test]
fn test_two_roles_produce_profiles_and_sections() {
    let home = TestHome::new();
    let session = FakeSession::new();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    let names: Vec<&str> = report.profiles.iter().map(|p| p.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "sso-111111111111-AdministratorAccess",
            "sso-222222222222-ReadOnly"
        ]
    );
    assert!(!report.has_fatal());
    assert!(report.login_profile_created);

    let doc = IniDocument::parse(&home.config_text()).unwrap();
    for section in [
        "default",
        "profile sso-111111111111-AdministratorAccess",
        "profile sso-222222222222-ReadOnly",
    ] {
        assert_eq!(
            doc.get(section, "sso_start_url"),
            Some("https://d-abc123.awsapps.com/start/#"),
            "section [{section}]"
        );
        assert_eq!(doc.get(section, "sso_region"), Some("us-east-1"));
        assert_eq!(doc.get(section, "region"), Some("eu-west-1"));
        assert_eq!(doc.get(section, "output"), Some("json"));
    }
    assert_eq!(
        doc.get("profile sso-222222222222-ReadOnly", "sso_role_name"),
        Some("ReadOnly")
    );
    // The last role written wins the default section.
    assert_eq!(doc.get("default", "sso_account_id"), Some("222222222222"));
    assert!(doc.has_section(&format!("profile {LOGIN_PROFILE}")));

    assert_eq!(session.logins(), vec![LOGIN_PROFILE.to_string()]);
    assert_eq!(
        roles.seen_tokens.borrow().as_slice(),
        &["token-from-login".to_string()]
    );
}

#[test]
fn test_shell_targets_get_default_profile() {
    let home = TestHome::new();
    let session = FakeSession::new();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    assert_eq!(report.shell.len(), 3);
    assert!(report.shell_skipped.is_none());
    let bashrc = fs::read_to_string(home.bashrc()).unwrap();
    assert!(bashrc.starts_with("export AWS_DEFAULT_PROFILE=default\n\nalias clear_aws="));
    let ps = fs::read_to_string(home.powershell_profile()).unwrap();
    assert!(ps.contains("$env:AWS_DEFAULT_PROFILE = 'default'"));
    assert_eq!(ps.matches("function Clear-AWS").count(), 1);
    assert_eq!(store.get("AWS_DEFAULT_PROFILE").as_deref(), Some("default"));
}

#[test]
fn test_second_run_is_stable() {
    let home = TestHome::new();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let run = || {
        let session = FakeSession::new();
        SyncOrchestrator::new(
            &home.settings,
            &home.aws_paths,
            &home.shell_paths,
            &session,
            &roles,
            &store,
        )
        .run()
        .unwrap()
    };

    run();
    let config_first = home.config_text();
    let bashrc_first = fs::read_to_string(home.bashrc()).unwrap();

    let report = run();
    assert!(!report.login_profile_created);
    assert_eq!(home.config_text(), config_first);
    assert_eq!(fs::read_to_string(home.bashrc()).unwrap(), bashrc_first);
    assert!(matches!(
        report.shell[0].1,
        Ok(ApplyOutcome::File {
            outcome: MergeOutcome::Unchanged,
            ..
        })
    ));
    assert_eq!(
        home.config_text()
            .matches("[profile sso-111111111111-AdministratorAccess]")
            .count(),
        1
    );
}

#[test]
fn test_existing_user_sections_survive() {
    let home = TestHome::new();
    fs::create_dir_all(&home.aws_paths.aws_folder).unwrap();
    fs::write(
        &home.aws_paths.config_file,
        "# managed by hand\n[profile legacy]\nregion = ap-south-1\n",
    )
    .unwrap();

    let session = FakeSession::new();
    let roles = FakeRoles::new(&TWO_ROLES[..1]);
    let store = MemoryStore::new();
    SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    let text = home.config_text();
    assert!(text.starts_with("# managed by hand\n\n[profile legacy]\nregion = ap-south-1\n"));
    let doc = IniDocument::parse(&text).unwrap();
    assert_eq!(doc.get("profile legacy", "region"), Some("ap-south-1"));
}

// ============================================================================
// Aborting failures
// ============================================================================

#[test]
fn test_login_failure_aborts_before_roles() {
    let home = TestHome::new();
    let session = FakeSession::failing_login();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let err = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, SyncError::Login { .. }));
    assert!(roles.seen_tokens.borrow().is_empty());
    assert!(!home.bashrc().exists());
}

#[test]
fn test_missing_token_cache_aborts() {
    let home = TestHome::without_token();
    let session = FakeSession::new();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let err = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, SyncError::NoCacheFound { .. }));
    assert!(!home.config_text().contains("sso-111111111111"));
}

#[test]
fn test_portal_failure_writes_no_profiles() {
    let home = TestHome::new();
    let session = FakeSession::new();
    let roles = FakeRoles::failing();
    let store = MemoryStore::new();

    let err = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, SyncError::Portal(_)));
    let doc = IniDocument::parse(&home.config_text()).unwrap();
    assert!(!doc.has_section("default"));
    assert!(!home.bashrc().exists());
    assert!(store.values.borrow().is_empty());
}

// ============================================================================
// Per-target failures
// ============================================================================

#[test]
fn test_no_roles_skips_shell_profiles() {
    let home = TestHome::new();
    let session = FakeSession::new();
    let roles = FakeRoles::new(&[]);
    let store = MemoryStore::new();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    assert!(report.profiles.is_empty());
    assert!(report.shell.is_empty());
    assert!(report.shell_skipped.is_some());
    assert!(!home.bashrc().exists());
    assert!(!home.powershell_profile().exists());
    assert!(store.values.borrow().is_empty());
    assert!(!report.has_fatal());
}

#[test]
fn test_malformed_role_is_skipped() {
    let home = TestHome::new();
    let session = FakeSession::new();
    // A role with empty fields formats to a name that does not parse back.
    let roles = FakeRoles::new(&[("111111111111", "Admin"), ("", "")]);
    let store = MemoryStore::new();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    assert_eq!(report.profiles.len(), 1);
    assert_eq!(report.role_failures.len(), 1);
    assert!(report.has_fatal());
    assert!(report.config_saved.is_ok());
}

#[test]
fn test_failing_shell_target_does_not_stop_others() {
    let home = TestHome::new();
    fs::write(home.bashrc(), b"\x00\x01binary").unwrap();

    let session = FakeSession::new();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();
    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    let (target, result) = &report.shell[0];
    assert_eq!(*target, ShellTarget::PosixShell);
    assert!(matches!(result, Err(ShellError::Unmergeable { .. })));
    assert_eq!(fs::read(home.bashrc()).unwrap(), b"\x00\x01binary");

    assert!(report.shell[1].1.is_ok());
    assert!(home.powershell_profile().exists());
    assert_eq!(store.get("AWS_DEFAULT_PROFILE").as_deref(), Some("default"));
    assert!(report.config_saved.is_ok());
    assert!(report.has_fatal());
}

#[test]
fn test_unavailable_store_is_skipped_not_fatal() {
    let home = TestHome::new();
    let session = FakeSession::new();
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::unavailable();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    assert!(matches!(
        report.shell[2].1,
        Ok(ApplyOutcome::Skipped { .. })
    ));
    assert!(!report.has_fatal());
}

// ============================================================================
// Identity verification
// ============================================================================

#[test]
fn test_identity_retried_exactly_once() {
    let home = TestHome::new();
    let session = FakeSession::with_identity_script(&[false, true]);
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    assert!(matches!(
        report.identity,
        IdentityOutcome::VerifiedAfterRetry(_)
    ));
    assert_eq!(
        session.logins(),
        vec![LOGIN_PROFILE.to_string(), "default".to_string()]
    );
    assert_eq!(*session.identity_calls.borrow(), 2);
    assert!(!report.has_fatal());
}

#[test]
fn test_identity_failure_after_retry_is_fatal() {
    let home = TestHome::new();
    let session = FakeSession::with_identity_script(&[false, false, false]);
    let roles = FakeRoles::new(&TWO_ROLES);
    let store = MemoryStore::new();

    let report = SyncOrchestrator::new(
        &home.settings,
        &home.aws_paths,
        &home.shell_paths,
        &session,
        &roles,
        &store,
    )
    .run()
    .unwrap();

    assert!(matches!(report.identity, IdentityOutcome::Failed(_)));
    assert_eq!(*session.identity_calls.borrow(), 2);
    assert_eq!(session.logins().len(), 2);
    assert!(report.has_fatal());
}
