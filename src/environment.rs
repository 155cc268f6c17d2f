//! Process environment cleanup.
//!
//! Exported session credentials (or a stale `AWS_DEFAULT_PROFILE`) would take
//! precedence over the freshly written profiles for every `aws` call this
//! process makes, so they are removed once before a run starts.

/// Variables cleared from the process environment at the start of a run.
pub const AWS_ENV_VARS: [&str; 4] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_DEFAULT_PROFILE",
];

/// Remove `names` from this process's environment.
///
/// Returns the names that were actually set. Must be called before any other
/// thread is spawned.
pub fn clear_process_environment(names: &[&str]) -> Vec<String> {
    let mut cleared = Vec::new();
    for name in names {
        if std::env::var_os(name).is_some() {
            // SAFETY: `remove_var` is `unsafe` in Rust 2024 because it races
            // with concurrent environment access. This runs on the main thread
            // during startup, before the run spawns any thread.
            unsafe {
                std::env::remove_var(name);
            }
            log::info!("Cleared process environment variable {name}");
            cleared.push((*name).to_string());
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_reports_only_present_variables() {
        let present = "AWS_SSO_SYNC_TEST_PRESENT_VAR";
        let absent = "AWS_SSO_SYNC_TEST_ABSENT_VAR";
        // SAFETY: test-local variable names no other test touches.
        unsafe {
            std::env::set_var(present, "1");
        }

        let cleared = clear_process_environment(&[present, absent]);
        assert_eq!(cleared, vec![present.to_string()]);
        assert!(std::env::var_os(present).is_none());
    }
}
