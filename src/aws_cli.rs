//! Wrapper around the `aws` command line tool.
//!
//! Login (`aws sso login`) is interactive: it opens the browser and prints the
//! device code, so its stdio is inherited. The identity check captures stdout
//! and parses the JSON document `aws sts get-caller-identity` prints.

use crate::error::SyncError;
use serde::Deserialize;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Poll interval while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Identity the current default credentials resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// External SSO session operations.
pub trait SsoSession {
    /// Authenticate `profile` through the browser device flow.
    fn login(&self, profile: &str) -> Result<(), SyncError>;

    /// Resolve the identity of the default credentials.
    fn caller_identity(&self) -> Result<CallerIdentity, SyncError>;
}

/// [`SsoSession`] backed by the installed `aws` binary.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
    timeout: Option<Duration>,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new()
    }
}

struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Wait for `child`, killing it once `timeout` has elapsed.
fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
) -> Result<ExitStatus, SyncError> {
    let spawn_error = |source| SyncError::CommandSpawn {
        program: program.to_string(),
        source,
    };

    let Some(timeout) = timeout else {
        return child.wait().map_err(spawn_error);
    };

    let start = Instant::now();
    loop {
        match child.try_wait().map_err(spawn_error)? {
            Some(status) => return Ok(status),
            None if start.elapsed() > timeout => {
                log::error!(
                    "'{}' timed out after {}s, terminating",
                    program,
                    timeout.as_secs()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(SyncError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
}

fn parse_identity(stdout: &[u8]) -> Result<CallerIdentity, SyncError> {
    serde_json::from_slice(stdout)
        .map_err(|e| SyncError::IdentityCheck(format!("unexpected output: {e}")))
}

impl AwsCli {
    pub fn new() -> Self {
        Self {
            program: "aws".to_string(),
            timeout: None,
        }
    }

    /// Use a different executable (a wrapper script, or an absolute path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Kill commands still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, args: &[&str], capture: bool) -> Result<Finished, SyncError> {
        log::debug!("Running {} {}", self.program, args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(args);
        if capture {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|source| SyncError::CommandSpawn {
            program: self.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let status = wait_with_deadline(&mut child, &self.program, self.timeout)?;

        Ok(Finished {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

impl SsoSession for AwsCli {
    fn login(&self, profile: &str) -> Result<(), SyncError> {
        log::info!("Starting SSO login for profile '{}'", profile);
        let finished = self.run(&["sso", "login", "--profile", profile], false)?;
        if finished.status.success() {
            Ok(())
        } else {
            Err(SyncError::Login {
                profile: profile.to_string(),
                message: format!("aws exited with {}", finished.status),
            })
        }
    }

    fn caller_identity(&self) -> Result<CallerIdentity, SyncError> {
        let finished = self.run(&["sts", "get-caller-identity", "--output", "json"], true)?;
        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(SyncError::IdentityCheck(format!(
                "aws exited with {}: {}",
                finished.status,
                stderr.trim()
            )));
        }
        let identity = parse_identity(&finished.stdout)?;
        log::info!("Credentials resolve to {}", identity.arn);
        Ok(identity)
    }
}
