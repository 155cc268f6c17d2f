// Library exports for the binary and the integration tests.
//
// The run is synchronous and single threaded. The only threads are the pipe
// readers `aws_cli` spawns per child process, after the process environment
// has been cleared.

/// Application version (root crate version).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod aws_cli;
pub mod cli;
pub mod debug;
pub mod environment;
pub mod error;
pub mod http;
pub mod portal;
pub mod sync;
pub mod token_cache;

pub use aws_cli::{AwsCli, CallerIdentity, SsoSession};
pub use error::SyncError;
pub use portal::{PortalClient, RoleSource, console_url};
pub use sync::{IdentityOutcome, RoleFailure, SyncOrchestrator, SyncReport};
pub use token_cache::SessionToken;
