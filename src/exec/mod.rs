// ABOUTME: Local and remote command execution for the orchestrator.
// ABOUTME: A RemoteExecutor drives a pluggable Transport across the configured hosts.

mod error;
mod executor;
mod local;
mod shell;
mod ssh;
mod strategy;
mod transport;

pub use error::{ExecError, ExecErrorKind};
pub use executor::{RemoteExecutor, with_tunnel};
pub use local::{LocalTransport, run_shell};
pub use shell::{env_prefix, quote};
pub use ssh::{Credential, SshTransport};
pub use strategy::HostIteration;
pub use transport::{CommandOutput, Transport};
