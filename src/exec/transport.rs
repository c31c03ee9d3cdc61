// ABOUTME: Transport trait: the raw capability to run commands and copy files.
// ABOUTME: Implementations report exit codes; the executor decides what is fatal.

use async_trait::async_trait;
use std::path::Path;

use super::error::ExecError;
use super::local::run_shell;
use crate::config::{HostHandle, TunnelSpec};
use crate::ssh::Tunnel;

/// Output from a local or remote command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The most useful text to show when the command failed.
    pub fn failure_detail(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Raw execution capability behind a [`super::RemoteExecutor`].
///
/// Every call blocks the caller until the command exits; there is no
/// cancellation beyond an optional per-command timeout in the SSH transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a shell command on the machine driving the deployment.
    async fn run_local(&self, command: &str) -> Result<CommandOutput, ExecError> {
        run_shell(command).await
    }

    /// Run a shell command on `host`.
    async fn run_remote(&self, host: &HostHandle, command: &str)
    -> Result<CommandOutput, ExecError>;

    /// Copy a local file or directory so that it lands at `remote` on `host`.
    async fn upload(&self, host: &HostHandle, local: &Path, remote: &str)
    -> Result<(), ExecError>;

    /// Open a port forward through `host`.
    async fn open_tunnel(
        &self,
        host: &HostHandle,
        _spec: &TunnelSpec,
    ) -> Result<Tunnel, ExecError> {
        Err(ExecError::TunnelUnsupported {
            host: host.to_string(),
        })
    }

    /// Release any per-host resources. Returns non-fatal problems.
    async fn close(&self) -> Vec<String> {
        Vec::new()
    }
}
