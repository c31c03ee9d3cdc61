// ABOUTME: Local shell execution and the same-machine transport.
// ABOUTME: LocalTransport treats every configured host as the local machine.

use async_trait::async_trait;
use snafu::ResultExt;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::error::{ExecError, SpawnSnafu};
use super::shell::quote;
use super::transport::{CommandOutput, Transport};
use crate::config::HostHandle;

/// Run `command` with `sh -c`, capturing stdout and stderr.
pub async fn run_shell(command: &str) -> Result<CommandOutput, ExecError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context(SpawnSnafu { command })?;

    // Killed by a signal: report it the way a shell would (128 + signal).
    let exit_code = match output.status.code() {
        Some(code) => u32::try_from(code).unwrap_or(u32::MAX),
        None => 128 + output.status.signal().map_or(0, |s| s.unsigned_abs()),
    };

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Transport for deployments onto the machine running hoist.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransport;

#[async_trait]
impl Transport for LocalTransport {
    async fn run_remote(
        &self,
        _host: &HostHandle,
        command: &str,
    ) -> Result<CommandOutput, ExecError> {
        run_shell(command).await
    }

    async fn upload(&self, host: &HostHandle, local: &Path, remote: &str) -> Result<(), ExecError> {
        let source = quote(&local.to_string_lossy());
        let command = if local.is_dir() {
            format!("mkdir -p {0} && cp -R {1}/. {0}/", quote(remote), source)
        } else {
            let parent = Path::new(remote)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string());
            format!("mkdir -p {} && cp {} {}", quote(&parent), source, quote(remote))
        };

        let output = run_shell(&command).await?;
        if output.success() {
            Ok(())
        } else {
            Err(ExecError::Transfer {
                host: host.to_string(),
                local: local.to_path_buf(),
                remote: remote.to_string(),
                message: output.failure_detail().to_string(),
            })
        }
    }
}
