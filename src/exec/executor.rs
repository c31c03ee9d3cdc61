// ABOUTME: RemoteExecutor: fail-fast command and copy operations over a Transport.
// ABOUTME: Echoes every command, returns captured output, and walks hosts per strategy.

use futures::{StreamExt, TryStreamExt, stream};
use nonempty::NonEmpty;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use super::error::ExecError;
use super::shell::env_prefix;
use super::strategy::HostIteration;
use super::transport::{CommandOutput, Transport};
use crate::config::{HostHandle, TunnelSpec};
use crate::output::Output;
use crate::ssh::Tunnel;

/// Runs commands locally or on the configured servers.
///
/// Any non-zero exit is returned as [`ExecError::CommandFailed`]; callers
/// propagate it with `?`, which aborts the run.
#[derive(Clone)]
pub struct RemoteExecutor {
    transport: Arc<dyn Transport>,
    servers: NonEmpty<HostHandle>,
    iteration: HostIteration,
    output: Output,
}

impl std::fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("servers", &self.servers)
            .field("iteration", &self.iteration)
            .finish()
    }
}

impl RemoteExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        servers: NonEmpty<HostHandle>,
        iteration: HostIteration,
        output: Output,
    ) -> Self {
        Self {
            transport,
            servers,
            iteration,
            output,
        }
    }

    pub fn servers(&self) -> &NonEmpty<HostHandle> {
        &self.servers
    }

    pub async fn run_locally(&self, command: &str) -> Result<CommandOutput, ExecError> {
        self.run_locally_with_env(command, &[]).await
    }

    pub async fn run_locally_with_env(
        &self,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CommandOutput, ExecError> {
        self.output.command(None, command);
        tracing::debug!(command, "running local command");

        let full = format!("{}{}", env_prefix(env), command);
        let output = self.transport.run_local(&full).await?;
        check("local", command, output)
    }

    pub async fn run_on_host(
        &self,
        host: &HostHandle,
        command: &str,
    ) -> Result<CommandOutput, ExecError> {
        self.run_on_host_with_env(host, command, &[]).await
    }

    pub async fn run_on_host_with_env(
        &self,
        host: &HostHandle,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CommandOutput, ExecError> {
        let target = host.to_string();
        self.output.command(Some(&target), command);
        tracing::debug!(host = %target, command, "running remote command");

        let full = format!("{}{}", env_prefix(env), command);
        let output = self.transport.run_remote(host, &full).await?;
        check(&target, command, output)
    }

    /// Run `command` on every server. Outputs are in server order.
    pub async fn run_on_all_hosts(&self, command: &str) -> Result<Vec<CommandOutput>, ExecError> {
        self.for_each_host(|host| self.run_on_host(host, command))
            .await
    }

    pub async fn run_on_all_hosts_with_env(
        &self,
        command: &str,
        env: &[(String, String)],
    ) -> Result<Vec<CommandOutput>, ExecError> {
        self.for_each_host(|host| self.run_on_host_with_env(host, command, env))
            .await
    }

    pub async fn copy_to_host(
        &self,
        host: &HostHandle,
        local: &Path,
        remote: &str,
    ) -> Result<(), ExecError> {
        let target = host.to_string();
        self.output.transfer(&target, &local.display().to_string(), remote);
        tracing::debug!(host = %target, local = %local.display(), remote, "copying");

        self.transport.upload(host, local, remote).await
    }

    pub async fn copy_to_all_hosts(&self, local: &Path, remote: &str) -> Result<(), ExecError> {
        self.for_each_host(|host| self.copy_to_host(host, local, remote))
            .await
            .map(|_| ())
    }

    /// Apply `f` to every server according to the iteration strategy.
    ///
    /// Sequential mode awaits each host before starting the next. Either
    /// mode stops at the first error and returns results in server order.
    pub async fn for_each_host<'a, T, E, F, Fut>(&'a self, mut f: F) -> Result<Vec<T>, E>
    where
        F: FnMut(&'a HostHandle) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
        T: Send + 'a,
        E: Send + 'a,
    {
        match self.iteration {
            HostIteration::Sequential => {
                let mut results = Vec::with_capacity(self.servers.len());
                for host in self.servers.iter() {
                    results.push(f(host).await?);
                }
                Ok(results)
            }
            HostIteration::Concurrent(limit) => {
                stream::iter(self.servers.iter().map(f))
                    .buffered(limit.get())
                    .boxed()
                    .try_collect()
                    .await
            }
        }
    }

    pub async fn open_tunnel(
        &self,
        host: &HostHandle,
        spec: &TunnelSpec,
    ) -> Result<Tunnel, ExecError> {
        tracing::debug!(
            %host,
            local_port = spec.local_port,
            remote = %format!("{}:{}", spec.remote_host, spec.remote_port),
            "opening tunnel"
        );
        self.transport.open_tunnel(host, spec).await
    }

    /// Release transport resources. Returns non-fatal problems.
    pub async fn close(&self) -> Vec<String> {
        self.transport.close().await
    }
}

/// Hold a port forward through `host` open while `work` runs.
///
/// The tunnel is closed whether `work` succeeds or fails.
pub async fn with_tunnel<T, E, Fut>(
    executor: &RemoteExecutor,
    host: &HostHandle,
    spec: &TunnelSpec,
    work: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<ExecError>,
{
    let tunnel = executor.open_tunnel(host, spec).await?;
    let result = work.await;
    tunnel.close().await;
    result
}

fn check(target: &str, command: &str, output: CommandOutput) -> Result<CommandOutput, ExecError> {
    if output.success() {
        if !output.stdout.trim().is_empty() {
            tracing::debug!(on = target, stdout = %output.stdout.trim(), "command output");
        }
        Ok(output)
    } else {
        Err(ExecError::CommandFailed {
            target: target.to_string(),
            command: command.to_string(),
            exit_code: output.exit_code,
            detail: output.failure_detail().to_string(),
        })
    }
}
