// ABOUTME: Hooks declared in configuration: shell commands and executable scripts.
// ABOUTME: Local hooks may hold a port forward through the first server while they run.

use async_trait::async_trait;
use std::path::PathBuf;

use super::{Hook, HookCx};
use crate::config::TunnelSpec;
use crate::exec::{ExecError, quote, with_tunnel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Local,
    Remote,
}

/// A shell command run locally or on every server.
#[derive(Debug, Clone)]
pub struct CommandHook {
    command: String,
    location: Location,
    tunnel: Option<TunnelSpec>,
}

impl CommandHook {
    pub fn local(command: String, tunnel: Option<TunnelSpec>) -> Self {
        Self {
            command,
            location: Location::Local,
            tunnel,
        }
    }

    pub fn remote(command: String) -> Self {
        Self {
            command,
            location: Location::Remote,
            tunnel: None,
        }
    }
}

#[async_trait]
impl Hook for CommandHook {
    fn describe(&self) -> String {
        match self.location {
            Location::Local => self.command.clone(),
            Location::Remote => format!("[remote] {}", self.command),
        }
    }

    async fn call(&self, cx: &HookCx<'_>) -> Result<(), ExecError> {
        match self.location {
            Location::Remote => {
                cx.executor
                    .run_on_all_hosts_with_env(&self.command, &cx.env)
                    .await?;
                Ok(())
            }
            Location::Local => run_local(cx, &self.command, self.tunnel.as_ref()).await,
        }
    }
}

/// An executable run on the machine driving the deployment.
#[derive(Debug, Clone)]
pub struct ScriptHook {
    path: PathBuf,
    tunnel: Option<TunnelSpec>,
}

impl ScriptHook {
    pub fn new(path: PathBuf, tunnel: Option<TunnelSpec>) -> Self {
        Self { path, tunnel }
    }
}

#[async_trait]
impl Hook for ScriptHook {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn call(&self, cx: &HookCx<'_>) -> Result<(), ExecError> {
        let command = quote(&self.path.to_string_lossy());
        run_local(cx, &command, self.tunnel.as_ref()).await
    }
}

async fn run_local(
    cx: &HookCx<'_>,
    command: &str,
    tunnel: Option<&TunnelSpec>,
) -> Result<(), ExecError> {
    let work = async {
        cx.executor.run_locally_with_env(command, &cx.env).await?;
        Ok::<(), ExecError>(())
    };

    match tunnel {
        Some(spec) => with_tunnel(cx.executor, cx.executor.servers().first(), spec, work).await,
        None => work.await,
    }
}
