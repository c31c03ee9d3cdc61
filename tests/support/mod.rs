// ABOUTME: Shared helpers for integration tests.
// ABOUTME: A recording FakeTransport and builders for throwaway project trees.

#![allow(dead_code)]

use async_trait::async_trait;
use hoist::config::{HostHandle, Settings, StageConfig};
use hoist::exec::{CommandOutput, ExecError, HostIteration, RemoteExecutor, Transport};
use hoist::hooks::{Hook, HookCx};
use hoist::output::{Output, OutputMode};
use hoist::types::StageName;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One interaction with the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Local(String),
    Remote { host: String, command: String },
    Upload { host: String, local: PathBuf, remote: String },
}

impl Call {
    pub fn host(&self) -> Option<&str> {
        match self {
            Call::Local(_) => None,
            Call::Remote { host, .. } | Call::Upload { host, .. } => Some(host),
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            Call::Local(command) | Call::Remote { command, .. } => Some(command),
            Call::Upload { .. } => None,
        }
    }
}

struct Rule {
    host: Option<String>,
    needle: String,
    output: CommandOutput,
}

/// Records every call and answers commands from canned rules.
///
/// The most recently added matching rule wins. Commands without a
/// matching rule succeed with empty output.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    rules: Mutex<Vec<Rule>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer commands containing `needle` (on `host`, or anywhere) with `stdout`.
    pub fn respond(&self, host: Option<&str>, needle: &str, stdout: &str) {
        self.rules.lock().push(Rule {
            host: host.map(str::to_string),
            needle: needle.to_string(),
            output: CommandOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        });
    }

    /// Make commands containing `needle` (on `host`, or anywhere) exit 1.
    pub fn fail(&self, host: Option<&str>, needle: &str) {
        self.rules.lock().push(Rule {
            host: host.map(str::to_string),
            needle: needle.to_string(),
            output: CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("{needle}: simulated failure"),
            },
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Every command issued, local or remote, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.command().map(str::to_string))
            .collect()
    }

    pub fn commands_containing(&self, needle: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.command().is_some_and(|cmd| cmd.contains(needle)))
            .collect()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upload { .. }))
            .collect()
    }

    fn answer(&self, host: Option<&str>, command: &str) -> CommandOutput {
        self.rules
            .lock()
            .iter()
            .rev()
            .find(|rule| {
                command.contains(&rule.needle)
                    && (rule.host.is_none() || rule.host.as_deref() == host)
            })
            .map(|rule| rule.output.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn run_local(&self, command: &str) -> Result<CommandOutput, ExecError> {
        self.calls.lock().push(Call::Local(command.to_string()));
        Ok(self.answer(None, command))
    }

    async fn run_remote(
        &self,
        host: &HostHandle,
        command: &str,
    ) -> Result<CommandOutput, ExecError> {
        let host = host.to_string();
        self.calls.lock().push(Call::Remote {
            host: host.clone(),
            command: command.to_string(),
        });
        Ok(self.answer(Some(&host), command))
    }

    async fn upload(&self, host: &HostHandle, local: &Path, remote: &str) -> Result<(), ExecError> {
        self.calls.lock().push(Call::Upload {
            host: host.to_string(),
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        Ok(())
    }
}

/// Hook that appends the event it fired for to a shared log.
pub struct RecordingHook {
    pub log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Hook for RecordingHook {
    fn describe(&self) -> String {
        "record".to_string()
    }

    async fn call(&self, cx: &HookCx<'_>) -> Result<(), ExecError> {
        self.log.lock().push(cx.event.to_string());
        Ok(())
    }
}

/// Project tree with `hoist.yml`, `stages/<stage>.yml` and a `code/` dir.
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    pub fn new(global: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hoist.yml"), global).unwrap();
        std::fs::create_dir_all(dir.path().join("stages")).unwrap();
        std::fs::create_dir_all(dir.path().join("code")).unwrap();
        std::fs::write(dir.path().join("code/index.html"), "hello\n").unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn stage(self, name: &str, yaml: &str) -> Self {
        std::fs::write(self.path().join(format!("stages/{name}.yml")), yaml).unwrap();
        self
    }

    pub fn load(&self, stage: &str) -> StageConfig {
        StageConfig::load(self.path(), &StageName::new(stage).unwrap()).unwrap()
    }
}

/// Resolve a stage config from inline YAML, rooted at `project`.
pub fn stage_config(project: &Path, stage: &str, yaml: &str) -> StageConfig {
    std::fs::create_dir_all(project.join("code")).unwrap();
    let settings = Settings::from_yaml(yaml).unwrap();
    StageConfig::resolve(project, StageName::new(stage).unwrap(), settings).unwrap()
}

pub fn executor(transport: Arc<dyn Transport>, config: &StageConfig) -> RemoteExecutor {
    RemoteExecutor::new(
        transport,
        config.servers.clone(),
        config.hosts,
        quiet(),
    )
}

pub fn executor_for(transport: Arc<dyn Transport>, hosts: &[&str], iteration: HostIteration) -> RemoteExecutor {
    let servers = nonempty::NonEmpty::from_vec(hosts.iter().map(|h| HostHandle::new(*h)).collect())
        .unwrap();
    RemoteExecutor::new(transport, servers, iteration, quiet())
}

pub fn quiet() -> Output {
    Output::new(OutputMode::Quiet)
}
