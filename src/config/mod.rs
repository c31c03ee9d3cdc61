// ABOUTME: Configuration types and loading for hoist.yml and stage overrides.
// ABOUTME: Global settings are loaded first, then the stage file wins on conflict.

mod deserialize;
mod error;
mod hooks;
mod server;

pub use error::ConfigError;
pub use hooks::{HookAction, HookEntry, TunnelSpec};
pub use server::HostHandle;

use deserialize::{deserialize_images_option, deserialize_servers_option};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exec::HostIteration;
use crate::images::{ImagePairing, RuntimeType};
use crate::types::StageName;

pub const CONFIG_FILENAME: &str = "hoist.yml";
pub const CONFIG_FILENAME_ALT: &str = "hoist.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hoist/config.yml";
pub const STAGES_DIR: &str = "stages";
pub const HOOKS_DIR: &str = ".hoist/hooks";
pub const LOCAL_TMP_DIR: &str = ".hoist/tmp";

const DEFAULT_KEEP_RELEASES: usize = 5;
const DEFAULT_CODE_DIR: &str = "code";

/// How commands reach the configured servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// SSH sessions to each server.
    #[default]
    Ssh,
    /// Every server is the local machine.
    Local,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshSettings {
    /// Login user when the server entry does not name one.
    #[serde(default)]
    pub user: Option<String>,
    /// Port when the server entry does not name one (default: 22).
    #[serde(default)]
    pub port: Option<u16>,
    /// Private key file. Falls back to the SSH agent, then default keys.
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
    #[serde(default)]
    pub trust_first_connection: bool,
    /// Per-command limit. Unset means a command may block indefinitely.
    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,
}

/// Raw settings from one YAML file. Every key is optional so a stage
/// file can override any subset of the global file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub deploy_to: Option<String>,
    #[serde(default)]
    pub keep_releases: Option<usize>,
    #[serde(default, deserialize_with = "deserialize_servers_option")]
    pub servers: Option<NonEmpty<HostHandle>>,
    #[serde(default, deserialize_with = "deserialize_images_option")]
    pub images: Option<Vec<ImagePairing>>,
    #[serde(default)]
    pub code: Option<PathBuf>,
    #[serde(default)]
    pub runtime: Option<RuntimeType>,
    #[serde(default)]
    pub transport: Option<TransportKind>,
    #[serde(default)]
    pub hosts: Option<HostIteration>,
    #[serde(default)]
    pub ssh: Option<SshSettings>,
    #[serde(default)]
    pub hooks: BTreeMap<String, Vec<HookEntry>>,
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `stage` on top of `self`. Keys present in `stage` win;
    /// hook lists are replaced per event name.
    pub fn merge(self, stage: Settings) -> Settings {
        let mut hooks = self.hooks;
        hooks.extend(stage.hooks);

        Settings {
            application: stage.application.or(self.application),
            deploy_to: stage.deploy_to.or(self.deploy_to),
            keep_releases: stage.keep_releases.or(self.keep_releases),
            servers: stage.servers.or(self.servers),
            images: stage.images.or(self.images),
            code: stage.code.or(self.code),
            runtime: stage.runtime.or(self.runtime),
            transport: stage.transport.or(self.transport),
            hosts: stage.hosts.or(self.hosts),
            ssh: stage.ssh.or(self.ssh),
            hooks,
        }
    }
}

/// Fully resolved configuration for one stage. Read-only for the run.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub application: String,
    pub stage: StageName,
    /// Absolute remote path without a trailing slash.
    pub deploy_to: String,
    /// Number of releases to retain; 0 keeps everything.
    pub keep_releases: usize,
    pub servers: NonEmpty<HostHandle>,
    pub images: Vec<ImagePairing>,
    pub project_dir: PathBuf,
    pub code_dir: PathBuf,
    pub runtime: RuntimeType,
    pub transport: TransportKind,
    pub hosts: HostIteration,
    pub ssh: SshSettings,
    pub hooks: BTreeMap<String, Vec<HookEntry>>,
}

impl StageConfig {
    /// Load the global config from `project_dir` and overlay
    /// `stages/<stage>.yml`.
    pub fn load(project_dir: &Path, stage: &StageName) -> Result<Self, ConfigError> {
        let global = Settings::load(&discover_global(project_dir)?)?;
        let stage_settings = Settings::load(&discover_stage(project_dir, stage)?)?;
        Self::resolve(project_dir, stage.clone(), global.merge(stage_settings))
    }

    /// Validate merged settings into a stage config.
    pub fn resolve(
        project_dir: &Path,
        stage: StageName,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let application = settings
            .application
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::Missing("application"))?;
        let deploy_to = normalize_deploy_to(
            &settings
                .deploy_to
                .ok_or(ConfigError::Missing("deploy_to"))?,
        )?;
        let servers = settings.servers.ok_or(ConfigError::Missing("servers"))?;
        let transport = settings.transport.unwrap_or_default();
        // Every local "host" is this machine; a second one would reinstall the same release.
        if transport == TransportKind::Local && servers.len() > 1 {
            return Err(ConfigError::LocalTransportServers(servers.len()));
        }

        let code_dir = project_dir.join(
            settings
                .code
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CODE_DIR)),
        );
        if !code_dir.is_dir() {
            return Err(ConfigError::CodeDirMissing(code_dir));
        }

        for (event, entries) in &settings.hooks {
            if !crate::hooks::is_known_event(event) {
                return Err(ConfigError::UnknownHookEvent(event.clone()));
            }
            for entry in entries {
                entry.action(event)?;
            }
        }

        Ok(StageConfig {
            application,
            stage,
            deploy_to,
            keep_releases: settings.keep_releases.unwrap_or(DEFAULT_KEEP_RELEASES),
            servers,
            images: settings.images.unwrap_or_default(),
            project_dir: project_dir.to_path_buf(),
            code_dir,
            runtime: settings.runtime.unwrap_or_default(),
            transport,
            hosts: settings.hosts.unwrap_or_default(),
            ssh: settings.ssh.unwrap_or_default(),
            hooks: settings.hooks,
        })
    }

    /// Directory scanned for executable hook scripts.
    pub fn hooks_dir(&self) -> PathBuf {
        self.project_dir.join(HOOKS_DIR)
    }
}

fn discover_global(dir: &Path) -> Result<PathBuf, ConfigError> {
    [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))
}

fn discover_stage(dir: &Path, stage: &StageName) -> Result<PathBuf, ConfigError> {
    let stages = dir.join(STAGES_DIR);
    let yml = stages.join(format!("{stage}.yml"));
    let yaml = stages.join(format!("{stage}.yaml"));

    if yml.is_file() {
        Ok(yml)
    } else if yaml.is_file() {
        Ok(yaml)
    } else {
        Err(ConfigError::UnknownStage {
            stage: stage.to_string(),
            path: yml,
        })
    }
}

fn normalize_deploy_to(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !raw.trim().starts_with('/') || trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "deploy_to must be an absolute path below /, got {raw:?}"
        )));
    }
    if trimmed.contains('\0') || trimmed.split('/').any(|part| part == "..") {
        return Err(ConfigError::Invalid(format!(
            "deploy_to must not contain '..' or NUL: {raw:?}"
        )));
    }
    Ok(trimmed.to_string())
}
