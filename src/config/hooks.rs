// ABOUTME: Hook declarations as they appear in configuration files.
// ABOUTME: Each entry is exactly one of a local command, remote command, or script.

use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// One hook entry under `hooks.<event>` in the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookEntry {
    /// Shell command run on the machine driving the deployment.
    #[serde(default)]
    pub local: Option<String>,
    /// Shell command run on every configured server.
    #[serde(default)]
    pub remote: Option<String>,
    /// Executable run locally, path relative to the project directory.
    #[serde(default)]
    pub script: Option<PathBuf>,
    /// Port forward held open while a local command or script runs.
    #[serde(default)]
    pub tunnel: Option<TunnelSpec>,
}

/// Local TCP port forwarded through the first server's SSH session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TunnelSpec {
    pub local_port: u16,
    #[serde(default = "default_remote_host")]
    pub remote_host: String,
    pub remote_port: u16,
}

fn default_remote_host() -> String {
    "127.0.0.1".to_string()
}

/// Validated shape of a [`HookEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    Local(String),
    Remote(String),
    Script(PathBuf),
}

impl HookEntry {
    pub fn action(&self, event: &str) -> Result<HookAction, ConfigError> {
        let action = match (&self.local, &self.remote, &self.script) {
            (Some(cmd), None, None) => HookAction::Local(cmd.clone()),
            (None, Some(cmd), None) => HookAction::Remote(cmd.clone()),
            (None, None, Some(path)) => HookAction::Script(path.clone()),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "hook for {event} must set exactly one of local, remote, script"
                )));
            }
        };

        if self.tunnel.is_some() && matches!(action, HookAction::Remote(_)) {
            return Err(ConfigError::Invalid(format!(
                "hook for {event}: tunnel is only supported for local commands and scripts"
            )));
        }

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_action_required() {
        let entry = HookEntry {
            local: Some("make".into()),
            remote: Some("ls".into()),
            ..Default::default()
        };
        assert!(entry.action("before:deploy").is_err());
        assert!(HookEntry::default().action("before:deploy").is_err());
    }

    #[test]
    fn remote_hooks_cannot_tunnel() {
        let entry = HookEntry {
            remote: Some("ls".into()),
            tunnel: Some(TunnelSpec {
                local_port: 15432,
                remote_host: default_remote_host(),
                remote_port: 5432,
            }),
            ..Default::default()
        };
        assert!(entry.action("after:deploy").is_err());
    }

    #[test]
    fn script_action() {
        let entry = HookEntry {
            script: Some(PathBuf::from("bin/notify")),
            ..Default::default()
        };
        assert_eq!(
            entry.action("after:deploy").unwrap(),
            HookAction::Script(PathBuf::from("bin/notify"))
        );
    }
}
