// ABOUTME: SSH-backed transport with one cached session per host.
// ABOUTME: Sessions open lazily on first use and close at the end of the run.

use async_trait::async_trait;
use parking_lot::Mutex;
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::error::{ExecError, SshSnafu};
use super::transport::{CommandOutput, Transport};
use crate::config::{HostHandle, SshSettings, TunnelSpec};
use crate::ssh::{Session, SessionConfig, Tunnel};

/// Password for remote sessions. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

pub struct SshTransport {
    settings: SshSettings,
    credential: Option<Credential>,
    sessions: Mutex<HashMap<HostHandle, Arc<Session>>>,
}

impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("settings", &self.settings)
            .field("credential", &self.credential)
            .field("sessions", &self.sessions.lock().len())
            .finish()
    }
}

impl SshTransport {
    pub fn new(settings: SshSettings, credential: Option<Credential>) -> Self {
        Self {
            settings,
            credential,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session parameters for `host`, filling gaps from the `ssh` settings.
    pub fn session_config(&self, host: &HostHandle) -> SessionConfig {
        let user = host
            .user
            .clone()
            .or_else(|| self.settings.user.clone())
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()));

        let mut config = SessionConfig::new(&host.host, user)
            .port(host.port.or(self.settings.port).unwrap_or(22))
            .trust_on_first_use(self.settings.trust_first_connection);

        if let Some(key) = &self.settings.key {
            config = config.key_path(key);
        }
        if let Some(known_hosts) = &self.settings.known_hosts {
            config = config.known_hosts_path(known_hosts);
        }
        if let Some(timeout) = self.settings.command_timeout {
            config = config.command_timeout(timeout);
        }
        if let Some(credential) = &self.credential {
            config = config.password(credential.expose());
        }
        config
    }

    async fn session(&self, host: &HostHandle) -> Result<Arc<Session>, ExecError> {
        let cached = self.sessions.lock().get(host).cloned();
        if let Some(session) = cached {
            return Ok(session);
        }

        tracing::debug!(%host, "opening SSH session");
        let session = Arc::new(
            Session::connect(self.session_config(host))
                .await
                .context(SshSnafu {
                    host: host.to_string(),
                })?,
        );

        Ok(Arc::clone(
            self.sessions
                .lock()
                .entry(host.clone())
                .or_insert(session),
        ))
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn run_remote(
        &self,
        host: &HostHandle,
        command: &str,
    ) -> Result<CommandOutput, ExecError> {
        let session = self.session(host).await?;
        session.exec(command).await.context(SshSnafu {
            host: host.to_string(),
        })
    }

    async fn upload(&self, host: &HostHandle, local: &Path, remote: &str) -> Result<(), ExecError> {
        let transfer_error = |message: String| ExecError::Transfer {
            host: host.to_string(),
            local: local.to_path_buf(),
            remote: remote.to_string(),
            message,
        };

        let session = self.session(host).await?;
        let output = session
            .upload(local, remote)
            .await
            .map_err(|e| transfer_error(e.to_string()))?;

        if output.success() {
            Ok(())
        } else {
            Err(transfer_error(format!(
                "exit code {}: {}",
                output.exit_code,
                output.failure_detail()
            )))
        }
    }

    async fn open_tunnel(&self, host: &HostHandle, spec: &TunnelSpec) -> Result<Tunnel, ExecError> {
        let session = self.session(host).await?;
        session
            .open_tunnel(spec.local_port, &spec.remote_host, spec.remote_port)
            .await
            .context(SshSnafu {
                host: host.to_string(),
            })
    }

    async fn close(&self) -> Vec<String> {
        let sessions: Vec<_> = self.sessions.lock().drain().collect();
        let mut problems = Vec::new();
        for (host, session) in sessions {
            if let Err(e) = session.disconnect().await {
                problems.push(format!("SSH disconnect failed for {host}: {e}"));
            }
        }
        problems
    }
}
