// ABOUTME: Runs one phase: load config, pick a transport, execute, report.
// ABOUTME: Warnings are printed even when the run fails.

use hoist::config::{StageConfig, TransportKind};
use hoist::deploy::{Phase, PhaseExecutor};
use hoist::error::{Error, Result};
use hoist::exec::{Credential, LocalTransport, RemoteExecutor, SshTransport, Transport};
use hoist::hooks::HookRegistry;
use hoist::output::Output;
use hoist::release::RunContext;
use hoist::types::{StageName, Version};
use std::path::Path;
use std::sync::Arc;

/// Run `phase` for `stage` at `version` from the project in `project_dir`.
pub async fn run_phase(
    phase: Phase,
    project_dir: &Path,
    stage: &str,
    version: &str,
    password: Option<String>,
    mut output: Output,
) -> Result<()> {
    let stage = StageName::new(stage).map_err(|e| Error::InvalidArgument(e.to_string()))?;
    let version = Version::new(version).map_err(|e| Error::InvalidArgument(e.to_string()))?;

    let config = StageConfig::load(project_dir, &stage)?;
    let registry = HookRegistry::from_config(&config)?;
    let run = RunContext::establish(&config, version);

    tracing::debug!(?registry, "hooks registered");
    output.start_timer();
    output.progress(&format!(
        "{} {} {} to {} ({} server(s), release {})",
        phase,
        config.application,
        run.version,
        config.stage,
        config.servers.len(),
        run.release_id
    ));

    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Ssh => Arc::new(SshTransport::new(
            config.ssh.clone(),
            password.map(Credential::new),
        )),
        TransportKind::Local => Arc::new(LocalTransport),
    };
    let executor = RemoteExecutor::new(
        transport,
        config.servers.clone(),
        config.hosts,
        output.clone(),
    );

    let mut phases = PhaseExecutor::new(config, run, executor, registry, output.clone());
    let result = phases.run(phase).await;
    let release = phases.run_context().release_id.clone();
    let diagnostics = phases.finish().await;

    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }

    result?;
    output.success(&format!("{phase} complete (release {release})"));
    Ok(())
}
