// ABOUTME: PhaseExecutor: walks phases and steps in order, hook-wrapping each one.
// ABOUTME: Any failure aborts the run; there is no rollback or resumption.

use crate::config::StageConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::exec::{RemoteExecutor, quote};
use crate::hooks::{HookDispatcher, HookRegistry};
use crate::images::{ImageSyncEngine, SyncOutcome};
use crate::output::Output;
use crate::release::{ReleaseManager, RunContext};

use super::{Phase, Step};

/// Drives one invocation of `deploy`, `prepare` or `deliver`.
pub struct PhaseExecutor {
    config: StageConfig,
    run: RunContext,
    executor: RemoteExecutor,
    hooks: HookDispatcher,
    output: Output,
    diagnostics: Diagnostics,
    depth: usize,
}

impl PhaseExecutor {
    pub fn new(
        config: StageConfig,
        run: RunContext,
        executor: RemoteExecutor,
        registry: HookRegistry,
        output: Output,
    ) -> Self {
        let hooks = HookDispatcher::new(
            registry,
            config.stage.clone(),
            run.hook_context(&config),
            executor.clone(),
            output.clone(),
        );
        Self {
            config,
            run,
            executor,
            hooks,
            output,
            diagnostics: Diagnostics::default(),
            depth: 0,
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn run_context(&self) -> &RunContext {
        &self.run
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run `phase` to completion or first failure.
    pub async fn run(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Deploy => {
                self.enter(phase.name()).await?;
                self.phase(Phase::Prepare).await?;
                self.phase(Phase::Deliver).await?;
                self.leave(phase.name()).await
            }
            Phase::Prepare | Phase::Deliver => self.phase(phase).await,
        }
    }

    /// Release transport resources and hand back collected warnings.
    pub async fn finish(mut self) -> Diagnostics {
        for problem in self.executor.close().await {
            self.diagnostics.warn(Warning::ssh_disconnect(problem));
        }
        self.diagnostics
    }

    async fn phase(&mut self, phase: Phase) -> Result<()> {
        self.enter(phase.name()).await?;
        for step in phase.steps() {
            self.step(*step).await?;
        }
        self.leave(phase.name()).await
    }

    /// Run one step with its hooks. Image steps are skipped entirely,
    /// hooks included, when no image pairings are configured.
    pub async fn step(&mut self, step: Step) -> Result<()> {
        if step.is_image_step() && self.config.images.is_empty() {
            self.output.skipped(step.name(), "no images configured");
            tracing::info!(%step, "skipped: no images configured");
            return Ok(());
        }

        self.enter(step.name()).await?;
        match step {
            Step::CleanLocal => self.clean_local().await?,
            Step::PullImages => self.pull_images().await?,
            Step::CleanRemote => self.clean_remote().await?,
            Step::PushImages => self.push_images().await?,
            Step::PushCode => self.push_code().await?,
            Step::PublishRelease => self.releases().publish().await?,
            Step::CleanupReleases => self.cleanup_releases().await?,
            Step::LogRevision => self.releases().log_revision().await?,
        }
        self.leave(step.name()).await
    }

    async fn enter(&mut self, name: &str) -> Result<()> {
        self.output.begin(name, self.depth);
        tracing::info!(name, "starting");
        self.depth += 1;
        self.hooks.trigger(&format!("before:{name}")).await?;
        Ok(())
    }

    async fn leave(&mut self, name: &str) -> Result<()> {
        self.hooks.trigger(&format!("after:{name}")).await?;
        self.depth = self.depth.saturating_sub(1);
        tracing::info!(name, "finished");
        Ok(())
    }

    fn releases(&self) -> ReleaseManager<'_> {
        ReleaseManager::new(&self.executor, &self.run)
    }

    async fn clean_local(&self) -> Result<()> {
        let path = quote(&self.run.local_tmp_path.to_string_lossy());
        self.executor
            .run_locally(&format!("rm -rf {path} && mkdir -p {path}"))
            .await?;
        Ok(())
    }

    async fn pull_images(&self) -> Result<()> {
        ImageSyncEngine::new(&self.executor, self.config.runtime)
            .pull_and_store(&self.config.images, &self.run.local_images_path())
            .await?;
        Ok(())
    }

    async fn clean_remote(&self) -> Result<()> {
        let path = quote(&self.run.tmp_path);
        self.executor
            .run_on_all_hosts(&format!("rm -rf {path} && mkdir -p {path}"))
            .await?;
        Ok(())
    }

    async fn push_images(&self) -> Result<()> {
        let remote = self.run.remote_images_path();
        self.executor
            .run_on_all_hosts(&format!("mkdir -p {}", quote(&remote)))
            .await?;

        let report = ImageSyncEngine::new(&self.executor, self.config.runtime)
            .sync_to_hosts(&self.config.images, &self.run.local_images_path(), &remote)
            .await?;

        let transferred = report
            .iter()
            .filter(|r| r.outcome == SyncOutcome::Transferred)
            .count();
        tracing::info!(
            transferred,
            up_to_date = report.len() - transferred,
            "images synchronized"
        );
        Ok(())
    }

    /// Upload to the remote tmp tree on every host, then install into the
    /// release directory, so a partial upload never lands in a release.
    async fn push_code(&self) -> Result<()> {
        let releases = self.releases();
        self.executor
            .for_each_host(|host| releases.ensure_unique(host))
            .await?;

        let uploaded = self.run.remote_code_path();
        self.executor
            .copy_to_all_hosts(&self.config.code_dir, &uploaded)
            .await?;

        self.executor
            .for_each_host(|host| releases.install(host, &uploaded))
            .await?;
        Ok(())
    }

    async fn cleanup_releases(&mut self) -> Result<()> {
        let keep = self.config.keep_releases;
        if keep == 0 {
            tracing::info!("keep_releases is 0, retaining every release");
            return Ok(());
        }

        let reports = self.releases().cleanup(keep).await?;
        for report in reports {
            tracing::debug!(host = %report.host, removed = report.plan.remove.len(), "releases cleaned");
            if let Some(release) = report.plan.protected {
                self.diagnostics.warn(Warning::current_release_outside_window(
                    &report.host.to_string(),
                    &release,
                    keep,
                ));
            }
        }
        Ok(())
    }
}
