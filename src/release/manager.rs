// ABOUTME: Release lifecycle on the servers: install, publish, retain, record.
// ABOUTME: Publishing swaps the current symlink with a single rename.

use thiserror::Error;

use super::RunContext;
use crate::config::HostHandle;
use crate::exec::{ExecError, RemoteExecutor, quote};
use crate::types::ReleaseId;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("release {path} already exists on {host}")]
    Exists { host: String, path: String },
}

/// Which releases one host's cleanup removes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Release ids to delete, newest first.
    pub remove: Vec<String>,
    /// Release `current` points to that fell outside the keep window and
    /// was kept anyway.
    pub protected: Option<String>,
}

/// Result of cleanup on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub host: HostHandle,
    pub plan: CleanupPlan,
}

/// Decide what to delete from a `ls -1 releases` listing.
///
/// Entries that are not release ids are never touched. The newest `keep`
/// releases survive; `keep == 0` removes nothing.
pub fn plan_cleanup(listing: &str, keep: usize, current: Option<&str>) -> CleanupPlan {
    if keep == 0 {
        return CleanupPlan::default();
    }

    let mut releases: Vec<ReleaseId> = listing
        .lines()
        .map(str::trim)
        .filter_map(|name| ReleaseId::parse(name).ok())
        .collect();
    releases.sort_unstable_by(|a, b| b.cmp(a));
    releases.dedup();

    let mut plan = CleanupPlan::default();
    for release in releases.into_iter().skip(keep) {
        if current == Some(release.as_str()) {
            plan.protected = Some(release.to_string());
        } else {
            plan.remove.push(release.to_string());
        }
    }
    plan
}

/// Release operations for one run, applied across all servers.
pub struct ReleaseManager<'a> {
    executor: &'a RemoteExecutor,
    run: &'a RunContext,
}

impl<'a> ReleaseManager<'a> {
    pub fn new(executor: &'a RemoteExecutor, run: &'a RunContext) -> Self {
        Self { executor, run }
    }

    /// Fail if this run's release directory is already present on `host`.
    pub async fn ensure_unique(&self, host: &HostHandle) -> Result<(), ReleaseError> {
        let path = quote(&self.run.release_path);
        let output = self
            .executor
            .run_on_host(host, &format!("if [ -e {path} ]; then echo exists; fi"))
            .await?;

        if output.stdout.trim() == "exists" {
            return Err(ReleaseError::Exists {
                host: host.to_string(),
                path: self.run.release_path.clone(),
            });
        }
        Ok(())
    }

    /// Copy the uploaded code tree into a fresh release directory on `host`.
    pub async fn install(&self, host: &HostHandle, uploaded: &str) -> Result<(), ReleaseError> {
        let release = quote(&self.run.release_path);
        let command = format!(
            "mkdir -p {} && mkdir {release} && cp -R {}/. {release}/",
            quote(&self.run.releases_path),
            quote(uploaded),
        );
        self.executor.run_on_host(host, &command).await?;
        Ok(())
    }

    /// Point `current` at this run's release on every server.
    pub async fn publish(&self) -> Result<(), ReleaseError> {
        let command = publish_command(
            &self.run.release_path,
            &self.run.current_path,
            &self.run.release_id,
        );
        self.executor.run_on_all_hosts(&command).await?;
        Ok(())
    }

    /// Remove releases beyond the newest `keep` on every server.
    pub async fn cleanup(&self, keep: usize) -> Result<Vec<CleanupReport>, ReleaseError> {
        self.executor
            .for_each_host(|host| self.cleanup_host(host, keep))
            .await
    }

    async fn cleanup_host(
        &self,
        host: &HostHandle,
        keep: usize,
    ) -> Result<CleanupReport, ReleaseError> {
        let releases = quote(&self.run.releases_path);
        let listing = self
            .executor
            .run_on_host(host, &format!("ls -1 {releases}"))
            .await?;
        let current = self
            .executor
            .run_on_host(
                host,
                &format!("readlink {} || true", quote(&self.run.current_path)),
            )
            .await?;
        let current_id = current
            .stdout
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty());

        let plan = plan_cleanup(&listing.stdout, keep, current_id);
        if let Some(protected) = &plan.protected {
            tracing::warn!(%host, release = %protected, "current release is outside the keep window");
        }

        if !plan.remove.is_empty() {
            let targets: Vec<String> = plan.remove.iter().map(|id| quote(id)).collect();
            self.executor
                .run_on_host(
                    host,
                    &format!("cd {releases} && rm -rf -- {}", targets.join(" ")),
                )
                .await?;
        }

        Ok(CleanupReport {
            host: host.clone(),
            plan,
        })
    }

    /// Append `<version> deployed as <release_id> by <actor>` to the
    /// revisions log on every server.
    pub async fn log_revision(&self) -> Result<(), ReleaseError> {
        let line = revision_line(
            self.run.version.as_str(),
            &self.run.release_id,
            &self.run.actor,
        );
        let command = format!(
            "echo {} >> {}",
            quote(&line),
            quote(&self.run.revisions_log)
        );
        self.executor.run_on_all_hosts(&command).await?;
        Ok(())
    }
}

pub fn revision_line(version: &str, release_id: &ReleaseId, actor: &str) -> String {
    format!("{version} deployed as {release_id} by {actor}")
}

/// The symlink is built beside `current` and renamed over it, so readers
/// see either the old target or the new one.
fn publish_command(release: &str, current: &str, release_id: &ReleaseId) -> String {
    let staged = quote(&format!("{current}.tmp-{release_id}"));
    let release = quote(release);
    format!(
        "test -d {release} && ln -sfn {release} {staged} && mv -Tf {staged} {}",
        quote(current)
    )
}
