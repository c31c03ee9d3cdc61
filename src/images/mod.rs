// ABOUTME: Container image distribution to the configured servers.
// ABOUTME: Pulls and retags images locally, then ships archives only to hosts that differ.

mod archive;
mod runtime;

pub use archive::{ArchiveDigests, archive_digests, config_digest, normalize_digest};
pub use runtime::RuntimeType;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::HostHandle;
use crate::exec::{ExecError, RemoteExecutor};
use crate::types::ImageTag;

/// Image pulled as `source` and distributed as `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePairing {
    pub source: ImageTag,
    pub target: ImageTag,
}

impl ImagePairing {
    pub fn new(source: ImageTag, target: ImageTag) -> Self {
        Self { source, target }
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("invalid image archive {}: {reason}", path.display())]
    InvalidArchive { path: PathBuf, reason: String },
}

/// What happened to one pairing on one host during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The host already had an image with the same digest.
    UpToDate,
    /// The archive was copied and loaded.
    Transferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSync {
    pub pairing: usize,
    pub host: HostHandle,
    pub outcome: SyncOutcome,
}

/// File name of the archive for the pairing at `index`.
pub fn archive_name(index: usize) -> String {
    format!("image-{index}.tar")
}

pub struct ImageSyncEngine<'a> {
    executor: &'a RemoteExecutor,
    runtime: RuntimeType,
}

impl<'a> ImageSyncEngine<'a> {
    pub fn new(executor: &'a RemoteExecutor, runtime: RuntimeType) -> Self {
        Self { executor, runtime }
    }

    /// Pull, retag and archive every pairing into `staging`, in order.
    ///
    /// The retagged local image is removed once archived; the source tag
    /// is left alone.
    pub async fn pull_and_store(
        &self,
        pairings: &[ImagePairing],
        staging: &Path,
    ) -> Result<(), ImageError> {
        let staging_str = staging.to_string_lossy();
        self.executor
            .run_locally(&format!("mkdir -p {}", crate::exec::quote(&staging_str)))
            .await?;

        for (index, pairing) in pairings.iter().enumerate() {
            let archive = staging.join(archive_name(index));
            tracing::info!(
                source = %pairing.source,
                retag = %pairing.target,
                "storing image"
            );

            self.executor
                .run_locally(&self.runtime.pull(&pairing.source))
                .await?;
            self.executor
                .run_locally(&self.runtime.tag(&pairing.source, &pairing.target))
                .await?;
            self.executor
                .run_locally(&self.runtime.save(&pairing.target, &archive.to_string_lossy()))
                .await?;
            self.executor
                .run_locally(&self.runtime.remove(&pairing.target))
                .await?;
        }

        Ok(())
    }

    /// Copy and load each archive on every host whose copy of the target
    /// image has a different digest (or none at all).
    pub async fn sync_to_hosts(
        &self,
        pairings: &[ImagePairing],
        local_staging: &Path,
        remote_staging: &str,
    ) -> Result<Vec<HostSync>, ImageError> {
        let mut report = Vec::new();

        for (index, pairing) in pairings.iter().enumerate() {
            let archive = local_staging.join(archive_name(index));
            let digests = archive_digests(&archive).await?;
            let remote_archive = format!("{}/{}", remote_staging, archive_name(index));
            tracing::debug!(image = %pairing.target, digest = %digests.config, "local image digest");

            let outcomes = self
                .executor
                .for_each_host(|host| {
                    self.sync_host(host, pairing, &digests, &archive, &remote_archive)
                })
                .await?;

            report.extend(
                self.executor
                    .servers()
                    .iter()
                    .zip(outcomes)
                    .map(|(host, outcome)| HostSync {
                        pairing: index,
                        host: host.clone(),
                        outcome,
                    }),
            );
        }

        Ok(report)
    }

    async fn sync_host(
        &self,
        host: &HostHandle,
        pairing: &ImagePairing,
        digests: &ArchiveDigests,
        archive: &Path,
        remote_archive: &str,
    ) -> Result<SyncOutcome, ImageError> {
        let inspected = self
            .executor
            .run_on_host(host, &self.runtime.inspect_id(&pairing.target))
            .await?;

        if normalize_digest(&inspected.stdout).is_some_and(|id| digests.matches(&id)) {
            tracing::info!(%host, image = %pairing.target, "image up to date");
            return Ok(SyncOutcome::UpToDate);
        }

        self.executor
            .copy_to_host(host, archive, remote_archive)
            .await?;
        self.executor
            .run_on_host(host, &self.runtime.load(remote_archive))
            .await?;
        Ok(SyncOutcome::Transferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_are_deterministic() {
        assert_eq!(archive_name(0), "image-0.tar");
        assert_eq!(archive_name(12), "image-12.tar");
    }
}
