// ABOUTME: Reads the content digest of a saved image archive.
// ABOUTME: Config blob id from manifest.json plus manifest digests from an OCI index.json.

use serde::Deserialize;
use std::fs::File;
use std::path::Path;

use super::ImageError;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Config")]
    config: String,
}

/// Digests that identify the image stored in an archive.
///
/// `config` is the image config blob id, which is what `image inspect`
/// reports as `.Id` under the classic docker store and podman. With the
/// containerd image store docker reports the manifest (or index) digest
/// instead; those are read from the OCI `index.json` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDigests {
    pub config: String,
    pub manifests: Vec<String>,
}

impl ArchiveDigests {
    /// Whether a normalized remote image id names this image.
    pub fn matches(&self, remote: &str) -> bool {
        self.config == remote || self.manifests.iter().any(|m| m == remote)
    }
}

#[derive(Debug, Deserialize)]
struct OciIndex {
    #[serde(default)]
    manifests: Vec<OciDescriptor>,
}

#[derive(Debug, Deserialize)]
struct OciDescriptor {
    digest: String,
}

/// Read the identifying digests of the image stored in `path`.
pub async fn archive_digests(path: &Path) -> Result<ArchiveDigests, ImageError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_archive_digests(&owned))
        .await
        .map_err(|e| ImageError::InvalidArchive {
            path: path.to_path_buf(),
            reason: format!("digest task failed: {e}"),
        })?
}

fn read_archive_digests(path: &Path) -> Result<ArchiveDigests, ImageError> {
    let invalid = |reason: String| ImageError::InvalidArchive {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
    let mut archive = tar::Archive::new(file);
    let mut config = None;
    let mut manifests = Vec::new();

    for entry in archive.entries().map_err(|e| invalid(e.to_string()))? {
        let entry = entry.map_err(|e| invalid(e.to_string()))?;
        let name = {
            let entry_path = entry.path().map_err(|e| invalid(e.to_string()))?;
            entry_path
                .strip_prefix("./")
                .unwrap_or(entry_path.as_ref())
                .to_path_buf()
        };

        if name == Path::new("manifest.json") {
            let manifest: Vec<ManifestEntry> =
                serde_json::from_reader(entry).map_err(|e| invalid(e.to_string()))?;
            let first = manifest
                .first()
                .ok_or_else(|| invalid("manifest.json lists no images".to_string()))?;
            config = Some(config_digest(&first.config).ok_or_else(|| {
                invalid(format!("unrecognised config entry {:?}", first.config))
            })?);
        } else if name == Path::new("index.json") {
            let index: OciIndex =
                serde_json::from_reader(entry).map_err(|e| invalid(e.to_string()))?;
            manifests.extend(
                index
                    .manifests
                    .iter()
                    .filter_map(|d| normalize_digest(&d.digest)),
            );
        }
    }

    let config = config.ok_or_else(|| invalid("manifest.json not found".to_string()))?;
    Ok(ArchiveDigests { config, manifests })
}

/// Map a manifest `Config` entry to a digest. Handles both the classic
/// `<hex>.json` layout and the OCI `blobs/sha256/<hex>` layout.
pub fn config_digest(config: &str) -> Option<String> {
    let hex = config
        .strip_prefix("blobs/sha256/")
        .or_else(|| config.strip_suffix(".json"))?;
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("sha256:{hex}"))
}

/// Normalize CLI output of an image id for comparison. Podman prints the
/// bare hex id; docker prefixes it with `sha256:`.
pub fn normalize_digest(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains(':') {
        Some(raw.to_string())
    } else {
        Some(format!("sha256:{raw}"))
    }
}
