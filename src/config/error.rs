// ABOUTME: Configuration error types.
// ABOUTME: Every variant aborts the run before any local or remote side effect.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found in {0}")]
    NotFound(PathBuf),

    #[error("unknown stage '{stage}': {path} does not exist")]
    UnknownStage { stage: String, path: PathBuf },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("code directory not found: {0}")]
    CodeDirMissing(PathBuf),

    #[error("transport 'local' supports a single server, {0} configured")]
    LocalTransportServers(usize),

    #[error("unknown hook event: {0}")]
    UnknownHookEvent(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}
