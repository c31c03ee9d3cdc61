// ABOUTME: Execution error types with SNAFU context selectors.
// ABOUTME: Separates failed commands from failed transfers for error reporting.

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExecError {
    #[snafu(display(
        "command failed on {target} (exit code {exit_code}): {command}{}",
        detail_suffix(detail)
    ))]
    CommandFailed {
        target: String,
        command: String,
        exit_code: u32,
        detail: String,
    },

    #[snafu(display("failed to spawn local command `{command}`: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("copy of {} to {host}:{remote} failed: {message}", local.display()))]
    Transfer {
        host: String,
        local: PathBuf,
        remote: String,
        message: String,
    },

    #[snafu(display("SSH error on {host}: {source}"))]
    Ssh {
        host: String,
        source: crate::ssh::Error,
    },

    #[snafu(display("tunnels are not supported by the transport for {host}"))]
    TunnelUnsupported { host: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// A command ran and exited non-zero.
    CommandFailed,
    /// A command could not be started or its session failed.
    Execution,
    /// A file copy to a host failed.
    Transfer,
}

impl ExecError {
    pub fn kind(&self) -> ExecErrorKind {
        match self {
            ExecError::CommandFailed { .. } => ExecErrorKind::CommandFailed,
            ExecError::Transfer { .. } => ExecErrorKind::Transfer,
            ExecError::Spawn { .. }
            | ExecError::Ssh { .. }
            | ExecError::TunnelUnsupported { .. } => ExecErrorKind::Execution,
        }
    }
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!("\n{detail}")
    }
}
