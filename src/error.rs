// ABOUTME: Crate-level error type wrapping each module's errors.
// ABOUTME: kind() sorts every failure into the operator-facing taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::exec::{ExecError, ExecErrorKind};
use crate::hooks::HookError;
use crate::images::ImageError;
use crate::release::ReleaseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure classes. Every one of them aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed configuration or arguments.
    Configuration,
    /// A local or remote command exited non-zero.
    RemoteCommand,
    /// A file copy to a host failed.
    Transfer,
    /// A user-supplied hook failed.
    Hook,
    /// An SSH session could not be established or broke.
    Ssh,
    /// Local filesystem failure.
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::InvalidArgument(_) => ErrorKind::Configuration,
            Error::Exec(e) => exec_kind(e),
            Error::Image(ImageError::Exec(e)) => exec_kind(e),
            Error::Image(ImageError::InvalidArchive { .. }) => ErrorKind::Io,
            Error::Release(ReleaseError::Exec(e)) => exec_kind(e),
            Error::Release(ReleaseError::Exists { .. }) => ErrorKind::RemoteCommand,
            Error::Hook(_) => ErrorKind::Hook,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

fn exec_kind(error: &ExecError) -> ErrorKind {
    match (error, error.kind()) {
        (ExecError::Ssh { .. }, _) => ErrorKind::Ssh,
        (_, ExecErrorKind::Transfer) => ErrorKind::Transfer,
        (_, ExecErrorKind::CommandFailed | ExecErrorKind::Execution) => ErrorKind::RemoteCommand,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn command_failed() -> ExecError {
        ExecError::CommandFailed {
            target: "web1".into(),
            command: "false".into(),
            exit_code: 1,
            detail: String::new(),
        }
    }

    #[test]
    fn nested_exec_errors_keep_their_kind() {
        assert_eq!(Error::from(command_failed()).kind(), ErrorKind::RemoteCommand);
        assert_eq!(
            Error::from(ImageError::from(command_failed())).kind(),
            ErrorKind::RemoteCommand
        );

        let transfer = ExecError::Transfer {
            host: "web1".into(),
            local: "code".into(),
            remote: "/srv/tmp/code".into(),
            message: "disk full".into(),
        };
        assert_eq!(Error::from(transfer).kind(), ErrorKind::Transfer);
    }

    #[test]
    fn hook_failures_are_hook_errors() {
        let error = Error::from(HookError {
            event: "before:deploy".into(),
            source: command_failed(),
        });
        assert_eq!(error.kind(), ErrorKind::Hook);
        assert!(error.to_string().contains("before:deploy"));
    }

    #[test]
    fn config_errors_are_configuration() {
        let error = Error::from(ConfigError::Missing("servers"));
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }
}
