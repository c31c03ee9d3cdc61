// ABOUTME: Diagnostics accumulator for non-fatal warnings during a run.
// ABOUTME: Warnings are shown after the run and never change its exit status.

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }

    pub fn current_release_outside_window(host: &str, release: &str, keep: usize) -> Self {
        Self {
            kind: WarningKind::CurrentReleaseOutsideWindow,
            message: format!(
                "{host}: current release {release} is older than the newest {keep} and was kept"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to cleanly disconnect an SSH session.
    SshDisconnect,
    /// Cleanup would have removed the release `current` points to.
    CurrentReleaseOutsideWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::ssh_disconnect("connection reset"));
        diag.warn(Warning::current_release_outside_window(
            "web1",
            "20240101-000000",
            2,
        ));

        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.warnings()[0].kind, WarningKind::SshDisconnect);
        assert_eq!(
            diag.warnings()[1].kind,
            WarningKind::CurrentReleaseOutsideWindow
        );
        assert!(diag.warnings()[1].message.contains("20240101-000000"));
    }
}
