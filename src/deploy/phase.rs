// ABOUTME: The fixed set of phases and steps a run walks through.
// ABOUTME: Names double as hook event suffixes (before:<name>, after:<name>).

use std::fmt;

/// A top-level workflow. `Deploy` is `Prepare` followed by `Deliver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Deploy,
    Prepare,
    Deliver,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Deploy, Phase::Prepare, Phase::Deliver];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Deploy => "deploy",
            Phase::Prepare => "prepare",
            Phase::Deliver => "deliver",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Steps run directly by this phase, in order. Empty for `Deploy`,
    /// which is composed of the other two phases.
    pub fn steps(self) -> &'static [Step] {
        match self {
            Phase::Deploy => &[],
            Phase::Prepare => &[Step::CleanLocal, Step::PullImages],
            Phase::Deliver => &[
                Step::CleanRemote,
                Step::PushImages,
                Step::PushCode,
                Step::PublishRelease,
                Step::CleanupReleases,
                Step::LogRevision,
            ],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An individually hook-wrapped unit of work within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CleanLocal,
    PullImages,
    CleanRemote,
    PushImages,
    PushCode,
    PublishRelease,
    CleanupReleases,
    LogRevision,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::CleanLocal,
        Step::PullImages,
        Step::CleanRemote,
        Step::PushImages,
        Step::PushCode,
        Step::PublishRelease,
        Step::CleanupReleases,
        Step::LogRevision,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::CleanLocal => "clean_local",
            Step::PullImages => "pull_images",
            Step::CleanRemote => "clean_remote",
            Step::PushImages => "push_images",
            Step::PushCode => "push_code",
            Step::PublishRelease => "publish_release",
            Step::CleanupReleases => "cleanup_releases",
            Step::LogRevision => "log_revision",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Image steps are skipped outright, hooks included, when no image
    /// pairings are configured.
    pub fn is_image_step(self) -> bool {
        matches!(self, Step::PullImages | Step::PushImages)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
