// ABOUTME: Release identity and lifecycle on the servers.
// ABOUTME: RunContext fixes the paths for a run; ReleaseManager acts on them.

mod context;
mod manager;

pub use context::{RunContext, actor};
pub use manager::{
    CleanupPlan, CleanupReport, ReleaseError, ReleaseManager, plan_cleanup, revision_line,
};
