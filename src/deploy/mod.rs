// ABOUTME: Phase and step orchestration for a release.
// ABOUTME: deploy = prepare + deliver, each step wrapped in before/after hooks.

mod executor;
mod phase;

pub use executor::PhaseExecutor;
pub use phase::{Phase, Step};
