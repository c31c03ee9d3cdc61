// ABOUTME: Command handlers for the hoist CLI.
// ABOUTME: Each subcommand runs one phase through the same pipeline.

mod phase;

pub use phase::run_phase;
