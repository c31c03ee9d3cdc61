// ABOUTME: Library root for hoist - exposes the orchestration engine for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod images;
pub mod output;
pub mod release;
pub mod ssh;
pub mod types;
