// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: deploy, only:prepare and only:deliver, each taking a stage and version.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Release deployment to SSH hosts, with container image sync")]
#[command(version, disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory holding hoist.yml and stages/
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Password for SSH sessions; key or agent authentication otherwise
    #[arg(long, env = "HOIST_SSH_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prepare artifacts, then deliver and publish a release
    Deploy(Target),

    /// Clean the local staging tree and pull images
    #[command(name = "only:prepare")]
    OnlyPrepare(Target),

    /// Push images and code, publish, clean up and record the release
    #[command(name = "only:deliver")]
    OnlyDeliver(Target),
}

#[derive(Args)]
pub struct Target {
    /// Stage to deploy to (stages/<stage>.yml)
    pub stage: String,

    /// Version label recorded in revisions.log
    pub version: String,
}
