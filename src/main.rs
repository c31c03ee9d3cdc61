// ABOUTME: Entry point for the hoist CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to a phase.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use hoist::deploy::Phase;
use hoist::error::Result;
use hoist::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, output.clone()).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let (phase, target) = match cli.command {
        Commands::Deploy(target) => (Phase::Deploy, target),
        Commands::OnlyPrepare(target) => (Phase::Prepare, target),
        Commands::OnlyDeliver(target) => (Phase::Deliver, target),
    };

    commands::run_phase(
        phase,
        &project_dir,
        &target.stage,
        &target.version,
        cli.password,
        output,
    )
    .await
}
