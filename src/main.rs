//! CLI entry point for the easel tool.

use anyhow::Result;
use clap::Parser;
use easel_core::DriveConfig;
use tracing::debug;

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = DriveConfig::load()?;

    match args.command {
        Command::ComposeRun {
            prompt,
            model,
            steps,
        } => commands::run_compose_command(&config, prompt, model, steps).await,
        Command::QueueStatus { status } => {
            commands::run_queue_status_command(&config, status).await
        }
        Command::ManifestCheck { path } => commands::run_manifest_check_command(&path).await,
        Command::DownloadManifest { path } => {
            commands::run_download_manifest_command(&config, &path).await
        }
        Command::Diag { output } => commands::run_diag_command(&config, output).await,
    }
}
