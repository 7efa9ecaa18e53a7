//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use easel_core::queue::JobStatus;

/// Orchestrate a Drive-backed image/voice generation playground.
///
/// Easel composes flow JSON documents, tracks generation jobs in a
/// persistent queue, and fetches model assets from download manifests.
#[derive(Parser, Debug)]
#[command(name = "easel")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the easel CLI.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a flow JSON document and persist it to the Drive
    ComposeRun {
        /// Prompt text embedded verbatim
        #[arg(short, long, default_value = "A test prompt")]
        prompt: String,

        /// Model key recorded in the flow metadata
        #[arg(short, long)]
        model: Option<String>,

        /// Sampler step count
        #[arg(long, default_value_t = 20)]
        steps: u32,
    },

    /// Print a summary of the queue state
    QueueStatus {
        /// Only list jobs with this status
        #[arg(long, value_parser = parse_status)]
        status: Option<JobStatus>,
    },

    /// Validate a manifest JSON file
    ManifestCheck {
        /// Path of the manifest file
        path: PathBuf,
    },

    /// Download all items in a manifest
    DownloadManifest {
        /// Path of the manifest file
        path: PathBuf,
    },

    /// Generate a diagnostics bundle
    Diag {
        /// Write the bundle to this path instead of the temp directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    raw.parse()
}
