//! Handler for the `diag` subcommand.

use std::path::PathBuf;

use anyhow::Result;

use easel_core::diag::export_diagnostics_bundle;
use easel_core::queue::Queue;
use easel_core::{Database, DriveConfig};

/// Writes a diagnostics bundle and prints its path.
pub async fn run_diag_command(config: &DriveConfig, output: Option<PathBuf>) -> Result<()> {
    let db = Database::new(&config.queue_db_path()).await?;
    let queue = Queue::new(db);

    let path = export_diagnostics_bundle(config, &queue, output.as_deref()).await?;
    println!("Diagnostics bundle written to {}", path.display());
    Ok(())
}
