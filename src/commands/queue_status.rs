//! Handler for the `queue-status` subcommand.

use anyhow::Result;

use easel_core::queue::{JobStatus, Queue};
use easel_core::{Database, DriveConfig};

/// Prints the (optionally filtered) queue listing as pretty JSON.
pub async fn run_queue_status_command(
    config: &DriveConfig,
    status: Option<JobStatus>,
) -> Result<()> {
    let db = Database::new(&config.queue_db_path()).await?;
    let queue = Queue::new(db);

    let rows: Vec<serde_json::Value> = queue
        .list_items(status)
        .await?
        .iter()
        .map(easel_core::queue::JobRecord::to_json)
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
