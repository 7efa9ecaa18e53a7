//! Handlers for the `manifest-check` and `download-manifest` subcommands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use easel_core::DriveConfig;
use easel_core::download::{DownloadManager, Manifest};

/// Validates that every manifest entry carries `url` and `destination`.
///
/// Fails listing the offending indices, which surfaces as a non-zero exit.
pub async fn run_manifest_check_command(path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("manifest {} is not valid JSON", path.display()))?;

    let missing = Manifest::missing_required(&value);
    if !missing.is_empty() {
        bail!("Manifest validation failed; missing keys in rows: {missing:?}");
    }

    let count = value
        .get("items")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len);
    println!("Manifest {} OK ({count} items)", path.display());
    Ok(())
}

/// Drives the download manager over every manifest entry.
///
/// Transfers run strictly sequentially; the first failure aborts the rest.
pub async fn run_download_manifest_command(config: &DriveConfig, path: &Path) -> Result<()> {
    let manifest = Manifest::from_json(path).await?;
    let total_items = manifest.items.len();

    let mut manager = DownloadManager::new(config.clone());
    manager.add_manifest(manifest);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        )?
        .progress_chars("#>-"),
    );
    let progress_bar = bar.clone();
    manager.set_progress(move |update| {
        if let Some(total) = update.total_bytes {
            progress_bar.set_length(total);
        }
        progress_bar.set_position(update.downloaded_bytes);
    });

    let report = manager.run().await?;
    bar.finish_and_clear();

    info!(
        completed = report.completed.len(),
        total = total_items,
        "manifest download complete"
    );
    println!("Downloaded {} of {total_items} items", report.completed.len());
    Ok(())
}
