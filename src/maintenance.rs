//! Drive housekeeping: artifact pruning and manifest backup rotation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::DriveConfig;

/// Errors during maintenance operations.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// Filesystem failure at the given path.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MaintenanceError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn collect_files(root: &Path) -> Result<Vec<PathBuf>, MaintenanceError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| MaintenanceError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| MaintenanceError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Removes files under `artifacts_dir` older than the cutoff, by mtime.
///
/// # Returns
///
/// The number of files removed.
///
/// # Errors
///
/// Returns [`MaintenanceError::Io`] on traversal or deletion failure.
#[instrument(skip(config))]
pub fn prune_artifacts(older_than: Duration, config: &DriveConfig) -> Result<usize, MaintenanceError> {
    let artifacts_dir = config.artifacts_dir();
    if !artifacts_dir.exists() {
        return Ok(0);
    }
    let cutoff = SystemTime::now()
        .checked_sub(older_than)
        .unwrap_or(UNIX_EPOCH);

    let mut removed = 0;
    for path in collect_files(&artifacts_dir)? {
        let metadata = fs::metadata(&path).map_err(|e| MaintenanceError::io(&path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| MaintenanceError::io(&path, e))?;
        if modified < cutoff {
            fs::remove_file(&path).map_err(|e| MaintenanceError::io(&path, e))?;
            debug!(path = %path.display(), "pruned artifact");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Copies each `manifests/*.json` into a timestamped backup and trims each
/// stem's backups to the newest `max_backups`.
///
/// # Returns
///
/// The number of manifests rotated.
///
/// # Errors
///
/// Returns [`MaintenanceError::Io`] on copy, listing, or deletion failure.
#[instrument(skip(config))]
pub fn rotate_manifest_backups(
    max_backups: usize,
    config: &DriveConfig,
) -> Result<usize, MaintenanceError> {
    let manifests_dir = config.manifests_dir();
    if !manifests_dir.exists() {
        return Ok(0);
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut rotated = 0;
    let entries = fs::read_dir(&manifests_dir).map_err(|e| MaintenanceError::io(&manifests_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MaintenanceError::io(&manifests_dir, e))?;
        let manifest = entry.path();
        if manifest.extension().and_then(|ext| ext.to_str()) != Some("json") || !manifest.is_file()
        {
            continue;
        }
        let Some(stem) = manifest.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let backup_dir = manifests_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|e| MaintenanceError::io(&backup_dir, e))?;
        let target = backup_dir.join(format!("{stem}_{timestamp}.json"));
        fs::copy(&manifest, &target).map_err(|e| MaintenanceError::io(&target, e))?;
        rotated += 1;

        // Timestamped names sort lexicographically, oldest first.
        let prefix = format!("{stem}_");
        let mut backups: Vec<PathBuf> = fs::read_dir(&backup_dir)
            .map_err(|e| MaintenanceError::io(&backup_dir, e))?
            .filter_map(std::result::Result::ok)
            .map(|backup| backup.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            })
            .collect();
        backups.sort();
        let excess = backups.len().saturating_sub(max_backups);
        for stale in backups.into_iter().take(excess) {
            fs::remove_file(&stale).map_err(|e| MaintenanceError::io(&stale, e))?;
        }
    }
    Ok(rotated)
}
