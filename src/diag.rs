//! Diagnostics bundle export.
//!
//! Produces a zip archive containing a single `diagnostics.json` with the
//! current Drive root, the full queue listing, and the current templates.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{info, instrument};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::DriveConfig;
use crate::queue::{JobStore, QueueError};
use crate::templates::{TemplateError, load_templates};

/// Name of the JSON report inside the bundle.
const REPORT_NAME: &str = "diagnostics.json";

/// Errors exporting a diagnostics bundle.
#[derive(Debug, Error)]
pub enum DiagError {
    /// Filesystem failure writing the archive.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The archive path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Archive construction failed.
    #[error("failed to build diagnostics archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Queue listing failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Template listing failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn default_bundle_path() -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("easel_diag_{timestamp}.zip"))
}

/// Exports a diagnostics bundle and returns its path.
///
/// When `output` is not given, the bundle lands in the system temp
/// directory under a timestamped name.
///
/// # Errors
///
/// Returns [`DiagError`] when the queue or template listing fails or the
/// archive cannot be written.
#[instrument(skip(config, store, output))]
pub async fn export_diagnostics_bundle(
    config: &DriveConfig,
    store: &(impl JobStore + Sync),
    output: Option<&Path>,
) -> Result<PathBuf, DiagError> {
    let listing: Vec<serde_json::Value> = store
        .list_items(None)
        .await?
        .iter()
        .map(crate::queue::JobRecord::to_json)
        .collect();
    let templates = load_templates(config).await?;

    let report = serde_json::json!({
        "drive_root": config.drive_root.display().to_string(),
        "queue": listing,
        "templates": templates,
    });
    let rendered = serde_json::to_vec_pretty(&report).map_err(|e| DiagError::Io {
        path: PathBuf::from(REPORT_NAME),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let archive_path = output.map_or_else(default_bundle_path, Path::to_path_buf);
    if let Some(parent) = archive_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| DiagError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = std::fs::File::create(&archive_path).map_err(|e| DiagError::Io {
        path: archive_path.clone(),
        source: e,
    })?;
    let mut archive = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    archive.start_file(REPORT_NAME, options)?;
    archive.write_all(&rendered).map_err(|e| DiagError::Io {
        path: archive_path.clone(),
        source: e,
    })?;
    archive.finish()?;

    info!(path = %archive_path.display(), "diagnostics bundle written");
    Ok(archive_path)
}
