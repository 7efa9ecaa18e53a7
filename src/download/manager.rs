//! Sequential download manager over the Drive layout.
//!
//! Holds an ordered run list of pending items and drains them strictly one
//! at a time, resolving each destination under the configured Drive root.
//! The first failure aborts the remainder of the run.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, instrument};

use super::client::{DownloadOutcome, HttpClient, ProgressUpdate, UrlPreview, compute_sha256};
use super::error::DownloadError;
use super::manifest::{DownloadItem, Manifest};
use crate::config::DriveConfig;

/// Shared progress callback invoked once per received chunk.
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Digest of an existing file on disk.
#[derive(Debug, Clone)]
pub struct FileDigest {
    /// The verified path.
    pub path: PathBuf,
    /// SHA-256 hex digest of its bytes.
    pub sha256: String,
}

/// Summary of a completed manager run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Outcomes in run order.
    pub completed: Vec<DownloadOutcome>,
}

/// Drains an ordered list of download items strictly sequentially.
///
/// There is no parallelism and no cancellation primitive: a running drain
/// completes, fails, or is terminated with the process.
pub struct DownloadManager {
    config: DriveConfig,
    client: HttpClient,
    items: VecDeque<DownloadItem>,
    progress: Option<ProgressCallback>,
}

impl DownloadManager {
    /// Creates a manager over the given Drive layout with a default client.
    #[must_use]
    pub fn new(config: DriveConfig) -> Self {
        Self::with_client(config, HttpClient::new())
    }

    /// Creates a manager with an explicit HTTP client.
    #[must_use]
    pub fn with_client(config: DriveConfig, client: HttpClient) -> Self {
        Self {
            config,
            client,
            items: VecDeque::new(),
            progress: None,
        }
    }

    /// Installs a progress callback shared by all transfers in a run.
    pub fn set_progress(&mut self, callback: impl Fn(&ProgressUpdate) + Send + Sync + 'static) {
        self.progress = Some(Arc::new(callback));
    }

    /// Appends an item to the run list.
    pub fn add_item(&mut self, item: DownloadItem) {
        self.items.push_back(item);
    }

    /// Appends every item of a manifest, preserving order.
    pub fn add_manifest(&mut self, manifest: Manifest) {
        for item in manifest.items {
            self.add_item(item);
        }
    }

    /// Number of items waiting in the run list.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.items.len()
    }

    /// Drains the run list strictly sequentially.
    ///
    /// Destinations are resolved relative to the Drive root. The first
    /// failing item aborts the remainder and propagates its error; items
    /// already transferred stay on disk.
    ///
    /// # Errors
    ///
    /// Returns the first [`DownloadError`] encountered.
    #[instrument(skip(self), fields(items = self.items.len()))]
    pub async fn run(&mut self) -> Result<RunReport, DownloadError> {
        let mut report = RunReport::default();
        while let Some(item) = self.items.pop_front() {
            let dest = self.config.drive_root.join(&item.destination);
            info!(url = %item.url, dest = %dest.display(), "starting transfer");
            let outcome = self
                .client
                .stream_file(
                    &item.url,
                    &dest,
                    item.headers.as_ref(),
                    item.sha256.as_deref(),
                    self.progress.as_deref(),
                )
                .await?;
            report.completed.push(outcome);
        }
        Ok(report)
    }

    /// Launches the drain on a background task and returns its handle.
    ///
    /// The manager is moved into the task; await the handle for the final
    /// report. No cancellation primitive is exposed.
    #[must_use]
    pub fn run_async(mut self) -> JoinHandle<Result<RunReport, DownloadError>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Probes a URL without downloading its body.
    pub async fn preview(&self, url: &str) -> UrlPreview {
        self.client.preview(url, None).await
    }

    /// Computes the SHA-256 digest of an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the file cannot be read.
    pub async fn verify(&self, path: &Path) -> Result<FileDigest, DownloadError> {
        let sha256 = compute_sha256(path).await?;
        Ok(FileDigest {
            path: path.to_path_buf(),
            sha256,
        })
    }
}
