//! HTTP download engine for streaming model assets to the Drive.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for multi-gigabyte checkpoints)
//! - Range-based resume gated on a remote validator check
//! - SHA-256 post-verification with cleanup on mismatch
//! - Strictly sequential batch runs driven by JSON manifests
//!
//! # Example
//!
//! ```no_run
//! use easel_core::download::{DownloadItem, DownloadManager};
//! use easel_core::DriveConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manager = DownloadManager::new(DriveConfig::load()?);
//! manager.add_item(DownloadItem::new(
//!     "https://example.com/unet.safetensors",
//!     "models/unet.safetensors",
//! ));
//! let report = manager.run().await?;
//! println!("fetched {} items", report.completed.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod manager;
mod manifest;

pub use client::{
    DownloadOutcome, HttpClient, ProgressUpdate, UrlPreview, compute_sha256, normalize_server_hash,
    part_meta_path, part_path,
};
pub use error::DownloadError;
pub use manager::{DownloadManager, FileDigest, ProgressCallback, RunReport};
pub use manifest::{DownloadItem, Manifest, ManifestError};
