//! HTTP client wrapper for resumable streaming downloads.
//!
//! Transfers stream into a sibling `.part` file and finish with an atomic
//! rename over the destination, followed by a SHA-256 post-check. A partial
//! file is only resumed when a sidecar validator captured at the start of
//! the transfer still matches the remote; otherwise the transfer restarts
//! from zero.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, HeaderName, HeaderValue, RANGE};
use reqwest::{Client, ClientBuilder, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, instrument};
use url::Url;

use super::error::DownloadError;

/// Default HTTP connect timeout (30 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large model files).
const READ_TIMEOUT_SECS: u64 = 300;

/// Read chunk size for checksum computation (1 MiB).
const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Suffix of the temporary sibling file a transfer streams into.
const PART_SUFFIX: &str = ".part";

/// Suffix of the sidecar validator file written alongside a partial.
const PART_META_SUFFIX: &str = ".part.meta";

/// Result of a lightweight URL existence probe.
///
/// Probes never fail: transport errors are captured in [`error`](Self::error)
/// instead of being raised to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct UrlPreview {
    /// HTTP status of the probe, when a response was received.
    pub status: Option<u16>,
    /// URL after following redirects.
    pub final_url: String,
    /// Remote size in bytes, when advertised.
    pub content_length: Option<u64>,
    /// Remote content type, when advertised.
    pub content_type: Option<String>,
    /// Transport failure text, when the probe could not reach the remote.
    pub error: Option<String>,
}

/// Cumulative transfer progress, reported once per received chunk.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    /// Bytes written so far, including any resumed prefix.
    pub downloaded_bytes: u64,
    /// Expected total bytes; `None` when the remote size is unknown.
    pub total_bytes: Option<u64>,
    /// Completed fraction; `None` when the remote size is unknown.
    pub fraction: Option<f64>,
}

/// Metadata describing a completed transfer.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Final destination path.
    pub path: PathBuf,
    /// SHA-256 hex digest of the final bytes.
    pub sha256: String,
    /// Normalized content validator advertised by the server, if any.
    pub server_hash: Option<String>,
    /// Whether an HTTP range resume was used.
    pub resumed: bool,
}

/// Sidecar validator persisted next to a partial download.
///
/// Captured when a fresh transfer starts; a later resume is only trusted
/// when a HEAD probe of the remote still reports the same validator.
#[derive(Debug, Serialize, Deserialize)]
struct PartValidator {
    validator: Option<String>,
    total_bytes: Option<u64>,
}

/// Returns the temporary sibling path a transfer streams into.
#[must_use]
pub fn part_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_os_string();
    os.push(PART_SUFFIX);
    PathBuf::from(os)
}

/// Returns the sidecar validator path for a destination.
#[must_use]
pub fn part_meta_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_os_string();
    os.push(PART_META_SUFFIX);
    PathBuf::from(os)
}

/// Normalizes a server-advertised content validator from response headers.
///
/// Prefers an unquoted `ETag`; for `x-goog-hash` the `md5=` component wins
/// over others, falling back to the first component; `content-md5` is the
/// last resort.
#[must_use]
pub fn normalize_server_hash(headers: &HeaderMap) -> Option<String> {
    if let Some(etag) = headers.get(ETAG).and_then(|v| v.to_str().ok()) {
        return Some(etag.trim_matches('"').to_string());
    }
    if let Some(goog) = headers.get("x-goog-hash").and_then(|v| v.to_str().ok()) {
        let parts: Vec<&str> = goog.split(',').map(str::trim).collect();
        for part in &parts {
            if let Some(md5) = part.strip_prefix("md5=") {
                return Some(md5.to_string());
            }
        }
        return parts.first().map(|part| (*part).to_string());
    }
    headers
        .get("content-md5")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Computes the SHA-256 hex digest of a file, reading in 1 MiB chunks.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if the file cannot be read.
pub async fn compute_sha256(path: &Path) -> Result<String, DownloadError> {
    let mut file = File::open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .read_timeout(Duration::from_secs(read_timeout_secs))
        .build()
}

fn build_header_map(headers: Option<&BTreeMap<String, String>>) -> Result<HeaderMap, DownloadError> {
    let mut map = HeaderMap::new();
    if let Some(headers) = headers {
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DownloadError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| DownloadError::InvalidHeader { name: name.clone() })?;
            map.insert(header_name, header_value);
        }
    }
    Ok(map)
}

fn map_send_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

fn content_length_of(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// HTTP client for streaming downloads with resume support.
///
/// Designed to be created once and reused for multiple transfers, taking
/// advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Probes a URL without downloading its body.
    ///
    /// Issues a HEAD request following redirects; when the HEAD response
    /// lacks a length or reports an error status, falls back to a streaming
    /// GET probe. Transport failures are captured into the result rather
    /// than returned as errors.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn preview(
        &self,
        url: &str,
        headers: Option<&BTreeMap<String, String>>,
    ) -> UrlPreview {
        match self.probe(url, headers).await {
            Ok(preview) => preview,
            Err(error) => UrlPreview {
                status: None,
                final_url: url.to_string(),
                content_length: None,
                content_type: None,
                error: Some(error.to_string()),
            },
        }
    }

    async fn probe(
        &self,
        url: &str,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<UrlPreview, DownloadError> {
        let header_map = build_header_map(headers)?;
        let head = self
            .client
            .head(url)
            .headers(header_map.clone())
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let response = if head.status().as_u16() >= 400 || content_length_of(&head).is_none() {
            self.client
                .get(url)
                .headers(header_map)
                .send()
                .await
                .map_err(|e| map_send_error(url, e))?
        } else {
            head
        };

        Ok(UrlPreview {
            status: Some(response.status().as_u16()),
            final_url: response.url().to_string(),
            content_length: content_length_of(&response),
            content_type: response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            error: None,
        })
    }

    /// Streams a URL to the destination path.
    ///
    /// The transfer writes into a sibling `.part` file; an existing partial
    /// is resumed with a byte-range request only when its sidecar validator
    /// matches a fresh probe of the remote, and is otherwise discarded. On
    /// completion the temporary file is atomically renamed over the
    /// destination and a SHA-256 digest is computed over the final bytes.
    /// A supplied expected checksum that does not match deletes the
    /// destination and fails the call.
    ///
    /// Progress is reported synchronously, once per received chunk, with
    /// cumulative counts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the URL is invalid, the request fails,
    /// the server returns an error status, writing to disk fails, or the
    /// checksum post-check does not match.
    #[allow(clippy::cast_precision_loss)]
    #[instrument(skip(self, headers, expected_sha256, progress), fields(url = %url, dest = %dest.display()))]
    pub async fn stream_file(
        &self,
        url: &str,
        dest: &Path,
        headers: Option<&BTreeMap<String, String>>,
        expected_sha256: Option<&str>,
        progress: Option<&(dyn Fn(&ProgressUpdate) + Send + Sync)>,
    ) -> Result<DownloadOutcome, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let part = part_path(dest);
        let meta = part_meta_path(dest);
        let base_headers = build_header_map(headers)?;

        let resume_from = self
            .validated_resume_offset(url, &part, &meta, &base_headers)
            .await;

        let mut request = self.client.get(url).headers(base_headers);
        if resume_from > 0 {
            request = request.header(RANGE, format!("bytes={resume_from}-"));
        }
        let response = request.send().await.map_err(|e| map_send_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        // The server may ignore the Range header and reply 200 with the
        // full body; in that case the partial prefix is overwritten.
        let resumed = resume_from > 0 && status.as_u16() == 206;
        let offset = if resumed { resume_from } else { 0 };

        let body_length = content_length_of(&response);
        let total_bytes = body_length.map(|len| len.saturating_add(offset));
        let server_hash = normalize_server_hash(response.headers());

        if !resumed {
            let validator = PartValidator {
                validator: server_hash.clone(),
                total_bytes,
            };
            let rendered = serde_json::to_vec(&validator).map_err(|e| {
                DownloadError::io(
                    &meta,
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                )
            })?;
            fs::write(&meta, rendered)
                .await
                .map_err(|e| DownloadError::io(&meta, e))?;
        }

        let mut file = if resumed {
            OpenOptions::new()
                .append(true)
                .open(&part)
                .await
                .map_err(|e| DownloadError::io(&part, e))?
        } else {
            File::create(&part)
                .await
                .map_err(|e| DownloadError::io(&part, e))?
        };

        let mut downloaded = offset;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_send_error(url, e))?;
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(&part, e))?;
            downloaded += chunk.len() as u64;
            if let Some(report) = progress {
                report(&ProgressUpdate {
                    downloaded_bytes: downloaded,
                    total_bytes,
                    fraction: total_bytes.map(|total| {
                        if total == 0 {
                            1.0
                        } else {
                            downloaded as f64 / total as f64
                        }
                    }),
                });
            }
        }
        file.flush()
            .await
            .map_err(|e| DownloadError::io(&part, e))?;
        drop(file);

        fs::rename(&part, dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let _ = fs::remove_file(&meta).await;

        let sha256 = compute_sha256(dest).await?;
        if let Some(expected) = expected_sha256
            && !expected.eq_ignore_ascii_case(&sha256)
        {
            let _ = fs::remove_file(dest).await;
            return Err(DownloadError::checksum_mismatch(dest, expected, sha256));
        }

        info!(
            path = %dest.display(),
            bytes = downloaded,
            resumed,
            "download complete"
        );

        Ok(DownloadOutcome {
            path: dest.to_path_buf(),
            sha256,
            server_hash,
            resumed,
        })
    }

    /// Returns the byte offset to resume from, or 0 for a fresh transfer.
    ///
    /// A partial is trusted only when its sidecar validator matches a fresh
    /// HEAD probe of the remote and the server advertises byte ranges; an
    /// untrusted partial is deleted along with its sidecar.
    async fn validated_resume_offset(
        &self,
        url: &str,
        part: &Path,
        meta: &Path,
        headers: &HeaderMap,
    ) -> u64 {
        let Ok(part_len) = fs::metadata(part).await.map(|m| m.len()) else {
            return 0;
        };

        let stored: Option<PartValidator> = match fs::read(meta).await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(_) => None,
        };

        let trusted = if part_len > 0
            && let Some(stored) = stored
            && stored.validator.is_some()
        {
            match self.client.head(url).headers(headers.clone()).send().await {
                Ok(head) => {
                    let supports_ranges = head
                        .headers()
                        .get(ACCEPT_RANGES)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.eq_ignore_ascii_case("bytes"));
                    let current = normalize_server_hash(head.headers());
                    let within = stored.total_bytes.is_none_or(|total| part_len < total);
                    supports_ranges && current == stored.validator && within
                }
                Err(_) => false,
            }
        } else {
            false
        };

        if trusted {
            debug!(bytes = part_len, "resuming validated partial download");
            part_len
        } else {
            debug!("discarding unvalidated partial download");
            let _ = fs::remove_file(part).await;
            let _ = fs::remove_file(meta).await;
            0
        }
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// This can be used for advanced operations not covered by this wrapper.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_normalize_server_hash_unquotes_etag() {
        let headers = header_map(&[("etag", "\"abc123\"")]);
        assert_eq!(normalize_server_hash(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_normalize_server_hash_goog_hash_prefers_md5() {
        let headers = header_map(&[("x-goog-hash", "crc32c=12345, md5=deadbeef")]);
        assert_eq!(
            normalize_server_hash(&headers),
            Some("deadbeef".to_string())
        );
    }

    #[test]
    fn test_normalize_server_hash_goog_hash_without_md5_takes_first() {
        let headers = header_map(&[("x-goog-hash", "crc32c=12345")]);
        assert_eq!(
            normalize_server_hash(&headers),
            Some("crc32c=12345".to_string())
        );
    }

    #[test]
    fn test_normalize_server_hash_falls_back_to_content_md5() {
        let headers = header_map(&[("content-md5", "cafef00d")]);
        assert_eq!(normalize_server_hash(&headers), Some("cafef00d".to_string()));
    }

    #[test]
    fn test_normalize_server_hash_empty_headers() {
        assert_eq!(normalize_server_hash(&HeaderMap::new()), None);
    }

    #[test]
    fn test_part_paths_append_suffixes() {
        let dest = Path::new("/drive/models/unet.safetensors");
        assert_eq!(
            part_path(dest),
            PathBuf::from("/drive/models/unet.safetensors.part")
        );
        assert_eq!(
            part_meta_path(dest),
            PathBuf::from("/drive/models/unet.safetensors.part.meta")
        );
    }

    #[tokio::test]
    async fn test_compute_sha256_known_digest() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("f.bin");
        tokio::fs::write(&path, b"hello").await.unwrap();
        assert_eq!(
            compute_sha256(&path).await.unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_build_header_map_rejects_invalid_name() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "value".to_string());
        let result = build_header_map(Some(&headers));
        assert!(matches!(
            result,
            Err(DownloadError::InvalidHeader { .. })
        ));
    }
}
