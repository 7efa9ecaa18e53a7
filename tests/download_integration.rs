//! Integration tests for the download module against a mock HTTP server.

use easel_core::download::{
    DownloadError, DownloadItem, DownloadManager, HttpClient, part_meta_path, part_path,
};
use easel_core::DriveConfig;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// SHA-256 of the ASCII bytes "hello world".
const HELLO_WORLD_SHA256: &str =
    "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

async fn setup() -> (MockServer, TempDir, HttpClient) {
    let server = MockServer::start().await;
    let temp = TempDir::new().expect("Failed to create temp dir");
    (server, temp, HttpClient::new())
}

// ==================== Fresh Downloads ====================

#[tokio::test]
async fn test_stream_file_downloads_and_verifies_checksum() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("hello world"))
        .mount(&server)
        .await;

    let dest = temp.path().join("model.bin");
    let outcome = client
        .stream_file(
            &format!("{}/model.bin", server.uri()),
            &dest,
            None,
            Some(HELLO_WORLD_SHA256),
            None,
        )
        .await
        .expect("download should succeed");

    assert_eq!(outcome.sha256, HELLO_WORLD_SHA256);
    assert!(!outcome.resumed);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello world");
    // Temp artifacts are gone after completion.
    assert!(!part_path(&dest).exists());
    assert!(!part_meta_path(&dest).exists());
}

#[tokio::test]
async fn test_stream_file_checksum_mismatch_deletes_destination() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("hello world"))
        .mount(&server)
        .await;

    let dest = temp.path().join("model.bin");
    let result = client
        .stream_file(
            &format!("{}/model.bin", server.uri()),
            &dest,
            None,
            Some("0000000000000000000000000000000000000000000000000000000000000000"),
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(DownloadError::ChecksumMismatch { .. })
    ));
    assert!(!dest.exists(), "corrupt output must be deleted");
}

#[tokio::test]
async fn test_stream_file_http_error_status() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dest = temp.path().join("missing.bin");
    let result = client
        .stream_file(
            &format!("{}/missing.bin", server.uri()),
            &dest,
            None,
            None,
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(DownloadError::HttpStatus { status: 404, .. })
    ));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_stream_file_invalid_url() {
    let (_server, temp, client) = setup().await;

    let result = client
        .stream_file("not a url", &temp.path().join("f.bin"), None, None, None)
        .await;

    assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
}

#[tokio::test]
async fn test_stream_file_reports_progress_per_chunk() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("hello world"))
        .mount(&server)
        .await;

    let updates = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&updates);
    let dest = temp.path().join("model.bin");
    client
        .stream_file(
            &format!("{}/model.bin", server.uri()),
            &dest,
            None,
            None,
            Some(&move |update: &easel_core::download::ProgressUpdate| {
                sink.lock().unwrap().push((update.downloaded_bytes, update.total_bytes));
            }),
        )
        .await
        .unwrap();

    let updates = updates.lock().unwrap();
    assert!(!updates.is_empty());
    let (downloaded, total) = *updates.last().unwrap();
    assert_eq!(downloaded, 11);
    assert_eq!(total, Some(11));
}

// ==================== Resume ====================

#[tokio::test]
async fn test_resume_with_matching_validator_yields_identical_file() {
    let (server, temp, client) = setup().await;

    Mock::given(method("HEAD"))
        .and(path("/model.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-length", "11"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .and(header("range", "bytes=5-"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("etag", "\"v1\"")
                .set_body_bytes(" world"),
        )
        .mount(&server)
        .await;

    let dest = temp.path().join("model.bin");
    tokio::fs::write(part_path(&dest), "hello").await.unwrap();
    tokio::fs::write(
        part_meta_path(&dest),
        r#"{"validator":"v1","total_bytes":11}"#,
    )
    .await
    .unwrap();

    let outcome = client
        .stream_file(
            &format!("{}/model.bin", server.uri()),
            &dest,
            None,
            Some(HELLO_WORLD_SHA256),
            None,
        )
        .await
        .expect("resumed download should succeed");

    assert!(outcome.resumed);
    assert_eq!(outcome.sha256, HELLO_WORLD_SHA256);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello world");
}

#[tokio::test]
async fn test_resume_with_changed_validator_restarts_fresh() {
    let (server, temp, client) = setup().await;

    // Remote content was replaced since the partial began: the stored
    // validator no longer matches, so the partial must be discarded.
    Mock::given(method("HEAD"))
        .and(path("/model.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v2\"")
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-length", "11"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("hello world"))
        .mount(&server)
        .await;

    let dest = temp.path().join("model.bin");
    tokio::fs::write(part_path(&dest), "stale").await.unwrap();
    tokio::fs::write(
        part_meta_path(&dest),
        r#"{"validator":"v1","total_bytes":11}"#,
    )
    .await
    .unwrap();

    let outcome = client
        .stream_file(
            &format!("{}/model.bin", server.uri()),
            &dest,
            None,
            Some(HELLO_WORLD_SHA256),
            None,
        )
        .await
        .expect("fresh restart should succeed");

    assert!(!outcome.resumed);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello world");
}

#[tokio::test]
async fn test_partial_without_sidecar_is_not_trusted() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("hello world"))
        .mount(&server)
        .await;

    let dest = temp.path().join("model.bin");
    tokio::fs::write(part_path(&dest), "hello").await.unwrap();

    let outcome = client
        .stream_file(
            &format!("{}/model.bin", server.uri()),
            &dest,
            None,
            None,
            None,
        )
        .await
        .unwrap();

    assert!(!outcome.resumed);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello world");
}

// ==================== Preview ====================

#[tokio::test]
async fn test_preview_uses_head_when_length_present() {
    let (server, _temp, client) = setup().await;

    Mock::given(method("HEAD"))
        .and(path("/model.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "12345")
                .insert_header("content-type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let preview = client
        .preview(&format!("{}/model.bin", server.uri()), None)
        .await;

    assert_eq!(preview.status, Some(200));
    assert_eq!(preview.content_length, Some(12345));
    assert_eq!(
        preview.content_type.as_deref(),
        Some("application/octet-stream")
    );
    assert!(preview.error.is_none());
}

#[tokio::test]
async fn test_preview_falls_back_to_get_probe() {
    let (server, _temp, client) = setup().await;

    Mock::given(method("HEAD"))
        .and(path("/model.bin"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/model.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes("hello world"),
        )
        .mount(&server)
        .await;

    let preview = client
        .preview(&format!("{}/model.bin", server.uri()), None)
        .await;

    assert_eq!(preview.status, Some(200));
    assert_eq!(preview.content_length, Some(11));
    assert!(preview.error.is_none());
}

#[tokio::test]
async fn test_preview_captures_transport_failure() {
    let (_server, _temp, client) = setup().await;

    let preview = client.preview("http://127.0.0.1:1/unreachable", None).await;

    assert_eq!(preview.status, None);
    assert!(preview.error.is_some());
}

// ==================== Manager Runs ====================

#[tokio::test]
async fn test_manager_run_drains_items_in_order() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/a.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("aaa"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("bbb"))
        .mount(&server)
        .await;

    let config = DriveConfig::new(temp.path());
    let mut manager = DownloadManager::with_client(config, client);
    manager.add_item(DownloadItem::new(
        format!("{}/a.bin", server.uri()),
        "models/a.bin",
    ));
    manager.add_item(DownloadItem::new(
        format!("{}/b.bin", server.uri()),
        "models/b.bin",
    ));

    let report = manager.run().await.expect("run should succeed");
    assert_eq!(report.completed.len(), 2);
    assert_eq!(manager.pending(), 0);
    assert_eq!(
        tokio::fs::read(temp.path().join("models/a.bin")).await.unwrap(),
        b"aaa"
    );
    assert_eq!(
        tokio::fs::read(temp.path().join("models/b.bin")).await.unwrap(),
        b"bbb"
    );
}

#[tokio::test]
async fn test_manager_first_failure_aborts_remainder() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/broken.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/never.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("unreached"))
        .mount(&server)
        .await;

    let config = DriveConfig::new(temp.path());
    let mut manager = DownloadManager::with_client(config, client);
    manager.add_item(DownloadItem::new(
        format!("{}/broken.bin", server.uri()),
        "models/broken.bin",
    ));
    manager.add_item(DownloadItem::new(
        format!("{}/never.bin", server.uri()),
        "models/never.bin",
    ));

    let result = manager.run().await;
    assert!(matches!(
        result,
        Err(DownloadError::HttpStatus { status: 500, .. })
    ));
    assert!(
        !temp.path().join("models/never.bin").exists(),
        "items after the failure must not run"
    );
}

#[tokio::test]
async fn test_manager_run_async_returns_joinable_handle() {
    let (server, temp, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/a.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("aaa"))
        .mount(&server)
        .await;

    let config = DriveConfig::new(temp.path());
    let mut manager = DownloadManager::with_client(config, client);
    manager.add_item(DownloadItem::new(
        format!("{}/a.bin", server.uri()),
        "models/a.bin",
    ));

    let handle = manager.run_async();
    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.completed.len(), 1);
}
