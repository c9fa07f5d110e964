//! Integration tests for the downloader
//!
//! These tests use wiremock to stand in for both the AJAX API and the image
//! host, and run whole user/artwork downloads against a temporary directory.

use pixiv_dl::config::parse_config;
use pixiv_dl::ledger::Outcome;
use pixiv_dl::{download_artwork, run, RunContext};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Knobs the scenarios vary
struct TestSettings {
    status_retries: u32,
    max_attempts: u32,
    failure_attribution: &'static str,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            status_retries: 1,
            max_attempts: 3,
            failure_attribution: "requested",
        }
    }
}

/// Temporary download root and error file of one test
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("downloads")
    }

    fn error_file(&self) -> std::path::PathBuf {
        self.dir.path().join("error.json")
    }

    fn read_errors(&self) -> Value {
        let content = std::fs::read_to_string(self.error_file()).expect("error file missing");
        serde_json::from_str(&content).expect("error file is not JSON")
    }
}

/// Builds a run context pointed at the mock server, with a fast limiter
fn create_context(server: &MockServer, workspace: &Workspace, settings: TestSettings) -> Arc<RunContext> {
    let config = parse_config(&format!(
        r#"
[auth]
phpsessid = "test-session"

[download]
path = '{root}'
artwork-threads = 2
img-threads = 3
max-attempts = {max_attempts}
failure-attribution = "{attribution}"

[network]
base-url = "{base}"
referer = "{base}/"
min-requests-per-second = 1000.0
max-requests-per-second = 1000.0
status-retries = {status_retries}
backoff-base-ms = 10
rate-limited-fallback-ms = 10

[output]
error-file = '{error_file}'
"#,
        root = workspace.root().display(),
        max_attempts = settings.max_attempts,
        attribution = settings.failure_attribution,
        base = server.uri(),
        status_retries = settings.status_retries,
        error_file = workspace.error_file().display(),
    ))
    .expect("Failed to parse test config");

    Arc::new(RunContext::from_config(&config, workspace.root()).expect("Failed to build context"))
}

fn envelope(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "error": false,
        "message": "",
        "body": body,
    }))
}

async fn mount_artwork(server: &MockServer, artwork_id: &str, user_id: &str, user_name: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ajax/illust/{}", artwork_id)))
        .respond_with(envelope(json!({
            "userId": user_id,
            "userName": user_name,
            "illustTitle": title,
        })))
        .mount(server)
        .await;
}

async fn mount_pages(server: &MockServer, artwork_id: &str, urls: &[String]) {
    let pages: Vec<Value> = urls
        .iter()
        .map(|url| json!({ "urls": { "original": url } }))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/ajax/illust/{}/pages", artwork_id)))
        .respond_with(envelope(Value::Array(pages)))
        .mount(server)
        .await;
}

/// Serves `image_path` exactly `times` times
async fn mount_image(server: &MockServer, image_path: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(image_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-bytes".to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts user 42 (alice) owning artworks 100 ("Sky", two PNG pages) and
/// 101 (metadata lookup fails)
async fn mount_alice(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ajax/user/42/profile/all"))
        .respond_with(envelope(json!({
            "illusts": { "100": null, "101": null },
            "manga": [],
        })))
        .mount(server)
        .await;

    mount_artwork(server, "100", "42", "alice", "Sky").await;
    let base = server.uri();
    mount_pages(
        server,
        "100",
        &[
            format!("{}/img/100_p0.png", base),
            format!("{}/img/100_p1.png", base),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/ajax/illust/101"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn assert_file(path: &Path) {
    assert!(path.is_file(), "expected file {}", path.display());
}

#[tokio::test]
async fn test_user_download_end_to_end() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_alice(&server).await;
    mount_image(&server, "/img/100_p0.png", 1).await;
    mount_image(&server, "/img/100_p1.png", 1).await;

    let ctx = create_context(&server, &workspace, TestSettings::default());
    let summary = run(Arc::clone(&ctx), &["42".to_string()], &[])
        .await
        .expect("run failed");

    let folder = workspace.root().join("alice-42").join("Sky-100");
    assert_file(&folder.join("Sky-100-1.png"));
    assert_file(&folder.join("Sky-100-2.png"));

    let success = summary.tally(Outcome::Success, "42");
    assert_eq!(success.artworks, 1);
    assert_eq!(success.images, 2);
    assert_eq!(summary.tally(Outcome::DownloadFailed, "42").artworks, 1);
    assert_eq!(summary.skipped.skipped_images_count, 0);

    // Metadata failures never reach the error dictionary
    assert_eq!(workspace.read_errors(), json!({}));
}

#[tokio::test]
async fn test_rerun_skips_existing_files() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    mount_alice(&server).await;
    // One fetch per image across both runs
    mount_image(&server, "/img/100_p0.png", 1).await;
    mount_image(&server, "/img/100_p1.png", 1).await;

    let first = create_context(&server, &workspace, TestSettings::default());
    run(first, &["42".to_string()], &[]).await.expect("first run failed");

    let second = create_context(&server, &workspace, TestSettings::default());
    let summary = run(second, &["42".to_string()], &[])
        .await
        .expect("second run failed");

    assert_eq!(summary.tally(Outcome::FileExists, "42").images, 2);
    assert_eq!(summary.tally(Outcome::Success, "42").images, 0);
    assert_eq!(summary.tally(Outcome::Success, "42").artworks, 1);
    assert_eq!(summary.skipped.skipped_images_count, 2);
    assert_eq!(summary.skipped.file_exists.len(), 2);
}

#[tokio::test]
async fn test_direct_artwork_with_mixed_extensions() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();
    let base = server.uri();

    mount_artwork(&server, "555", "7", "bob", "Sea").await;
    let image_paths = [
        "/img/555_p0.jpg",
        "/img/555_p1.png",
        "/img/555_p2.JPG",
        "/img/555_p3.png",
        "/img/555_p4.jpg",
    ];
    let urls: Vec<String> = image_paths.iter().map(|p| format!("{}{}", base, p)).collect();
    mount_pages(&server, "555", &urls).await;
    for image_path in image_paths {
        mount_image(&server, image_path, 1).await;
    }

    let ctx = create_context(&server, &workspace, TestSettings::default());
    let summary = run(Arc::clone(&ctx), &[], &["555".to_string()])
        .await
        .expect("run failed");

    let folder = workspace.root().join("bob-7").join("Sea-555");
    for name in [
        "Sea-555-1.jpg",
        "Sea-555-2.png",
        "Sea-555-3.jpg",
        "Sea-555-4.png",
        "Sea-555-5.jpg",
    ] {
        assert_file(&folder.join(name));
    }

    let success = summary.tally(Outcome::Success, "7");
    assert_eq!(success.artworks, 1);
    assert_eq!(success.images, 5);
    assert!(!summary.has_failures());
}

#[tokio::test]
async fn test_persistent_503_exhausts_attempts() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    mount_artwork(&server, "100", "42", "alice", "Sky").await;
    mount_pages(&server, "100", &[format!("{}/img/100_p0.png", server.uri())]).await;
    Mock::given(method("GET"))
        .and(path("/img/100_p0.png"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let settings = TestSettings {
        status_retries: 0,
        max_attempts: 3,
        ..TestSettings::default()
    };
    let ctx = create_context(&server, &workspace, settings);
    let summary = run(Arc::clone(&ctx), &[], &["100".to_string()])
        .await
        .expect("run failed");

    assert_eq!(summary.skipped.skipped_images_count, 1);
    assert_eq!(summary.tally(Outcome::DownloadFailed, "42").images, 1);

    let expected_path = workspace
        .root()
        .join("alice-42")
        .join("Sky-100")
        .join("Sky-100-1.png");
    assert!(!expected_path.exists());

    let errors = workspace.read_errors();
    let record = &errors["alice"]["Sky"]["Sky-100-1"];
    assert_eq!(record["url"], format!("{}/img/100_p0.png", server.uri()));
    assert_eq!(record["finalSavePath"], expected_path.display().to_string());
    assert!(record["reason"].as_str().unwrap().contains("503"));
    assert_eq!(errors["alice"]["Sky"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rate_limited_response_honors_retry_after() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    mount_artwork(&server, "100", "42", "alice", "Sky").await;
    mount_pages(&server, "100", &[format!("{}/img/100_p0.png", server.uri())]).await;

    // Mounted first, so it answers the first request only
    Mock::given(method("GET"))
        .and(path("/img/100_p0.png"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_image(&server, "/img/100_p0.png", 1).await;

    let ctx = create_context(&server, &workspace, TestSettings::default());
    let started = Instant::now();
    let summary = run(Arc::clone(&ctx), &[], &["100".to_string()])
        .await
        .expect("run failed");

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(summary.tally(Outcome::Success, "42").images, 1);
    assert_file(
        &workspace
            .root()
            .join("alice-42")
            .join("Sky-100")
            .join("Sky-100-1.png"),
    );
}

#[tokio::test]
async fn test_remote_names_are_sanitized() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    mount_artwork(&server, "100", "42", "al|ice", "a/b:c?").await;
    mount_pages(&server, "100", &[format!("{}/img/100_p0.png", server.uri())]).await;
    mount_image(&server, "/img/100_p0.png", 1).await;

    let ctx = create_context(&server, &workspace, TestSettings::default());
    download_artwork(Arc::clone(&ctx), "100".to_string(), None).await;

    let folder = workspace.root().join("al_ice-42").join("a_b_c_-100");
    assert_file(&folder.join("a_b_c_-100-1.png"));
}

#[tokio::test]
async fn test_unresolved_artwork_attribution() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("GET"))
        .and(path("/ajax/illust/300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": true,
            "message": "Work has been deleted",
            "body": [],
        })))
        .mount(&server)
        .await;

    let requested = create_context(&server, &workspace, TestSettings::default());
    download_artwork(Arc::clone(&requested), "300".to_string(), Some("42".to_string())).await;
    download_artwork(Arc::clone(&requested), "300".to_string(), None).await;
    let stats = requested.ledger.user_stats();
    assert_eq!(stats.tally(Outcome::DownloadFailed, "42").artworks, 1);
    assert_eq!(stats.tally(Outcome::DownloadFailed, "unknown").artworks, 1);

    let settings = TestSettings {
        failure_attribution: "unknown",
        ..TestSettings::default()
    };
    let unknown = create_context(&server, &workspace, settings);
    download_artwork(Arc::clone(&unknown), "300".to_string(), Some("42".to_string())).await;
    let stats = unknown.ledger.user_stats();
    assert_eq!(stats.tally(Outcome::DownloadFailed, "42").artworks, 0);
    assert_eq!(stats.tally(Outcome::DownloadFailed, "unknown").artworks, 1);
}

#[tokio::test]
async fn test_user_with_no_works() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("GET"))
        .and(path("/ajax/user/9/profile/all"))
        .respond_with(envelope(json!({ "illusts": [] })))
        .mount(&server)
        .await;

    let ctx = create_context(&server, &workspace, TestSettings::default());
    let summary = run(Arc::clone(&ctx), &["9".to_string()], &[])
        .await
        .expect("run failed");

    assert!(summary.users.success.is_empty());
    assert!(!summary.has_failures());
    assert_eq!(workspace.read_errors(), json!({}));
}

#[tokio::test]
async fn test_fetch_user_artworks_shapes() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("GET"))
        .and(path("/ajax/user/1/profile/all"))
        .respond_with(envelope(json!({ "illusts": { "30": null, "10": null, "20": null } })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/user/2/profile/all"))
        .respond_with(envelope(json!({ "illusts": "nope" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/user/3/profile/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": true,
            "message": "User not found",
            "body": [],
        })))
        .mount(&server)
        .await;

    let ctx = create_context(&server, &workspace, TestSettings::default());
    assert_eq!(ctx.api.fetch_user_artworks("1").await, vec!["10", "20", "30"]);
    assert!(ctx.api.fetch_user_artworks("2").await.is_empty());
    assert!(ctx.api.fetch_user_artworks("3").await.is_empty());
}

#[tokio::test]
async fn test_requests_carry_session_headers() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    Mock::given(method("GET"))
        .and(path("/ajax/illust/100"))
        .and(header("cookie", "PHPSESSID=test-session"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .respond_with(envelope(json!({
            "userId": "42",
            "userName": "alice",
            "illustTitle": "Sky",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = create_context(&server, &workspace, TestSettings::default());
    let meta = ctx
        .api
        .fetch_artwork_info("100")
        .await
        .expect("headers did not match");
    assert_eq!(meta.user_name, "alice");
}

#[tokio::test]
async fn test_folder_creation_failure_is_recorded_once() {
    let server = MockServer::start().await;
    let workspace = Workspace::new();

    mount_artwork(&server, "100", "42", "alice", "Sky").await;
    // Pages are never requested once the folder cannot be created
    Mock::given(method("GET"))
        .and(path("/ajax/illust/100/pages"))
        .respond_with(envelope(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    // The download root is a regular file
    std::fs::write(workspace.root(), b"not a directory").unwrap();

    let ctx = create_context(&server, &workspace, TestSettings::default());
    let summary = run(Arc::clone(&ctx), &[], &["100".to_string()])
        .await
        .expect("run failed");

    assert_eq!(summary.tally(Outcome::DownloadFailed, "42").artworks, 1);
    assert_eq!(summary.tally(Outcome::Success, "42").artworks, 0);
    assert!(summary.has_failures());

    let errors = workspace.read_errors();
    let entries = errors["alice"]["Sky"].as_object().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries["Sky-100-1"];
    assert_eq!(entry["kind"], "CreateFolder");
    assert_eq!(entry["artworkId"], "100");
    assert_eq!(entry["title"], "Sky");
    assert!(entry["message"].as_str().unwrap().contains("alice-42"));
    assert!(entry["trace"].as_str().unwrap().contains("caused by:"));
}
