//! End-to-end tests for the HTTP surface, using mock renderers so no
//! browser install is required.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tower::ServiceExt;

use htmlshot::config::ServiceConfig;
use htmlshot::http::{router, AppState};
use htmlshot::{RenderJob, Renderer};

const APP_KEY: &str = "test-key";

/// Writes fixed bytes to the destination.
struct StaticRenderer(&'static [u8]);

impl Renderer for StaticRenderer {
    fn render_to_file(&self, _job: &RenderJob, dest: &Path) -> htmlshot::Result<()> {
        std::fs::write(dest, self.0)?;
        Ok(())
    }
}

/// Writes the job's content back, so each response is traceable to its
/// request.
struct EchoRenderer;

impl Renderer for EchoRenderer {
    fn render_to_file(&self, job: &RenderJob, dest: &Path) -> htmlshot::Result<()> {
        std::fs::write(dest, job.content.as_bytes())?;
        Ok(())
    }
}

struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render_to_file(&self, _job: &RenderJob, _dest: &Path) -> htmlshot::Result<()> {
        Err(htmlshot::Error::Render("synthetic renderer crash".to_string()))
    }
}

/// Reports success without writing anything.
struct VanishingRenderer;

impl Renderer for VanishingRenderer {
    fn render_to_file(&self, _job: &RenderJob, _dest: &Path) -> htmlshot::Result<()> {
        Ok(())
    }
}

struct SlowRenderer(Duration);

impl Renderer for SlowRenderer {
    fn render_to_file(&self, _job: &RenderJob, dest: &Path) -> htmlshot::Result<()> {
        std::thread::sleep(self.0);
        std::fs::write(dest, b"late")?;
        Ok(())
    }
}

/// Tracks how many renders overlap.
struct CountingRenderer {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

impl CountingRenderer {
    fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }
}

impl Renderer for CountingRenderer {
    fn render_to_file(&self, _job: &RenderJob, dest: &Path) -> htmlshot::Result<()> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        self.current.fetch_sub(1, Ordering::SeqCst);
        std::fs::write(dest, b"counted")?;
        Ok(())
    }
}

fn test_config(scratch_dir: &Path, debug: bool) -> ServiceConfig {
    ServiceConfig {
        app_key: APP_KEY.to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("valid socket address"),
        scratch_dir: Some(scratch_dir.to_path_buf()),
        chrome_path: None,
        debug,
        max_concurrent_renders: Some(4),
    }
}

fn app(renderer: Arc<dyn Renderer>, config: &ServiceConfig) -> Router {
    router(AppState::new(renderer, config))
}

fn post_root(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("App-Key", APP_KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
}

#[tokio::test]
async fn html_renders_png_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"png bytes")), &config);

    let response = app
        .oneshot(post_root(r#"{"html":"<h1>hi</h1>"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["mime_type"], "image/png");
    assert_eq!(body["data"]["size"], 9);

    let decoded = STANDARD
        .decode(body["data"]["base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, b"png bytes");

    assert_eq!(scratch_entries(dir.path()), 0);
}

#[tokio::test]
async fn url_with_pdf_type_reports_pdf_mime() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"%PDF-1.7 fake")), &config);

    let response = app
        .oneshot(post_root(
            r#"{"url":"https://example.com","type":"pdf","format":"A4"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["mime_type"], "application/pdf");
}

#[tokio::test]
async fn missing_content_and_bad_format_are_reported_together() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"unused")), &config);

    let response = app
        .oneshot(post_root(r#"{"type":"pdf","format":"Z9"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["status"], "error");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("html or url"), "got: {message}");
    assert!(message.contains("format"), "got: {message}");
}

#[tokio::test]
async fn malformed_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"unused")), &config);

    let response = app.oneshot(post_root(r#"{"url":"notaurl"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("url must be a valid absolute URL"));
}

#[tokio::test]
async fn wrong_or_missing_app_key_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"unused")), &config);

    let wrong_key = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("App-Key", "nope")
        .body(Body::from(r#"{"html":"<p/>"}"#))
        .unwrap();
    let response = app.clone().oneshot(wrong_key).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Unauthorized: invalid App-Key");

    let no_key = Request::builder()
        .method(Method::POST)
        .uri("/")
        .body(Body::from(r#"{"html":"<p/>"}"#))
        .unwrap();
    let response = app.clone().oneshot(no_key).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Auth runs before routing; unknown paths still get 401 without a key
    let unknown_path = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(unknown_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_method_or_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"unused")), &config);

    let get_root = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header("App-Key", APP_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(get_root).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Endpoint not found");

    let other_path = Request::builder()
        .method(Method::POST)
        .uri("/render")
        .header("App-Key", APP_KEY)
        .body(Body::from(r#"{"html":"<p/>"}"#))
        .unwrap();
    let response = app.oneshot(other_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"unused")), &config);

    let response = app.oneshot(post_root("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["message"], "request body must be valid JSON");
}

#[tokio::test]
async fn renderer_failure_is_opaque_without_debug() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(FailingRenderer), &config);

    let response = app.oneshot(post_root(r#"{"html":"<p/>"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[tokio::test]
async fn renderer_failure_detail_surfaces_in_debug_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), true);
    let app = app(Arc::new(FailingRenderer), &config);

    let response = app.oneshot(post_root(r#"{"html":"<p/>"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("synthetic renderer crash"));
}

#[tokio::test]
async fn missing_artifact_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(VanishingRenderer), &config);

    let response = app.oneshot(post_root(r#"{"html":"<p/>"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[tokio::test]
async fn slow_render_times_out_without_residue() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(
        Arc::new(SlowRenderer(Duration::from_millis(300))),
        &config,
    );

    let response = app
        .oneshot(post_root(r#"{"html":"<p/>","timeout":0.05}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Give the abandoned worker time to finish so the reaper can run
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[tokio::test]
async fn repeated_requests_leave_no_residue() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(StaticRenderer(b"bytes")), &config);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_root(r#"{"html":"<p/>"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_their_own_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), false);
    let app = app(Arc::new(EchoRenderer), &config);

    let mut handles = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let content = format!("<h1>request {i}</h1>");
            let body = serde_json::json!({ "html": content }).to_string();
            let response = app.oneshot(post_root(&body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            let decoded = STANDARD
                .decode(body["data"]["base64"].as_str().unwrap())
                .unwrap();
            assert_eq!(decoded, content.as_bytes());
        }));
    }
    for handle in handles {
        handle.await.expect("request task should succeed");
    }

    assert_eq!(scratch_entries(dir.path()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn render_slot_bound_is_never_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), false);
    config.max_concurrent_renders = Some(1);

    let renderer = Arc::new(CountingRenderer::new());
    let app = app(renderer.clone(), &config);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let response = app.oneshot(post_root(r#"{"html":"<p/>"}"#)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.expect("request task should succeed");
    }

    assert_eq!(renderer.max_seen.load(Ordering::SeqCst), 1);
}
