use super::*;
use crate::process::scripted::{ScriptedRunner, ScriptedStep};
use crate::progress::ProgressHub;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Test fixture: a fetcher over a scripted runner plus its canonical media dir
struct TestApp {
    fetcher: Arc<AudioFetcher>,
    config: Arc<Config>,
    runner: Arc<ScriptedRunner>,
    media_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    fn router(&self) -> Router {
        create_router(self.fetcher.clone(), self.config.clone())
    }
}

async fn create_test_app(steps: impl FnOnce(&std::path::Path) -> Vec<ScriptedStep>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let media = temp_dir.path().join("media");
    std::fs::create_dir_all(&media).unwrap();
    let media_dir = std::fs::canonicalize(&media).unwrap();

    let mut config = Config::default();
    config.download.download_dir = media;
    config.tools.ytdlp_path = Some(PathBuf::from("/opt/bin/yt-dlp"));
    config.tools.ffmpeg_path = Some(PathBuf::from("/opt/bin/ffmpeg"));
    config.tools.search_path = false;

    let runner = Arc::new(ScriptedRunner::new(steps(&media_dir)));
    let fetcher = AudioFetcher::with_runner(config.clone(), runner.clone(), ProgressHub::new(64))
        .await
        .unwrap();

    TestApp {
        fetcher: Arc::new(fetcher),
        config: Arc::new(config),
        runner,
        media_dir,
        _temp_dir: temp_dir,
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_version_and_active_jobs() {
    let app = create_test_app(|_| vec![]).await;

    let response = app.router().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["active_jobs"], 0);
}

#[tokio::test]
async fn openapi_json_is_served() {
    let app = create_test_app(|_| vec![]).await;

    let response = app.router().oneshot(get("/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "audio-fetch REST API");
    assert!(body["paths"]["/jobs"].is_object());
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let app = create_test_app(|_| vec![]).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let app = create_test_app(|_| vec![]).await;
    let mut config = (*app.config).clone();
    config.api.cors_enabled = false;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = create_router(app.fetcher.clone(), Arc::new(config))
        .oneshot(request)
        .await
        .unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_allows_only_listed_origins() {
    let app = create_test_app(|_| vec![]).await;
    let mut config = (*app.config).clone();
    // invalid origins are skipped rather than rejected
    config.api.cors_origins = vec![
        "http://localhost:3000".to_string(),
        "not a header value\n".to_string(),
    ];
    let router = create_router(app.fetcher.clone(), Arc::new(config));

    let with_origin = |origin: &str| {
        Request::builder()
            .uri("/health")
            .header("Origin", origin)
            .body(Body::empty())
            .unwrap()
    };

    let allowed = router
        .clone()
        .oneshot(with_origin("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );

    let denied = router
        .oneshot(with_origin("http://evil.example"))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::OK);
    assert!(
        !denied
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn api_server_stops_on_shutdown() {
    let app = create_test_app(|_| vec![]).await;
    let mut config = (*app.config).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let server = tokio::spawn(start_api_server(app.fetcher.clone(), Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    app.fetcher.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
