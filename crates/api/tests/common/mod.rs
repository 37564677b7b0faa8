#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ragstream_api::auth::jwt::JwtConfig;
use ragstream_api::auth::session::SessionStore;
use ragstream_api::config::{EngineSettings, ServerConfig};
use ragstream_api::router::build_app_router;
use ragstream_api::state::AppState;
use ragstream_core::job::{GraphCredentials, Query};
use ragstream_engine::{Console, EngineError, GraphError, GraphProbe, QueryEngine};
use ragstream_media::{
    ImageDescriber, ImageSegmenter, MediaError, Segmentation, SegmentationParams, SpeechRecognizer,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "letmein";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Engine that prints a fixed script to its console, then answers or fails.
pub struct FakeEngine {
    console: Arc<Console>,
    lines: Vec<String>,
    outcome: Result<String, String>,
    calls: AtomicUsize,
    seen: std::sync::Mutex<Vec<Query>>,
}

impl FakeEngine {
    pub fn answering(lines: &[&str], answer: &str) -> Self {
        Self::new(lines, Ok(answer.to_string()))
    }

    pub fn failing(lines: &[&str], message: &str) -> Self {
        Self::new(lines, Err(message.to_string()))
    }

    fn new(lines: &[&str], outcome: Result<String, String>) -> Self {
        Self {
            console: Arc::new(Console::new()),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            outcome,
            calls: AtomicUsize::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<Query> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn console_redirected(&self) -> bool {
        self.console.is_redirected()
    }
}

#[async_trait]
impl QueryEngine for FakeEngine {
    fn console(&self) -> Option<Arc<Console>> {
        Some(Arc::clone(&self.console))
    }

    async fn answer(&self, query: &Query) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(query.clone());
        for line in &self.lines {
            self.console.write_text(line);
        }
        self.outcome.clone().map_err(EngineError::Failed)
    }
}

/// Longer than the test config's request timeout.
pub const SLOW_CALL: Duration = Duration::from_secs(45);

/// Accepts any credentials whose password is [`TEST_PASSWORD`]. The password
/// `"slow"` stalls for [`SLOW_CALL`] first.
pub struct FakeProbe;

#[async_trait]
impl GraphProbe for FakeProbe {
    async fn verify(&self, credentials: &GraphCredentials) -> Result<(), GraphError> {
        if credentials.password == "slow" {
            tokio::time::sleep(SLOW_CALL).await;
        }
        if credentials.password == TEST_PASSWORD {
            Ok(())
        } else {
            Err(GraphError::Rejected(
                "The client is unauthorized due to authentication failure.".into(),
            ))
        }
    }
}

/// Recognizes `b"silence"` as nothing and `b"noise"` as unsupported audio.
/// `b"long recording"` takes [`SLOW_CALL`], like a recording streamed in
/// real time.
pub struct FakeSpeech;

#[async_trait]
impl SpeechRecognizer for FakeSpeech {
    async fn recognize(&self, audio: &[u8]) -> Result<String, MediaError> {
        match audio {
            b"long recording" => {
                tokio::time::sleep(SLOW_CALL).await;
                Ok("a very long question".into())
            }
            b"silence" => Err(MediaError::NothingRecognized),
            b"noise" => Err(MediaError::UnsupportedAudio("missing RIFF header".into())),
            b"offline" => Err(MediaError::Speech("service unavailable".into())),
            _ => Ok("what causes a fever".into()),
        }
    }
}

pub const SEGMENTED_BYTES: &[u8] = b"SEGMENTED-IMAGE";

pub struct FakeSegmenter {
    pub fail: AtomicBool,
}

#[async_trait]
impl ImageSegmenter for FakeSegmenter {
    async fn segment(
        &self,
        _image: &[u8],
        _file_name: &str,
        _params: &SegmentationParams,
    ) -> Result<Segmentation, MediaError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediaError::Api {
                status: 503,
                body: "busy".into(),
            });
        }
        Ok(Segmentation {
            image: SEGMENTED_BYTES.to_vec(),
            info: serde_json::json!({ "objects": 2 }),
        })
    }
}

pub struct FakeDescriber {
    pub fail: AtomicBool,
}

#[async_trait]
impl ImageDescriber for FakeDescriber {
    async fn describe(&self, image: &[u8]) -> Result<String, MediaError> {
        assert_eq!(image, SEGMENTED_BYTES, "describer must see the segmented image");
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediaError::UnexpectedResponse("no content".into()));
        }
        Ok("A well-defined lesion in the left lobe.".into())
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub engine: Arc<FakeEngine>,
    pub segmenter: Arc<FakeSegmenter>,
    pub describer: Arc<FakeDescriber>,
    pub dir: TempDir,
}

/// Build a test `ServerConfig` with safe defaults rooted at `dir`.
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        stream_poll_interval_ms: 10,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
        graph_defaults: GraphCredentials {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
        },
        engine: EngineSettings {
            program: "true".to_string(),
            args: Vec::new(),
            timeout_secs: 5,
            working_directory: None,
        },
        asr_ws_url: "ws://127.0.0.1:9/asr".to_string(),
        segmentation_url: "http://127.0.0.1:9/segment".to_string(),
        vision_api_url: "http://127.0.0.1:9/vision".to_string(),
        vision_model: "test-model".to_string(),
        upload_dir: dir.path().join("uploads"),
        segmented_dir: dir.path().join("segmented"),
    }
}

/// Build the full application router around `engine`, with every other
/// collaborator faked.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app(engine: FakeEngine) -> TestApp {
    build_test_app_with(engine, |_| {})
}

/// Like [`build_test_app`], with `configure` applied to the test config.
pub fn build_test_app_with(engine: FakeEngine, configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    configure(&mut config);
    let engine = Arc::new(engine);
    let segmenter = Arc::new(FakeSegmenter {
        fail: AtomicBool::new(false),
    });
    let describer = Arc::new(FakeDescriber {
        fail: AtomicBool::new(false),
    });

    let state = AppState {
        config: Arc::new(config.clone()),
        sessions: Arc::new(SessionStore::new(chrono::Duration::minutes(
            config.jwt.access_token_expiry_mins,
        ))),
        graph: Arc::new(FakeProbe),
        engine: engine.clone(),
        speech: Arc::new(FakeSpeech),
        segmenter: segmenter.clone(),
        describer: describer.clone(),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        engine,
        segmenter,
        describer,
        dir,
    }
}

pub fn default_app() -> TestApp {
    build_test_app(FakeEngine::answering(&["Searching graph...\n"], "42"))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(
    app: &TestApp,
    uri: &str,
    body: Value,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(app, request).await
}

/// POST a single-file multipart form.
pub async fn post_file(
    app: &TestApp,
    uri: &str,
    field: &str,
    file_name: &str,
    bytes: &[u8],
    token: &str,
) -> Response<Body> {
    const BOUNDARY: &str = "ragstream-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Log in with the test password and return the access token.
pub async fn login(app: &TestApp) -> String {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "password": TEST_PASSWORD }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Read an event-stream body to the end and parse every `data:` frame.
pub async fn sse_messages(response: Response<Body>) -> Vec<Value> {
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim_start()).unwrap())
        .collect()
}
