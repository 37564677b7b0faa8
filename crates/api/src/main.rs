use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragstream_api::auth::session::SessionStore;
use ragstream_api::config::ServerConfig;
use ragstream_api::router::build_app_router;
use ragstream_api::state::AppState;
use ragstream_engine::{Neo4jHttpProbe, SubprocessConfig, SubprocessEngine};
use ragstream_media::{HttpDescriber, HttpSegmenter, WebSocketRecognizer};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to one JSON object per line.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ragstream_api=debug,ragstream_worker=debug,ragstream_engine=info,tower_http=debug"
                    .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    for dir in [&config.upload_dir, &config.segmented_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create {}: {e}", dir.display()));
    }

    // --- Engine ---
    let engine = SubprocessEngine::new(SubprocessConfig {
        program: config.engine.program.clone(),
        args: config.engine.args.clone(),
        timeout: Duration::from_secs(config.engine.timeout_secs),
        working_directory: config.engine.working_directory.clone(),
    });
    tracing::info!(
        program = %config.engine.program,
        args = ?config.engine.args,
        "Query engine configured",
    );

    // --- Graph sessions ---
    // Sessions expire together with their access token.
    let sessions = Arc::new(SessionStore::new(chrono::Duration::minutes(
        config.jwt.access_token_expiry_mins,
    )));
    let sweeper_handle = Arc::clone(&sessions).spawn_sweeper(SESSION_SWEEP_INTERVAL);

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        sessions,
        graph: Arc::new(Neo4jHttpProbe::new()),
        engine: Arc::new(engine),
        speech: Arc::new(WebSocketRecognizer::new(config.asr_ws_url.clone())),
        segmenter: Arc::new(HttpSegmenter::new(config.segmentation_url.clone())),
        describer: Arc::new(HttpDescriber::new(
            config.vision_api_url.clone(),
            config.vision_model.clone(),
        )),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    sweeper_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
