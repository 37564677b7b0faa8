use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ragstream_core::job::GraphCredentials;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Applies until the
    /// response head is sent, so long-lived streams are not cut off.
    pub request_timeout_secs: u64,
    /// How long the stream dispatcher waits for an event before re-checking
    /// the completion signal (default: `100` ms).
    pub stream_poll_interval_ms: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Credentials used when a login request leaves fields blank.
    pub graph_defaults: GraphCredentials,
    pub engine: EngineSettings,
    pub asr_ws_url: String,
    pub segmentation_url: String,
    pub vision_api_url: String,
    pub vision_model: String,
    /// Where uploaded images are stored and served from (`/uploads`).
    pub upload_dir: PathBuf,
    /// Where segmented images are stored and served from (`/segmented`).
    pub segmented_dir: PathBuf,
}

/// How the question-answering program is launched.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub working_directory: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                                    |
    /// |---------------------------|--------------------------------------------|
    /// | `HOST`                    | `0.0.0.0`                                  |
    /// | `PORT`                    | `5001`                                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`                    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                                       |
    /// | `STREAM_POLL_INTERVAL_MS` | `100`                                      |
    /// | `NEO4J_URI`               | `bolt://localhost:7687`                    |
    /// | `NEO4J_USER`              | `neo4j`                                    |
    /// | `NEO4J_PASSWORD`          | empty                                      |
    /// | `ENGINE_PROGRAM`          | `python3`                                  |
    /// | `ENGINE_ARGS`             | `q_a.py` (whitespace separated)            |
    /// | `ENGINE_TIMEOUT_SECS`     | `600`                                      |
    /// | `ENGINE_WORKDIR`          | current directory                          |
    /// | `ASR_WS_URL`              | `ws://localhost:8090/asr/v2`               |
    /// | `SEGMENTATION_URL`        | `http://localhost:8091/segment`            |
    /// | `VISION_API_URL`          | `http://localhost:8092/vivogpt/completions`|
    /// | `VISION_MODEL`            | `vivo-BlueLM-V-2.0`                        |
    /// | `UPLOAD_DIR`              | `static/uploads`                           |
    /// | `SEGMENTED_DIR`           | `static/segmented`                         |
    ///
    /// JWT settings come from [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on malformed numeric values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let engine = EngineSettings {
            program: env_or("ENGINE_PROGRAM", "python3"),
            args: env_or("ENGINE_ARGS", "q_a.py")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            timeout_secs: env_parse("ENGINE_TIMEOUT_SECS", 600),
            working_directory: std::env::var("ENGINE_WORKDIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        };

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 5001),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            stream_poll_interval_ms: env_parse("STREAM_POLL_INTERVAL_MS", 100),
            jwt: JwtConfig::from_env(),
            graph_defaults: GraphCredentials {
                uri: env_or("NEO4J_URI", "bolt://localhost:7687"),
                user: env_or("NEO4J_USER", "neo4j"),
                password: env_or("NEO4J_PASSWORD", ""),
            },
            engine,
            asr_ws_url: env_or("ASR_WS_URL", "ws://localhost:8090/asr/v2"),
            segmentation_url: env_or("SEGMENTATION_URL", "http://localhost:8091/segment"),
            vision_api_url: env_or(
                "VISION_API_URL",
                "http://localhost:8092/vivogpt/completions",
            ),
            vision_model: env_or("VISION_MODEL", ragstream_media::vision::DEFAULT_MODEL),
            upload_dir: env_or("UPLOAD_DIR", "static/uploads").into(),
            segmented_dir: env_or("SEGMENTED_DIR", "static/segmented").into(),
        }
    }

    pub fn stream_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stream_poll_interval_ms)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
