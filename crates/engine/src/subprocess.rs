//! Engine adapter that runs the question-answering program as a child
//! process.
//!
//! The query is written to the child's stdin as one JSON object, then stdin
//! is closed. Every stdout line is either a JSON record with a `kind` field
//! or plain progress text:
//!
//! | `kind` | Meaning |
//! |---|---|
//! | `text` | `{"text", "end"?}` printed to the console (`end` defaults to `"\n"`) |
//! | `panel` / `table` / `markdown` | structured block printed to the console |
//! | `answer` | `{"text"}` the final answer |
//! | `error` | `{"message"}` the engine failed |
//!
//! Stdout is decoded lossily, one line at a time. Stderr is drained to EOF
//! and its first 64 KiB kept for the failure message on a non-zero exit.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragstream_core::job::Query;
use ragstream_core::progress::{Block, Progress};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::console::Console;
use crate::engine::{EngineError, QueryEngine};

/// Maximum stderr captured from the engine process (64 KiB).
const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// How the engine program is launched.
#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub working_directory: Option<PathBuf>,
}

pub struct SubprocessEngine {
    config: SubprocessConfig,
    console: Arc<Console>,
}

/// One interpreted stdout line.
#[derive(Debug, Clone, PartialEq)]
enum Line {
    Progress(Progress),
    Answer(String),
    Failure(String),
}

impl SubprocessEngine {
    pub fn new(config: SubprocessConfig) -> Self {
        Self::with_console(config, Arc::new(Console::new()))
    }

    pub fn with_console(config: SubprocessConfig, console: Arc<Console>) -> Self {
        Self { config, console }
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl QueryEngine for SubprocessEngine {
    fn console(&self) -> Option<Arc<Console>> {
        Some(Arc::clone(&self.console))
    }

    async fn answer(&self, query: &Query) -> Result<String, EngineError> {
        let mut child = self.build_command().spawn().map_err(EngineError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&request_payload(query)).unwrap_or_default();
            // The engine may exit before reading its input; the exit status
            // reports that case.
            let _ = stdin.write_all(&payload).await;
            drop(stdin);
        }

        let stderr_task = tokio::spawn(read_bounded(child.stderr.take()));
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("stdout not captured".into()))?;

        let run = async {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            let mut answer = None;
            let mut failure = None;
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                // Undecodable bytes become U+FFFD; the line still counts.
                let decoded = String::from_utf8_lossy(&buf);
                let line = decoded.trim_end_matches(['\n', '\r']);
                match interpret_line(line) {
                    Line::Progress(progress) => self.console.print(&progress),
                    Line::Answer(text) => answer = Some(text),
                    Line::Failure(message) => failure = Some(message),
                }
            }
            let status = child.wait().await?;
            Ok::<_, EngineError>((status, answer, failure))
        };

        let (status, answer, failure) = match tokio::time::timeout(self.config.timeout, run).await
        {
            Ok(result) => result?,
            Err(_elapsed) => {
                tracing::warn!(program = %self.config.program, "Engine timed out, killing");
                return Err(EngineError::Timeout {
                    secs: self.config.timeout.as_secs(),
                });
            }
        };

        if let Some(message) = failure {
            return Err(EngineError::Failed(message));
        }
        if !status.success() {
            let stderr = stderr_task.await.unwrap_or_default();
            return Err(EngineError::Exited {
                code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        answer.ok_or_else(|| EngineError::Protocol("engine exited without an answer".into()))
    }
}

fn request_payload(query: &Query) -> Value {
    serde_json::json!({
        "question": query.question,
        "enable_multi_hop": query.enable_multi_hop,
        "search_budget_mode": query.search_budget.as_str(),
        "neo4j_uri": query.credentials.uri,
        "neo4j_user": query.credentials.user,
        "neo4j_password": query.credentials.password,
    })
}

fn interpret_line(line: &str) -> Line {
    let raw = || Line::Progress(Progress::Text(format!("{line}\n")));

    let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line) else {
        return raw();
    };
    let field = |name: &str| {
        record
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match record.get("kind").and_then(Value::as_str) {
        Some("text") => {
            let end = record
                .get("end")
                .and_then(Value::as_str)
                .unwrap_or("\n");
            Line::Progress(Progress::Text(format!("{}{end}", field("text"))))
        }
        Some("answer") => Line::Answer(field("text")),
        Some("error") => Line::Failure(field("message")),
        Some("panel" | "table" | "markdown") => {
            match serde_json::from_value::<Block>(Value::Object(record.clone())) {
                Ok(block) => Line::Progress(Progress::Block(block)),
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed progress block, printing raw");
                    raw()
                }
            }
        }
        _ => raw(),
    }
}

/// Keep the first [`MAX_STDERR_BYTES`] of `handle` and discard the rest.
///
/// The pipe is read to EOF so a chatty engine never blocks or hits a
/// broken pipe on stderr.
async fn read_bounded<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let mut head = h.take(MAX_STDERR_BYTES);
        let _ = head.read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut head.into_inner(), &mut tokio::io::sink()).await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
