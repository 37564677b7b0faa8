//! Websocket speech-to-text client.
//!
//! Session protocol:
//!
//! 1. client sends a JSON `started` message with recognition options
//! 2. client streams int16 PCM in binary frames of [`FRAME_BYTES`]
//! 3. client sends the binary marker `--end--`
//! 4. server sends JSON messages; the session ends on
//!    `{"action":"result","type":"asr","data":{"is_last":true,"text":...}}`
//!    or `{"action":"error",...}`
//! 5. client sends `--close--`

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::MediaError;
use crate::{pcm, wav};

/// Audio bytes per binary frame (40 ms of 16 kHz int16 mono).
pub const FRAME_BYTES: usize = 1280;

/// Pause between frames, matching real-time playback.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(40);

const END_MARKER: &[u8] = b"--end--";
const CLOSE_MARKER: &[u8] = b"--close--";

/// Turns an uploaded audio file into text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio: &[u8]) -> Result<String, MediaError>;
}

pub struct WebSocketRecognizer {
    url: String,
    frame_interval: Duration,
}

impl WebSocketRecognizer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Override the pacing between audio frames.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

#[async_trait]
impl SpeechRecognizer for WebSocketRecognizer {
    async fn recognize(&self, audio: &[u8]) -> Result<String, MediaError> {
        let decoded = wav::decode(audio)?;
        tracing::debug!(
            sample_rate = decoded.sample_rate,
            channels = decoded.channels,
            frames = decoded.frames(),
            "Decoded audio upload",
        );
        let stream = pcm::prepare_for_asr(&decoded);

        let (mut ws, _response) = connect_async(self.url.as_str()).await?;
        let request_id = uuid::Uuid::new_v4().to_string();
        ws.send(Message::Text(start_message(&request_id).to_string()))
            .await?;

        for frame in stream.chunks_exact(FRAME_BYTES) {
            ws.send(Message::Binary(frame.to_vec())).await?;
            if !self.frame_interval.is_zero() {
                tokio::time::sleep(self.frame_interval).await;
            }
        }
        ws.send(Message::Binary(END_MARKER.to_vec())).await?;

        let mut outcome = Err(MediaError::Speech(
            "connection closed before a final result".into(),
        ));
        while let Some(message) = ws.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let value: Value = serde_json::from_str(&text)
                .map_err(|e| MediaError::UnexpectedResponse(e.to_string()))?;
            if let Some(result) = interpret_reply(&value) {
                outcome = result;
                break;
            }
        }

        // The session is over either way; a failed goodbye changes nothing.
        let _ = ws.send(Message::Binary(CLOSE_MARKER.to_vec())).await;
        let _ = ws.close(None).await;

        let text = outcome?;
        if text.trim().is_empty() {
            return Err(MediaError::NothingRecognized);
        }
        tracing::info!(request_id = %request_id, chars = text.chars().count(), "Speech recognized");
        Ok(text)
    }
}

fn start_message(request_id: &str) -> Value {
    serde_json::json!({
        "type": "started",
        "request_id": request_id,
        "asr_info": {
            "front_vad_time": 6000,
            "end_vad_time": 2000,
            "audio_type": "pcm",
            "chinese2digital": 1,
            "punctuation": 2,
        },
    })
}

/// `Some` when `reply` ends the session.
fn interpret_reply(reply: &Value) -> Option<Result<String, MediaError>> {
    match reply.get("action").and_then(Value::as_str) {
        Some("error") => Some(Err(MediaError::Speech(reply.to_string()))),
        Some("result") if reply.get("type").and_then(Value::as_str) == Some("asr") => {
            let data = reply.get("data")?;
            if data.get("is_last").and_then(Value::as_bool) != Some(true) {
                return None;
            }
            let text = data.get("text").and_then(Value::as_str).unwrap_or_default();
            Some(Ok(text.to_string()))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::accept_async;

    use super::*;

    /// What the fake server saw from the client.
    #[derive(Debug, Default)]
    struct Session {
        started: Option<Value>,
        frames: Vec<usize>,
        saw_end: bool,
        saw_close: bool,
    }

    /// Start a one-connection speech server that answers with `replies`
    /// once it receives `--end--`.
    async fn fake_server(replies: Vec<Value>) -> (String, oneshot::Receiver<Session>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let mut session = Session::default();

            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) => session.started = serde_json::from_str(&text).ok(),
                    Message::Binary(bytes) if bytes == END_MARKER => {
                        session.saw_end = true;
                        for reply in &replies {
                            ws.send(Message::Text(reply.to_string())).await.unwrap();
                        }
                    }
                    Message::Binary(bytes) if bytes == CLOSE_MARKER => {
                        session.saw_close = true;
                    }
                    Message::Binary(bytes) => session.frames.push(bytes.len()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            let _ = done_tx.send(session);
        });

        (url, done_rx)
    }

    /// One second of 16 kHz mono silence plus a partial frame's worth.
    fn audio() -> Vec<u8> {
        let samples = 16_000 + 100;
        wav::encode_for_test(1, 1, 16_000, 16, &vec![0u8; samples * 2])
    }

    #[tokio::test]
    async fn streams_full_frames_and_returns_final_text() {
        let (url, session) = fake_server(vec![
            serde_json::json!({"action": "started"}),
            serde_json::json!({"action": "result", "type": "asr", "data": {"is_last": false, "text": "what"}}),
            serde_json::json!({"action": "result", "type": "asr", "data": {"is_last": true, "text": "what treats migraine"}}),
        ])
        .await;

        let recognizer = WebSocketRecognizer::new(url).with_frame_interval(Duration::ZERO);
        let text = recognizer.recognize(&audio()).await.unwrap();
        assert_eq!(text, "what treats migraine");

        let session = session.await.unwrap();
        let started = session.started.unwrap();
        assert_eq!(started["type"], "started");
        assert_eq!(started["asr_info"]["audio_type"], "pcm");
        assert_eq!(started["asr_info"]["end_vad_time"], 2000);
        // 32_200 bytes -> 25 full frames, the 200-byte tail is not sent.
        assert_eq!(session.frames.len(), 25);
        assert!(session.frames.iter().all(|&len| len == FRAME_BYTES));
        assert!(session.saw_end);
        assert!(session.saw_close);
    }

    #[tokio::test]
    async fn error_reply_fails_recognition() {
        let (url, _session) = fake_server(vec![
            serde_json::json!({"action": "error", "code": 40001, "desc": "bad audio"}),
        ])
        .await;

        let recognizer = WebSocketRecognizer::new(url).with_frame_interval(Duration::ZERO);
        let err = recognizer.recognize(&audio()).await.unwrap_err();
        assert_matches!(err, MediaError::Speech(ref m) if m.contains("bad audio"));
    }

    #[tokio::test]
    async fn empty_final_text_is_nothing_recognized() {
        let (url, _session) = fake_server(vec![serde_json::json!(
            {"action": "result", "type": "asr", "data": {"is_last": true, "text": ""}}
        )])
        .await;

        let recognizer = WebSocketRecognizer::new(url).with_frame_interval(Duration::ZERO);
        assert_matches!(
            recognizer.recognize(&audio()).await,
            Err(MediaError::NothingRecognized)
        );
    }

    #[tokio::test]
    async fn non_wav_upload_fails_before_connecting() {
        let recognizer = WebSocketRecognizer::new("ws://127.0.0.1:1");
        assert_matches!(
            recognizer.recognize(b"not audio").await,
            Err(MediaError::UnsupportedAudio(_))
        );
    }

    #[test]
    fn only_final_asr_results_end_the_session() {
        assert!(interpret_reply(&serde_json::json!({"action": "started"})).is_none());
        assert!(interpret_reply(&serde_json::json!(
            {"action": "result", "type": "nlu", "data": {"is_last": true}}
        ))
        .is_none());
        assert_matches!(
            interpret_reply(&serde_json::json!(
                {"action": "result", "type": "asr", "data": {"is_last": true, "text": "hi"}}
            )),
            Some(Ok(ref t)) if t == "hi"
        );
    }
}
