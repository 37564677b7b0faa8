/// Errors from decoding uploads or talking to the media services.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unsupported audio: {0}")]
    UnsupportedAudio(String),

    /// The speech service finished but produced no text.
    #[error("No speech was recognized in the audio")]
    NothingRecognized,

    /// The speech service reported an error frame.
    #[error("Speech service error: {0}")]
    Speech(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}
