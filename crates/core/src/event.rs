//! Job stream events and their wire representation.
//!
//! An [`Event`] is produced by the job worker (or the output capture it
//! owns) and consumed by the stream dispatcher, which serializes it with
//! [`Event::to_wire_json`] as one server-sent message.

use serde::Serialize;

/// Wire type for a formatted progress line.
pub const MSG_TYPE_LOG_HTML: &str = "log_html";

/// Wire type for the final answer of a successful job.
pub const MSG_TYPE_ANSWER: &str = "answer";

/// Wire type for the failure description of a failed job.
pub const MSG_TYPE_ERROR: &str = "error";

/// Wire type for the completion marker that always ends a stream.
pub const MSG_TYPE_FINISHED: &str = "finished";

/// Discriminant of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// HTML-safe formatted progress output.
    Log,
    /// Plain-text answer returned by the engine.
    Answer,
    /// Plain-text failure description.
    Error,
    /// End of the job's event sequence. Always last, exactly once.
    Finished,
}

impl EventKind {
    /// The `type` value used on the client wire for this kind.
    pub fn wire_type(self) -> &'static str {
        match self {
            Self::Log => MSG_TYPE_LOG_HTML,
            Self::Answer => MSG_TYPE_ANSWER,
            Self::Error => MSG_TYPE_ERROR,
            Self::Finished => MSG_TYPE_FINISHED,
        }
    }
}

/// An immutable, typed message flowing from a job worker to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    payload: String,
}

/// Serialized shape of one event on the wire: `{"type": ..., "content": ...}`.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
}

impl Event {
    /// A progress event carrying already-escaped HTML markup.
    pub fn log(html: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Log,
            payload: html.into(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Answer,
            payload: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            payload: message.into(),
        }
    }

    pub fn finished() -> Self {
        Self {
            kind: EventKind::Finished,
            payload: String::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn is_finished(&self) -> bool {
        self.kind == EventKind::Finished
    }

    /// Borrowing wire view. `content` is omitted for `finished`.
    pub fn to_wire(&self) -> WireMessage<'_> {
        let content = match self.kind {
            EventKind::Finished => None,
            _ => Some(self.payload.as_str()),
        };
        WireMessage {
            kind: self.kind.wire_type(),
            content,
        }
    }

    /// Serialize the wire view to a JSON string.
    pub fn to_wire_json(&self) -> String {
        // A struct of two strings cannot fail to serialize.
        serde_json::to_string(&self.to_wire()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
