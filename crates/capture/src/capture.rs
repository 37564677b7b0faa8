//! Line-buffering output sink that turns engine progress into `log` events.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use ragstream_core::event::Event;
use ragstream_core::progress::{Block, ConsoleSink};
use ragstream_events::EventSender;

use crate::ansi::AnsiConverter;
use crate::terminal::VirtualTerminal;

/// Captures a job's progress output and forwards it as [`Event::log`]s.
///
/// Text is buffered until a `\n` arrives; every complete, non-blank line
/// becomes one event immediately. Structured blocks skip the line buffer and
/// are rendered whole. Call [`flush`](Self::flush) when the producer is done
/// to emit an unterminated trailing line.
pub struct OutputCapture {
    events: EventSender,
    buffer: Mutex<String>,
    converter: AnsiConverter,
    terminal: VirtualTerminal,
}

impl OutputCapture {
    pub fn new(events: EventSender) -> Self {
        Self::with_terminal(events, VirtualTerminal::default())
    }

    pub fn with_terminal(events: EventSender, terminal: VirtualTerminal) -> Self {
        Self {
            events,
            buffer: Mutex::new(String::new()),
            converter: AnsiConverter::new(),
            terminal,
        }
    }

    /// Accept a chunk of text. Returns the number of bytes accepted.
    pub fn write(&self, chunk: &str) -> usize {
        let lines = {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            buffer.push_str(chunk);
            take_complete_lines(&mut buffer)
        };
        for line in &lines {
            self.emit_line(line);
        }
        chunk.len()
    }

    /// Accept raw bytes; invalid UTF-8 is replaced rather than rejected.
    pub fn write_bytes(&self, bytes: &[u8]) -> usize {
        self.write(&String::from_utf8_lossy(bytes));
        bytes.len()
    }

    /// Render a structured block and emit it as a single event.
    pub fn render(&self, block: &Block) {
        let rendered = catch_unwind(AssertUnwindSafe(|| self.terminal.export_html(block)));
        match rendered {
            Ok(html) => self.events.push(Event::log(format!(
                "<div class=\"log-entry-rich\"><pre class=\"code\">{html}</pre></div>"
            ))),
            Err(_) => tracing::warn!("Skipping progress block that failed to render"),
        }
    }

    /// Emit any non-blank unterminated remainder and clear the buffer.
    pub fn flush(&self) {
        let rest = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        self.emit_line(&rest);
    }

    /// Bytes currently held back waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn emit_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.converter.visible_text(line).trim().is_empty() {
            return;
        }
        tracing::trace!(line, "Captured progress line");
        let html = self.converter.convert(line);
        self.events
            .push(Event::log(format!("<div class='log-item'>{html}</div>")));
    }
}

/// Remove and return every `\n`-terminated prefix of `buffer`.
fn take_complete_lines(buffer: &mut String) -> Vec<String> {
    let Some(last_newline) = buffer.rfind('\n') else {
        return Vec::new();
    };
    let rest = buffer.split_off(last_newline + 1);
    let complete = std::mem::replace(buffer, rest);
    complete.split_inclusive('\n').map(str::to_owned).collect()
}

impl ConsoleSink for OutputCapture {
    fn write_text(&self, chunk: &str) {
        self.write(chunk);
    }

    fn write_block(&self, block: &Block) {
        self.render(block);
    }

    fn flush(&self) {
        OutputCapture::flush(self);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
