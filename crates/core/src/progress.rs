//! Progress output emitted by the query engine while it runs.
//!
//! The engine produces either raw text (which may contain ANSI colour
//! escapes and any number of line terminators) or a structured [`Block`]
//! that must be laid out as a unit. Anything that can receive this output
//! implements [`ConsoleSink`].

use serde::Deserialize;

/// A structured renderable spanning several visually significant lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Framed box around a body of text, with an optional title in the top
    /// border.
    Panel {
        #[serde(default)]
        title: Option<String>,
        body: String,
    },
    /// Grid with a header row.
    Table {
        #[serde(default)]
        title: Option<String>,
        columns: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    /// Lightweight markdown: headings, bullet lists, fenced code, inline
    /// `**bold**`, `*italic*` and `` `code` ``.
    Markdown { text: String },
}

/// One unit of progress output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Text(String),
    Block(Block),
}

/// Destination for engine progress output.
///
/// Implementations must not block the caller for long: the engine writes
/// through this trait from inside its computation.
pub trait ConsoleSink: Send + Sync {
    /// Accept a chunk of raw text. Chunks need not align with lines.
    fn write_text(&self, chunk: &str);

    /// Accept a structured block.
    fn write_block(&self, block: &Block);

    /// Called when the producer has no more output for now.
    fn flush(&self) {}

    fn print(&self, progress: &Progress) {
        match progress {
            Progress::Text(text) => self.write_text(text),
            Progress::Block(block) => self.write_block(block),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
