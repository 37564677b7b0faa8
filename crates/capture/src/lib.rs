//! Progress output capture and HTML formatting.
//!
//! - [`ansi`] -- ANSI SGR parsing and escaped HTML output.
//! - [`terminal`] -- fixed-width rendering of panels, tables and markdown.
//! - [`OutputCapture`] -- the line-buffering sink bound to a job's event channel.

pub mod ansi;
mod capture;
pub mod terminal;

pub use capture::OutputCapture;
