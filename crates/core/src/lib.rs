//! Shared domain types for the ragstream workspace.
//!
//! - [`event`] -- job stream events and their wire format.
//! - [`job`] -- job submission, validation and engine query parameters.
//! - [`progress`] -- engine progress output and the [`progress::ConsoleSink`] trait.
//! - [`error`] -- the workspace-wide [`error::CoreError`].

pub mod error;
pub mod event;
pub mod job;
pub mod progress;
