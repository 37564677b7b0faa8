//! Live delivery of job events to the requesting client.
//!
//! - [`dispatcher`] -- drains a job's event channel onto a client connection.
//! - [`sse`] -- server-sent-events connection and response wiring.

pub mod dispatcher;
pub mod sse;

pub use dispatcher::{ClientConnection, DispatchOutcome, DispatchState, StreamDispatcher, TransportError};
pub use sse::{stream_job, SseConnection};
