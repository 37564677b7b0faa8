//! Question-answering engine adapters.
//!
//! The engine owns a [`Console`] it prints progress to; callers redirect
//! that console for the duration of a query to observe the output. The
//! production engine is [`SubprocessEngine`], which drives an external
//! program over stdin/stdout. [`GraphProbe`] verifies graph database
//! credentials before a session is created.

pub mod console;
pub mod engine;
pub mod graph;
pub mod subprocess;

pub use console::{Console, LogSink, RedirectGuard};
pub use engine::{EngineError, QueryEngine};
pub use graph::{GraphError, GraphProbe, Neo4jHttpProbe};
pub use subprocess::{SubprocessConfig, SubprocessEngine};
