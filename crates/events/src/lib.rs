//! Worker-to-dispatcher plumbing for streamed jobs.
//!
//! - [`channel`] -- unbounded FIFO of [`Event`](ragstream_core::event::Event)s
//!   with a bounded-wait poll.
//! - [`CompletionSignal`] -- one-shot flag the worker sets once its last
//!   event is in the channel.

pub mod channel;
pub mod signal;

pub use channel::{channel, EventReceiver, EventSender, Polled};
pub use signal::CompletionSignal;
