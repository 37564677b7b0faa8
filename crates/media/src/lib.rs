//! Clients for the speech and imaging services used by the upload
//! endpoints.
//!
//! - [`wav`] / [`pcm`] -- decode uploads and convert them to the 16 kHz mono
//!   int16 stream the speech service expects.
//! - [`asr`] -- websocket speech-to-text client.
//! - [`segment`] -- image segmentation over HTTP.
//! - [`vision`] -- image description through a vision chat-completion API.

pub mod asr;
pub mod error;
pub mod pcm;
pub mod segment;
pub mod vision;
pub mod wav;

pub use asr::{SpeechRecognizer, WebSocketRecognizer};
pub use error::MediaError;
pub use segment::{HttpSegmenter, ImageSegmenter, Segmentation, SegmentationParams};
pub use vision::{HttpDescriber, ImageDescriber};
