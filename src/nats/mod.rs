//! Chunked speech fragment source over NATS
//!
//! Captured audio is published as base64 PCM frames; an external STT
//! service transcribes them and publishes transcripts back.

pub mod client;
pub mod messages;
pub mod source;

pub use client::NatsClient;
pub use messages::{AudioFrameMessage, TranscriptMessage};
pub use source::NatsFragmentSource;
