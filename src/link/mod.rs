//! Realtime audio link
//!
//! Websocket client that streams microphone bursts to the realtime tutor
//! service and plays back its spoken replies:
//! - Outbound: fixed-duration recording bursts as binary frames
//! - Inbound binary: reply audio, queued and played strictly in order
//! - Inbound text: JSON control messages (`status`, `transcript`,
//!   `turn_complete`, `error`) republished as typed events

mod client;
mod events;
mod messages;
mod playback;

pub use client::RealtimeLink;
pub use events::{LinkConfig, LinkEvent, LinkState};
pub use messages::ControlMessage;
pub use playback::{PlaybackQueue, QueuedSink};
