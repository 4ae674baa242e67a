//! Sources of recognized speech fragments
//!
//! The reading session does not care how text was recognized; anything that
//! yields fragments in order can drive it.

use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::link::{LinkEvent, LinkState, RealtimeLink};

/// Ordered stream of recognized text
#[async_trait::async_trait]
pub trait FragmentSource: Send {
    /// Next fragment, or `None` once the source has ended
    async fn next_fragment(&mut self) -> Option<String>;
}

/// Transcripts published by a realtime link
///
/// Ends when the link disconnects.
pub struct LinkFragmentSource {
    events: broadcast::Receiver<LinkEvent>,
}

impl LinkFragmentSource {
    pub fn new(link: &RealtimeLink) -> Self {
        Self {
            events: link.subscribe(),
        }
    }
}

#[async_trait::async_trait]
impl FragmentSource for LinkFragmentSource {
    async fn next_fragment(&mut self) -> Option<String> {
        loop {
            match self.events.recv().await {
                Ok(LinkEvent::TranscriptReceived(text)) => return Some(text),
                Ok(LinkEvent::StateChanged(LinkState::Disconnected)) => return None,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Fragment source fell behind, {} link events lost", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Fragments pushed through a channel (typed input, tests)
pub struct ChannelFragmentSource {
    rx: mpsc::Receiver<String>,
}

impl ChannelFragmentSource {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }
}

#[async_trait::async_trait]
impl FragmentSource for ChannelFragmentSource {
    async fn next_fragment(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
