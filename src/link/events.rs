use std::fmt;
use std::time::Duration;

/// Connection state of the realtime link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    /// Connected with the capture loop running
    Streaming,
}

impl LinkState {
    pub fn is_open(self) -> bool {
        matches!(self, LinkState::Connected | LinkState::Streaming)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

/// Events published to link subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Local link state transition
    StateChanged(LinkState),
    /// Status reported by the service (or "connected"/"disconnected" locally)
    StatusChanged(String),
    TranscriptReceived(String),
    TurnComplete,
    Error(String),
}

/// Configuration for the realtime link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Websocket URL of the realtime service
    pub url: String,
    /// Length of each recording burst
    pub burst_duration: Duration,
    /// Pause after a failed burst before recording again
    pub capture_backoff: Duration,
    /// Buffered events per subscriber before the slowest one lags
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws".to_string(),
            burst_duration: Duration::from_millis(500),
            capture_backoff: Duration::from_millis(500),
            event_capacity: 64,
        }
    }
}
