use anyhow::{bail, Context, Result};
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::events::{LinkConfig, LinkEvent, LinkState};
use super::messages::ControlMessage;
use super::playback::{PlaybackQueue, QueuedSink};
use crate::audio::{AudioCapture, AudioSink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

#[derive(Default)]
struct LinkTasks {
    reader: Option<JoinHandle<()>>,
    playback: Option<JoinHandle<()>>,
    capture: Option<JoinHandle<()>>,
}

struct LinkInner {
    config: LinkConfig,
    capture: Arc<dyn AudioCapture>,
    sink: Arc<dyn AudioSink>,
    state: Mutex<LinkState>,
    events: broadcast::Sender<LinkEvent>,
    writer: tokio::sync::Mutex<Option<WsWriter>>,
    /// Bumped on every start and stop; a capture loop runs only while the
    /// generation it was started with is current
    capture_generation: AtomicU64,
    playback: Arc<PlaybackQueue>,
    tasks: Mutex<LinkTasks>,
    bursts_sent: AtomicU64,
}

/// Duplex audio client for the realtime tutor service
///
/// Microphone bursts go out as binary frames in capture order; binary frames
/// coming back are played one at a time in arrival order; text frames carry
/// JSON control messages that are republished as `LinkEvent`s. The link never
/// reconnects by itself, and `connect` has no timeout of its own.
#[derive(Clone)]
pub struct RealtimeLink {
    inner: Arc<LinkInner>,
}

impl RealtimeLink {
    pub fn new(config: LinkConfig, capture: Arc<dyn AudioCapture>, sink: Arc<dyn AudioSink>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(LinkInner {
                config,
                capture,
                sink,
                state: Mutex::new(LinkState::Disconnected),
                events,
                writer: tokio::sync::Mutex::new(None),
                capture_generation: AtomicU64::new(0),
                playback: Arc::new(PlaybackQueue::new()),
                tasks: Mutex::new(LinkTasks::default()),
                bursts_sent: AtomicU64::new(0),
            }),
        }
    }

    /// Receive link events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> LinkState {
        self.inner.state()
    }

    /// Bursts sent since the link was created
    pub fn bursts_sent(&self) -> u64 {
        self.inner.bursts_sent.load(Ordering::SeqCst)
    }

    /// Reply payloads waiting for playback
    pub fn queued_payloads(&self) -> usize {
        self.inner.playback.len()
    }

    /// Open the websocket to the service
    ///
    /// On failure the link returns to `Disconnected`, publishes one `Error`
    /// event and leaves any retry to the caller. Fails while another connect
    /// is still in progress; an already open link is left as it is.
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        {
            let mut state = inner.lock_state();
            match *state {
                LinkState::Disconnected => *state = LinkState::Connecting,
                LinkState::Connecting => bail!("Connect already in progress"),
                open => {
                    debug!("Link already {}", open);
                    return Ok(());
                }
            }
        }
        inner.emit(LinkEvent::StateChanged(LinkState::Connecting));
        info!("Connecting to realtime service: {}", inner.config.url);

        let ws = match connect_async(inner.config.url.as_str()).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                error!("Failed to connect to {}: {}", inner.config.url, e);
                inner.set_state(LinkState::Disconnected);
                inner.emit(LinkEvent::Error(e.to_string()));
                return Err(e).with_context(|| format!("Failed to connect to {}", inner.config.url));
            }
        };

        let (writer, reader) = ws.split();
        *inner.writer.lock().await = Some(writer);

        info!("Connected to realtime service");
        inner.set_state(LinkState::Connected);
        inner.emit(LinkEvent::StatusChanged("connected".to_string()));

        // Inbound traffic is only handled once the link reports itself connected
        {
            let mut tasks = inner.tasks();
            tasks.playback = Some(inner.playback.spawn_worker(Arc::clone(&inner.sink)));
            tasks.reader = Some(tokio::spawn(read_loop(Arc::clone(inner), reader)));
        }

        Ok(())
    }

    /// Start the record → send cycle
    ///
    /// No-op unless the link is connected and not already recording. A
    /// loop left over from an earlier stop finishes its burst before the new
    /// one records anything.
    pub fn start_recording(&self) {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.lock_state();
            match *state {
                LinkState::Connected => {
                    *state = LinkState::Streaming;
                    inner.capture_generation.fetch_add(1, Ordering::SeqCst) + 1
                }
                LinkState::Streaming => return,
                other => {
                    warn!("Cannot start recording while link is {}", other);
                    return;
                }
            }
        };
        inner.emit(LinkEvent::StateChanged(LinkState::Streaming));

        let mut tasks = inner.tasks();
        let previous = tasks.capture.take();
        let loop_inner = Arc::clone(inner);
        tasks.capture = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            capture_loop(loop_inner, generation).await;
        }));
    }

    /// Stop after the burst currently being recorded
    pub fn stop_recording(&self) {
        let inner = &self.inner;
        let mut state = inner.lock_state();
        if *state == LinkState::Streaming {
            inner.capture_generation.fetch_add(1, Ordering::SeqCst);
            info!("Recording stop requested");
            *state = LinkState::Connected;
            drop(state);
            inner.emit(LinkEvent::StateChanged(LinkState::Connected));
        }
    }

    /// Sink that queues audio behind the service's replies
    ///
    /// Anything played through it shares the link's single playback worker,
    /// so it never overlaps a reply. `play` returns once the payload is
    /// queued.
    pub fn playback_sink(&self) -> Arc<dyn AudioSink> {
        Arc::new(QueuedSink::new(Arc::clone(&self.inner.playback)))
    }

    /// Stop capture, drop unplayed replies and close the socket
    ///
    /// Safe to call repeatedly and while already disconnected.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        inner.capture_generation.fetch_add(1, Ordering::SeqCst);

        let discarded = inner.playback.clear();
        if discarded > 0 {
            debug!("Discarded {} queued reply payloads", discarded);
        }

        let capture = {
            let mut tasks = inner.tasks();
            if let Some(task) = tasks.reader.take() {
                task.abort();
            }
            if let Some(task) = tasks.playback.take() {
                task.abort();
            }
            tasks.capture.take()
        };

        if let Some(mut writer) = inner.writer.lock().await.take() {
            if let Err(e) = writer.send(Message::Close(None)).await {
                debug!("Close frame not sent: {}", e);
            }
            let _ = writer.close().await;
        }

        if inner.state() != LinkState::Disconnected {
            info!("Disconnected from realtime service");
            inner.set_state(LinkState::Disconnected);
            inner.emit(LinkEvent::StatusChanged("disconnected".to_string()));
        }

        // The in-flight burst finishes and is dropped unsent
        if let Some(capture) = capture {
            let _ = capture.await;
        }
    }
}

impl LinkInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> LinkState {
        *self.lock_state()
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, LinkTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: LinkState) {
        let changed = {
            let mut state = self.lock_state();
            let changed = *state != next;
            *state = next;
            changed
        };
        if changed {
            self.emit(LinkEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: LinkEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn is_open(&self) -> bool {
        self.state().is_open()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.capture_generation.load(Ordering::SeqCst) == generation
    }

    /// Send one burst; returns false if the channel is not open or the
    /// loop that recorded it has been stopped
    async fn send_burst(&self, bytes: Vec<u8>, generation: u64) -> Result<bool> {
        let mut writer = self.writer.lock().await;
        if !self.is_current(generation) {
            return Ok(false);
        }
        let Some(writer) = writer.as_mut() else {
            return Ok(false);
        };

        let len = bytes.len();
        writer
            .send(Message::Binary(bytes))
            .await
            .context("Failed to send audio burst")?;

        let seq = self.bursts_sent.fetch_add(1, Ordering::SeqCst);
        debug!("Sent burst {} ({} bytes)", seq, len);
        Ok(true)
    }

    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ControlMessage>(text) {
            Ok(ControlMessage::Status { state, message }) => {
                info!("Service status: {} {}", state, message.unwrap_or_default());
                self.emit(LinkEvent::StatusChanged(state));
            }
            Ok(ControlMessage::Transcript { text }) => {
                debug!("Transcript: {}", text);
                self.emit(LinkEvent::TranscriptReceived(text));
            }
            Ok(ControlMessage::TurnComplete) => {
                debug!("Turn complete");
                self.emit(LinkEvent::TurnComplete);
            }
            Ok(ControlMessage::Error { message }) => {
                error!("Service error: {}", message);
                self.emit(LinkEvent::Error(message));
            }
            Err(e) => {
                warn!("Discarding malformed control message: {}", e);
            }
        }
    }

    /// The service went away without `disconnect` being called
    async fn on_channel_closed(&self) {
        self.capture_generation.fetch_add(1, Ordering::SeqCst);
        self.playback.clear();
        self.writer.lock().await.take();

        if let Some(task) = self.tasks().playback.take() {
            task.abort();
        }

        if self.state() != LinkState::Disconnected {
            info!("Realtime service closed the connection");
            self.set_state(LinkState::Disconnected);
            self.emit(LinkEvent::StatusChanged("disconnected".to_string()));
        }
    }
}

async fn read_loop(inner: Arc<LinkInner>, mut reader: WsReader) {
    while let Some(message) = reader.next().await {
        match message {
            Ok(Message::Binary(payload)) => {
                debug!("Received {} bytes of audio", payload.len());
                inner.playback.push(payload);
            }
            Ok(Message::Text(text)) => inner.handle_text(&text),
            Ok(Message::Close(frame)) => {
                debug!("Close frame received: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Realtime link read error: {}", e);
                inner.emit(LinkEvent::Error(e.to_string()));
                break;
            }
        }
    }

    inner.on_channel_closed().await;
}

async fn capture_loop(inner: Arc<LinkInner>, generation: u64) {
    info!("Capture loop {} started", generation);

    while inner.is_current(generation) && inner.is_open() {
        match inner.capture.record_burst(inner.config.burst_duration).await {
            Ok(bytes) => {
                // A burst finished after a stop is the last and goes unsent
                match inner.send_burst(bytes, generation).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => warn!("{:#}", e),
                }
            }
            Err(e) => {
                warn!("Recording burst failed: {:#}", e);
                tokio::time::sleep(inner.config.capture_backoff).await;
            }
        }
    }

    info!("Capture loop {} stopped", generation);
}
