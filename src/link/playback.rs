use anyhow::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::AudioSink;

/// FIFO of reply payloads waiting to be played
///
/// A single worker drains the queue, playing each payload to completion
/// before taking the next.
#[derive(Default)]
pub struct PlaybackQueue {
    pending: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: Vec<u8>) {
        self.lock().push_back(payload);
        self.notify.notify_one();
    }

    /// Drop everything not yet played; returns how many payloads were discarded
    pub fn clear(&self) -> usize {
        let mut pending = self.lock();
        let discarded = pending.len();
        pending.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn pop(&self) -> Option<Vec<u8>> {
        self.lock().pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the worker that plays queued payloads through `sink`
    pub fn spawn_worker(self: &Arc<Self>, sink: Arc<dyn AudioSink>) -> JoinHandle<()> {
        let queue = Arc::clone(self);

        tokio::spawn(async move {
            info!("Playback worker started");
            loop {
                let Some(payload) = queue.pop() else {
                    queue.notify.notified().await;
                    continue;
                };

                debug!("Playing {} bytes", payload.len());
                if let Err(e) = sink.play(&payload).await {
                    warn!("Playback failed, skipping payload: {:#}", e);
                }
            }
        })
    }
}

/// `AudioSink` that hands payloads to a playback queue instead of playing them
pub struct QueuedSink {
    queue: Arc<PlaybackQueue>,
}

impl QueuedSink {
    pub fn new(queue: Arc<PlaybackQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait::async_trait]
impl AudioSink for QueuedSink {
    async fn play(&self, payload: &[u8]) -> Result<()> {
        self.queue.push(payload.to_vec());
        Ok(())
    }
}
