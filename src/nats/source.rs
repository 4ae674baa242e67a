use anyhow::{Context, Result};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::client::NatsClient;
use super::messages::TranscriptMessage;
use crate::audio::AudioBackend;
use crate::fragments::FragmentSource;

/// Final transcript text for `session_id`, if this message carries one
pub fn fragment_from_transcript(transcript: &TranscriptMessage, session_id: &str) -> Option<String> {
    if transcript.session_id != session_id || transcript.partial {
        return None;
    }

    let text = transcript.text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Speech fragments produced by publishing captured audio to NATS and
/// listening for the STT service's transcripts
pub struct NatsFragmentSource {
    transcript_rx: mpsc::Receiver<String>,
    publish_task: JoinHandle<()>,
    transcript_task: JoinHandle<()>,
}

impl NatsFragmentSource {
    /// Connect, start the backend and begin publishing frames
    pub async fn start(
        nats_url: &str,
        session_id: String,
        mut backend: Box<dyn AudioBackend>,
    ) -> Result<Self> {
        let nats_client = Arc::new(
            NatsClient::connect(nats_url, session_id.clone())
                .await
                .context("Failed to connect to NATS")?,
        );

        let mut subscriber = nats_client
            .subscribe_transcripts()
            .await
            .context("Failed to subscribe to transcripts")?;

        let mut audio_rx = backend
            .start()
            .await
            .context("Failed to start audio capture")?;

        // Spawn audio publishing task
        let publisher = Arc::clone(&nats_client);
        let publish_task = tokio::spawn(async move {
            info!("Audio publishing task started");
            let mut sequence = 0u32;
            let mut format = (16000, 1);

            while let Some(frame) = audio_rx.recv().await {
                format = (frame.sample_rate, frame.channels);
                if let Err(e) = publisher
                    .publish_audio_frame(&frame.to_pcm_bytes(), frame.sample_rate, frame.channels, sequence, false)
                    .await
                {
                    // Keep capturing even if a publish fails
                    error!("Failed to publish audio frame: {:#}", e);
                }
                sequence += 1;
            }

            if let Err(e) = publisher
                .publish_audio_frame(&[], format.0, format.1, sequence, true)
                .await
            {
                error!("Failed to publish final frame marker: {:#}", e);
            }

            if let Err(e) = backend.stop().await {
                error!("Failed to stop audio backend: {:#}", e);
            }
            info!("Audio publishing task stopped");
        });

        // Spawn transcript receiving task
        let (fragment_tx, transcript_rx) = mpsc::channel(100);
        let transcript_task = tokio::spawn(async move {
            info!("Transcript receiving task started");

            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                    Ok(transcript) => {
                        if let Some(text) = fragment_from_transcript(&transcript, &session_id) {
                            info!("Heard: {}", text);
                            if fragment_tx.send(text).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse transcript message: {}", e);
                    }
                }
            }

            info!("Transcript receiving task stopped");
        });

        Ok(Self {
            transcript_rx,
            publish_task,
            transcript_task,
        })
    }

    /// Stop publishing and listening
    pub fn stop(&self) {
        self.publish_task.abort();
        self.transcript_task.abort();
    }
}

impl Drop for NatsFragmentSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait::async_trait]
impl FragmentSource for NatsFragmentSource {
    async fn next_fragment(&mut self) -> Option<String> {
        self.transcript_rx.recv().await
    }
}
