use anyhow::{bail, Context, Result};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioFrame};

/// Source of fixed-duration recording bursts
///
/// Each call records one burst and returns its encoded bytes. An error means
/// this burst failed; callers may simply try again.
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    async fn record_burst(&self, duration: Duration) -> Result<Vec<u8>>;
}

/// Metadata for a single recorded burst
#[derive(Debug, Clone)]
pub struct BurstMetadata {
    /// Burst number (0-indexed)
    pub burst_index: usize,
    /// Timestamp of the first frame, in milliseconds since capture started
    pub start_ms: u64,
    /// Timestamp of the last frame
    pub end_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

struct BurstState {
    audio_rx: mpsc::Receiver<AudioFrame>,
    /// Frame that opened the next burst while the previous one was closing
    carry: Option<AudioFrame>,
    burst_index: usize,
}

/// Cuts a backend's continuous frame stream into WAV-encoded bursts
///
/// A burst closes at the first frame whose timestamp lies `duration` or more
/// past the burst's first frame; that frame opens the next burst, so no
/// audio falls between bursts.
pub struct BurstRecorder {
    backend: Mutex<Box<dyn AudioBackend>>,
    state: Mutex<BurstState>,
}

impl BurstRecorder {
    /// Start the backend and prepare to cut bursts from it
    pub async fn start(mut backend: Box<dyn AudioBackend>) -> Result<Self> {
        let audio_rx = backend
            .start()
            .await
            .with_context(|| format!("Failed to start {} audio backend", backend.name()))?;

        info!("Burst recorder started on {} backend", backend.name());

        Ok(Self {
            backend: Mutex::new(backend),
            state: Mutex::new(BurstState {
                audio_rx,
                carry: None,
                burst_index: 0,
            }),
        })
    }

    /// Stop the underlying backend
    pub async fn stop(&self) -> Result<()> {
        let mut backend = self.backend.lock().await;
        backend.stop().await
    }

    /// Collect the frames of one burst
    async fn collect(&self, duration: Duration) -> Result<(BurstMetadata, Vec<AudioFrame>)> {
        let mut state = self.state.lock().await;
        let burst_ms = duration.as_millis() as u64;

        let first = match state.carry.take() {
            Some(frame) => frame,
            None => match state.audio_rx.recv().await {
                Some(frame) => frame,
                None => bail!("Audio backend stopped delivering frames"),
            },
        };

        let mut meta = BurstMetadata {
            burst_index: state.burst_index,
            start_ms: first.timestamp_ms,
            end_ms: first.timestamp_ms,
            sample_rate: first.sample_rate,
            channels: first.channels,
            sample_count: first.samples.len(),
        };
        let mut frames = vec![first];

        while let Some(frame) = state.audio_rx.recv().await {
            if frame.timestamp_ms.saturating_sub(meta.start_ms) >= burst_ms {
                state.carry = Some(frame);
                break;
            }
            if frame.sample_rate != meta.sample_rate || frame.channels != meta.channels {
                warn!("Dropping frame with mismatched format inside burst {}", meta.burst_index);
                continue;
            }
            meta.end_ms = frame.timestamp_ms;
            meta.sample_count += frame.samples.len();
            frames.push(frame);
        }

        state.burst_index += 1;
        Ok((meta, frames))
    }
}

#[async_trait::async_trait]
impl AudioCapture for BurstRecorder {
    async fn record_burst(&self, duration: Duration) -> Result<Vec<u8>> {
        let (meta, frames) = self.collect(duration).await?;
        let bytes = encode_wav(&frames, meta.sample_rate, meta.channels)?;

        debug!(
            "Burst {} complete: {:.1}s - {:.1}s ({} samples, {} bytes)",
            meta.burst_index,
            meta.start_ms as f64 / 1000.0,
            meta.end_ms as f64 / 1000.0,
            meta.sample_count,
            bytes.len()
        );

        Ok(bytes)
    }
}

/// Encode frames as an in-memory 16-bit PCM WAV file
pub fn encode_wav(frames: &[AudioFrame], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to start WAV encoding")?;
        for frame in frames {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
        }
        writer.finalize().context("Failed to finalize WAV")?;
    }

    Ok(cursor.into_inner())
}
