use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::file::AudioFile;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration covered by this frame
    pub fn duration_ms(&self) -> u64 {
        let per_channel = self.samples.len() as u64 / self.channels.max(1) as u64;
        per_channel * 1000 / self.sample_rate.max(1) as u64
    }

    /// Samples as little-endian PCM bytes
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will downsample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
    /// Deliver frames at the pace they would be captured live
    pub realtime: bool,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for speech recognition
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
            realtime: true,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations deliver frames on a channel until stopped or exhausted;
/// the channel closing means capture has ended.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// WAV file replayed as if it were being captured
    File(PathBuf),
    /// Endless digital silence (for link testing without a device)
    Silence,
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend based on source and configuration
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::File(path) => {
                let audio = AudioFile::open(&path)
                    .with_context(|| format!("Failed to open capture file {:?}", path))?;
                Ok(Box::new(FileBackend::new(audio, config)))
            }
            AudioSource::Silence => Ok(Box::new(SilenceBackend::new(config))),
        }
    }
}

/// Replays a WAV file as captured frames
pub struct FileBackend {
    audio: Arc<AudioFile>,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(audio: AudioFile, config: AudioBackendConfig) -> Self {
        Self {
            audio: Arc::new(audio),
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(100);
        let audio = Arc::clone(&self.audio);
        let config = self.config.clone();
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        info!("File backend replaying {} ({:.1}s)", audio.path, audio.duration_seconds);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(config.buffer_duration_ms));
            for frame in audio.frames(config.buffer_duration_ms) {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if config.realtime {
                    ticker.tick().await;
                }

                let frame = process_frame(frame, config.target_sample_rate, config.target_channels);
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            capturing.store(false, Ordering::SeqCst);
            debug!("File backend finished");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Produces silent frames until stopped
pub struct SilenceBackend {
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SilenceBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for SilenceBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(100);
        let config = self.config.clone();
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let samples_per_frame = (config.target_sample_rate as u64 * config.buffer_duration_ms / 1000)
            as usize
            * config.target_channels as usize;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(config.buffer_duration_ms));
            let mut timestamp_ms = 0;
            while capturing.load(Ordering::SeqCst) {
                if config.realtime {
                    ticker.tick().await;
                }
                let frame = AudioFrame {
                    samples: vec![0; samples_per_frame],
                    sample_rate: config.target_sample_rate,
                    channels: config.target_channels,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += config.buffer_duration_ms;
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "silence"
    }
}

/// Convert a frame to the target rate and channel layout
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target_sample_rate {
        processed = downsample_frame(processed, target_sample_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample audio frame by decimation
fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    let ratio = frame.sample_rate / target_rate.max(1);
    if ratio <= 1 {
        return frame; // Can't upsample
    }

    let channels = frame.channels.max(1) as usize;
    // Decimate whole interleaved frames so channels stay aligned
    let downsampled: Vec<i16> = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio as usize)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples: downsampled,
        sample_rate: frame.sample_rate / ratio,
        ..frame
    }
}

/// Convert stereo to mono by averaging channels
fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame; // Only support stereo -> mono
    }

    let mono_samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect();

    AudioFrame {
        samples: mono_samples,
        channels: 1,
        ..frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_48k_becomes_mono_16k() {
        let frame = AudioFrame {
            samples: (0..96).map(|i| i as i16).collect(),
            sample_rate: 48000,
            channels: 2,
            timestamp_ms: 0,
        };

        let processed = process_frame(frame, 16000, 1);
        assert_eq!(processed.sample_rate, 16000);
        assert_eq!(processed.channels, 1);
        assert_eq!(processed.samples.len(), 16);
        // First interleaved pair (0, 1) averages to 0, next kept pair is (6, 7)
        assert_eq!(&processed.samples[..2], &[0, 6]);
    }

    #[test]
    fn frame_duration() {
        let frame = AudioFrame {
            samples: vec![0; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 100);
    }
}
