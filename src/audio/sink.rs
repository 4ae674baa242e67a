use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::backend::AudioFrame;
use super::burst::encode_wav;
use super::decode::{decode_payload, RawPcmFormat};

/// Destination for reply audio
///
/// `play` returns only once the payload has finished playing, so callers can
/// sequence clips without overlap.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, payload: &[u8]) -> Result<()>;
}

/// Discards audio immediately
pub struct NullSink;

#[async_trait::async_trait]
impl AudioSink for NullSink {
    async fn play(&self, payload: &[u8]) -> Result<()> {
        debug!("Discarding {} bytes of audio", payload.len());
        Ok(())
    }
}

/// Writes each reply clip to `<dir>/reply-NNN.wav`
///
/// With `realtime` set, `play` also waits for the clip's duration so replies
/// are paced like live playback.
pub struct WavDirSink {
    dir: PathBuf,
    raw_format: RawPcmFormat,
    realtime: bool,
    clip_index: AtomicUsize,
}

impl WavDirSink {
    pub fn new(dir: impl AsRef<Path>, raw_format: RawPcmFormat, realtime: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create reply directory: {:?}", dir))?;

        info!("Reply audio will be written to {}", dir.display());

        Ok(Self {
            dir,
            raw_format,
            realtime,
            clip_index: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl AudioSink for WavDirSink {
    async fn play(&self, payload: &[u8]) -> Result<()> {
        let audio = decode_payload(payload, self.raw_format)?;
        let index = self.clip_index.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("reply-{:03}.wav", index));

        let duration = audio.duration();
        let frame = AudioFrame {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            timestamp_ms: 0,
        };
        let wav = encode_wav(&[frame], audio.sample_rate, audio.channels)?;
        tokio::fs::write(&path, wav)
            .await
            .with_context(|| format!("Failed to write reply clip {:?}", path))?;

        debug!("Reply clip {} written ({:.2}s)", path.display(), duration.as_secs_f64());

        if self.realtime {
            tokio::time::sleep(duration).await;
        }

        Ok(())
    }
}
