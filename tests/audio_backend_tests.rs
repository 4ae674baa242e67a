// Integration tests for audio capture and playback plumbing
//
// A WAV file replayed through the file backend, bursts cut from a frame
// stream, and reply payloads written by the WAV directory sink.

use anyhow::Result;
use reading_tutor::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioCapture, AudioFrame, AudioSink,
    AudioSource, BurstRecorder, RawPcmFormat, WavDirSink,
};
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Backend fed by the test through a channel
struct ChannelBackend {
    frames: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
}

impl ChannelBackend {
    fn new() -> (Self, mpsc::Sender<AudioFrame>) {
        let (tx, rx) = mpsc::channel(100);
        (
            Self {
                frames: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl AudioBackend for ChannelBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        self.frames
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("already started"))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "channel"
    }
}

fn write_wav(path: &Path, sample_rate: u32, channels: u16, seconds: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..sample_rate * channels as u32 * seconds {
        writer.write_sample((i % 100) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn wav_sample_count(bytes: &[u8]) -> Result<(hound::WavSpec, usize)> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    Ok((spec, reader.len() as usize))
}

#[tokio::test]
async fn test_file_backend_delivers_converted_frames() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("mic.wav");
    write_wav(&path, 48000, 2, 1)?;

    let config = AudioBackendConfig {
        realtime: false,
        ..AudioBackendConfig::default()
    };
    let mut backend = AudioBackendFactory::create(AudioSource::File(path), config)?;
    let mut rx = backend.start().await?;

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    // 1 second in 100ms frames, resampled for speech recognition
    assert_eq!(frames.len(), 10);
    assert!(frames.iter().all(|f| f.sample_rate == 16000 && f.channels == 1));
    assert_eq!(frames[0].samples.len(), 1600);
    assert_eq!(frames[9].timestamp_ms, 900);
    assert!(!backend.is_capturing());
    Ok(())
}

#[tokio::test]
async fn test_missing_capture_file_is_an_error() {
    let result = AudioBackendFactory::create(
        AudioSource::File("/nonexistent/mic.wav".into()),
        AudioBackendConfig::default(),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_bursts_cut_by_frame_time() -> Result<()> {
    let (backend, tx) = ChannelBackend::new();
    let recorder = BurstRecorder::start(Box::new(backend)).await?;

    // 1 second of 100ms frames
    for i in 0..10u64 {
        tx.send(AudioFrame {
            samples: vec![i as i16; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: i * 100,
        })
        .await?;
    }
    drop(tx);

    let first = recorder.record_burst(Duration::from_millis(500)).await?;
    let (spec, samples) = wav_sample_count(&first)?;
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(samples, 5 * 1600);

    // The frame that closed the first burst opens the second
    let second = recorder.record_burst(Duration::from_millis(500)).await?;
    let reader = hound::WavReader::new(Cursor::new(&second))?;
    let leading: Vec<i16> = reader.into_samples::<i16>().take(1).collect::<Result<_, _>>()?;
    assert_eq!(leading, vec![5]);

    // Capture has ended
    assert!(recorder.record_burst(Duration::from_millis(500)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_wav_dir_sink_writes_numbered_clips() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sink = WavDirSink::new(temp_dir.path(), RawPcmFormat::default(), false)?;

    // Bare PCM as streamed by the realtime service
    let raw: Vec<u8> = (0..2400i16).flat_map(|s| s.to_le_bytes()).collect();
    sink.play(&raw).await?;
    sink.play(&raw).await?;

    let first = std::fs::read(temp_dir.path().join("reply-000.wav"))?;
    let (spec, samples) = wav_sample_count(&first)?;
    assert_eq!(spec.sample_rate, 24000);
    assert_eq!(samples, 2400);
    assert!(temp_dir.path().join("reply-001.wav").exists());
    Ok(())
}
