pub mod backend;
pub mod burst;
pub mod decode;
pub mod file;
pub mod sink;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use burst::{encode_wav, AudioCapture, BurstMetadata, BurstRecorder};
pub use decode::{decode_payload, DecodedAudio, RawPcmFormat};
pub use file::AudioFile;
pub use sink::{AudioSink, NullSink, WavDirSink};
