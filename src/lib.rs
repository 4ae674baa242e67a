pub mod audio;
pub mod config;
pub mod fragments;
pub mod http;
pub mod link;
pub mod matcher;
pub mod nats;
pub mod progression;
pub mod session;
pub mod tutor;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioCapture, AudioFile, AudioFrame,
    AudioSink, AudioSource, BurstRecorder, NullSink, WavDirSink,
};
pub use config::Config;
pub use fragments::{ChannelFragmentSource, FragmentSource, LinkFragmentSource};
pub use http::{create_router, AppState};
pub use link::{LinkConfig, LinkEvent, LinkState, RealtimeLink};
pub use matcher::{is_close_match, normalize_token};
pub use nats::{NatsClient, NatsFragmentSource};
pub use progression::{JsonFileStore, KeyValueStore, MemoryStore, ProgressionStore, RewardCatalog};
pub use session::{MistakePolicy, ReadingEvent, ReadingSession, SessionConfig, SessionState, SessionStats};
pub use tutor::{Narrator, Tone, TutorLoop};
