use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::link::LinkConfig;
use crate::session::{MistakePolicy, SessionConfig};

/// Environment variables with this prefix override file settings,
/// e.g. `TUTOR__LINK__URL`
pub const ENV_PREFIX: &str = "TUTOR";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub reading: ReadingConfig,
    pub progression: ProgressionConfig,
    pub link: RealtimeLinkConfig,
    pub nats: NatsConfig,
    pub tutor: TutorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "reading-tutor".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub streak_milestones: Vec<u32>,
    pub mistake_policy: MistakePolicy,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            streak_milestones: vec![5, 10, 20],
            mistake_policy: MistakePolicy::default(),
        }
    }
}

impl ReadingConfig {
    /// Session settings for a new session with a fresh id
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            streak_milestones: self.streak_milestones.clone(),
            mistake_policy: self.mistake_policy,
            ..SessionConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Directory holding the persisted progression record
    pub data_dir: PathBuf,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeLinkConfig {
    pub url: String,
    pub burst_ms: u64,
    pub capture_backoff_ms: u64,
    pub event_capacity: usize,
    /// Sample rate assumed for reply payloads that carry no header
    pub reply_sample_rate: u32,
}

impl Default for RealtimeLinkConfig {
    fn default() -> Self {
        let link = LinkConfig::default();
        Self {
            url: link.url,
            burst_ms: link.burst_duration.as_millis() as u64,
            capture_backoff_ms: link.capture_backoff.as_millis() as u64,
            event_capacity: link.event_capacity,
            reply_sample_rate: 24000,
        }
    }
}

impl RealtimeLinkConfig {
    pub fn to_link_config(&self) -> LinkConfig {
        LinkConfig {
            url: self.url.clone(),
            burst_duration: Duration::from_millis(self.burst_ms),
            capture_backoff: Duration::from_millis(self.capture_backoff_ms),
            event_capacity: self.event_capacity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TutorConfig {
    pub watsonx: WatsonxConfig,
    pub tts: TtsConfig,
    /// Where synthesized narration and reply audio are written
    pub reply_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatsonxConfig {
    pub api_key: String,
    pub url: String,
    pub project_id: String,
    pub model_id: String,
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://us-south.ml.cloud.ibm.com".to_string(),
            project_id: String::new(),
            model_id: "ibm/granite-3-8b-instruct".to_string(),
        }
    }
}

impl WatsonxConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.project_id.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub api_key: String,
    pub url: String,
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://api.us-south.text-to-speech.watson.cloud.ibm.com".to_string(),
            voice: "en-US_AllisonV3Voice".to_string(),
        }
    }
}

impl Config {
    /// Load `path` (extension optional, may be absent) with environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
