use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

use super::voice::{ProsodyTable, Tone};

/// Text + tone → audio payload
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, tone: Tone) -> Result<Vec<u8>>;
}

/// Watson Text to Speech over its REST API
pub struct WatsonSynthesizer {
    client: reqwest::Client,
    api_key: String,
    url: String,
    voice: String,
    prosody: ProsodyTable,
}

impl WatsonSynthesizer {
    /// Fails if the API key is missing
    pub fn new(api_key: String, url: String, voice: String) -> Result<Self> {
        if api_key.is_empty() {
            bail!("Watson TTS API key required");
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            url: url.trim_end_matches('/').to_string(),
            voice,
            prosody: ProsodyTable::standard(),
        })
    }

    pub fn with_prosody(mut self, prosody: ProsodyTable) -> Self {
        self.prosody = prosody;
        self
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for WatsonSynthesizer {
    async fn synthesize(&self, text: &str, tone: Tone) -> Result<Vec<u8>> {
        #[derive(Serialize)]
        struct SynthesizeRequest<'a> {
            text: &'a str,
        }

        let ssml = self.prosody.render_ssml(text, tone);
        debug!("Synthesizing {} chars ({})", text.len(), tone);

        let response = self
            .client
            .post(format!("{}/v1/synthesize", self.url))
            .query(&[("voice", self.voice.as_str())])
            .basic_auth("apikey", Some(&self.api_key))
            .header("Accept", "audio/mp3")
            .json(&SynthesizeRequest { text: &ssml })
            .send()
            .await
            .context("Watson TTS request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Watson TTS error {status}: {body}");
        }

        let audio = response
            .bytes()
            .await
            .context("Failed to read Watson TTS audio")?;
        Ok(audio.to_vec())
    }
}
