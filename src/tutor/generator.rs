use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::prompt::{Situation, TutorPrompt};

pub const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";
const GENERATION_API_VERSION: &str = "2024-05-01";

/// Tokens are refreshed this long before IBM says they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Prompt → tutor dialogue
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &TutorPrompt) -> Result<String>;
}

/// Canned replies, rotated per situation
#[derive(Default)]
pub struct FallbackGenerator {
    turn: AtomicUsize,
}

const CORRECTIONS: &[&str] = &[
    "Let's try that word again, my child. You're doing great!",
    "Eish! That's a tricky one. Sound it out slowly with me.",
    "Almost! Let's look at that word together.",
];

const CELEBRATIONS: &[&str] = &[
    "Ayoba! You're on fire today!",
    "Look at you go! What a star reader you are!",
    "Sharp sharp! Keep that energy going!",
];

impl FallbackGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, situation: &Situation) -> String {
        let pick = |lines: &[&str]| {
            let turn = self.turn.fetch_add(1, Ordering::Relaxed);
            lines[turn % lines.len()].to_string()
        };

        match situation {
            Situation::Greeting => "Sawubona my child! Let's read together!".to_string(),
            Situation::PassageIntro { .. } => {
                "Hayibo! This looks like an exciting story! Let's read it together!".to_string()
            }
            Situation::Correction { expected, .. } => {
                format!("{} The word is \"{}\".", pick(CORRECTIONS), expected)
            }
            Situation::Streak { streak } => {
                format!("{} That's {} words in a row!", pick(CELEBRATIONS), streak)
            }
            Situation::LevelUp { tier, .. } => {
                format!("Hayibo! You are now a {}! I am so proud of you!", tier)
            }
            Situation::PassageFinished { .. } => {
                "Ayoba! You finished the whole page, my child!".to_string()
            }
            Situation::Conversation { .. } => "Sharp sharp! You're doing wonderfully!".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for FallbackGenerator {
    async fn generate(&self, prompt: &TutorPrompt) -> Result<String> {
        Ok(self.reply(&prompt.situation))
    }
}

/// Sampling parameters forwarded to the generation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub min_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 300,
            min_new_tokens: 10,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            repetition_penalty: 1.1,
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// watsonx.ai text generation
///
/// Exchanges the API key for an IAM bearer token, cached until shortly
/// before it expires.
pub struct WatsonxGenerator {
    client: reqwest::Client,
    api_key: String,
    url: String,
    iam_url: String,
    project_id: String,
    model_id: String,
    parameters: GenerationParameters,
    token: Mutex<Option<CachedToken>>,
}

impl WatsonxGenerator {
    /// Fails if the API key or project id is missing
    pub fn new(api_key: String, url: String, project_id: String, model_id: String) -> Result<Self> {
        if api_key.is_empty() || project_id.is_empty() {
            bail!("watsonx API key and project id required");
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            url: url.trim_end_matches('/').to_string(),
            iam_url: IAM_TOKEN_URL.to_string(),
            project_id,
            model_id,
            parameters: GenerationParameters::default(),
            token: Mutex::new(None),
        })
    }

    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_iam_url(mut self, iam_url: String) -> Self {
        self.iam_url = iam_url;
        self
    }

    async fn access_token(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            expires_in: Option<u64>,
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(&self.iam_url)
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("IAM token request failed")?;

        if !response.status().is_success() {
            bail!("IAM token error {}", response.status());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse IAM token response")?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        info!("Obtained IAM token valid for {:?}", lifetime);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });

        Ok(token.access_token)
    }
}

#[async_trait::async_trait]
impl TextGenerator for WatsonxGenerator {
    async fn generate(&self, prompt: &TutorPrompt) -> Result<String> {
        #[derive(Serialize)]
        struct GenerationRequest<'a> {
            model_id: &'a str,
            project_id: &'a str,
            input: String,
            parameters: &'a GenerationParameters,
        }

        #[derive(Deserialize)]
        struct GenerationResponse {
            #[serde(default)]
            results: Vec<GenerationResult>,
        }

        #[derive(Deserialize)]
        struct GenerationResult {
            #[serde(default)]
            generated_text: String,
        }

        let token = self.access_token().await?;
        debug!("Generating reply for {}", prompt.situation.kind());

        let response = self
            .client
            .post(format!("{}/ml/v1/text/generation", self.url))
            .query(&[("version", GENERATION_API_VERSION)])
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&GenerationRequest {
                model_id: &self.model_id,
                project_id: &self.project_id,
                input: prompt.render(),
                parameters: &self.parameters,
            })
            .send()
            .await
            .context("watsonx generation request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("watsonx generation error {status}: {body}");
        }

        let body: GenerationResponse = response
            .json()
            .await
            .context("Failed to parse watsonx generation response")?;

        let text = body
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            bail!("watsonx returned no text");
        }
        Ok(text)
    }
}
