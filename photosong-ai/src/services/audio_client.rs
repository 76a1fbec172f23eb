//! HTTP client for music and voice generation services
//!
//! Both services take a JSON body and answer with a WAV file. Request shapes:
//!
//! Music: `{"prompt", "negative_prompt", "duration", "num_inference_steps", "guidance_scale"}`
//!
//! Voice: `{"text"}` where text is the short sung excerpt from [`vocal_text`]

use serde::Serialize;
use std::time::Duration;

use super::prompts::vocal_text;
use crate::audio::{wav::decode_wav, Waveform};
use crate::types::{CollaboratorError, MusicGenerator, MusicRequest, VoiceSynthesizer};

const USER_AGENT: &str = concat!("photosong/", env!("CARGO_PKG_VERSION"));

/// Generation can take minutes on modest GPUs
const HTTP_TIMEOUT: Duration = Duration::from_secs(900);

#[derive(Debug, Serialize)]
struct MusicBody<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    duration: f32,
    num_inference_steps: u32,
    guidance_scale: f32,
}

#[derive(Debug, Serialize)]
struct VoiceBody {
    text: String,
}

/// Client for one audio generation endpoint
#[derive(Debug, Clone)]
pub struct AudioServiceClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl AudioServiceClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_for_wav<B: Serialize + Sync>(&self, body: &B) -> Result<Waveform, CollaboratorError> {
        let response = self.http_client.post(&self.endpoint).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Unavailable(format!(
                "{} returned {}: {}",
                self.endpoint,
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )));
        }

        let bytes = response.bytes().await?;
        let wave = decode_wav(&bytes)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            frames = wave.frames(),
            sample_rate = wave.sample_rate,
            channels = wave.channels,
            "Decoded generated audio"
        );

        if wave.is_empty() {
            return Err(CollaboratorError::InvalidOutput("empty audio".to_string()));
        }
        Ok(wave)
    }
}

#[async_trait::async_trait]
impl MusicGenerator for AudioServiceClient {
    async fn generate(&self, request: &MusicRequest) -> Result<Waveform, CollaboratorError> {
        let body = MusicBody {
            prompt: &request.prompt,
            negative_prompt: &request.negative_prompt,
            duration: request.duration_secs,
            num_inference_steps: request.quality.inference_steps,
            guidance_scale: request.quality.guidance_scale,
        };
        self.post_for_wav(&body).await
    }
}

#[async_trait::async_trait]
impl VoiceSynthesizer for AudioServiceClient {
    async fn synthesize(&self, lyrics: &str) -> Result<Waveform, CollaboratorError> {
        let body = VoiceBody {
            text: vocal_text(lyrics),
        };
        self.post_for_wav(&body).await
    }
}
