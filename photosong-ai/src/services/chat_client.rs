//! OpenAI-compatible chat completions client
//!
//! One client type serves three collaborators: photo captioning (vision
//! message), narrative summary, and lyrics. Any server exposing
//! `/v1/chat/completions` works (LM Studio, llama.cpp, vLLM, OpenAI).

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use super::prompts::{
    lyrics_user_prompt, summary_user_prompt, CAPTION_PROMPT, LYRICS_SYSTEM_PROMPT,
    SUMMARY_SYSTEM_PROMPT,
};
use crate::models::LyricsParameters;
use crate::types::{Captioner, CollaboratorError, Lyricist, Summarizer};

const USER_AGENT: &str = concat!("photosong/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a single HTTP exchange; stage timeouts are usually tighter
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat completions client bound to one model
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    lyrics_shape: LyricsParameters,
}

impl ChatCompletionClient {
    /// `endpoint` is the full chat completions URL
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            lyrics_shape: LyricsParameters::default(),
        })
    }

    /// Shape requested in the lyrics prompt
    pub fn with_lyrics_shape(mut self, shape: LyricsParameters) -> Self {
        self.lyrics_shape = shape;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: Vec<Value>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CollaboratorError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            stream: false,
        };

        tracing::debug!(model = %self.model, endpoint = %self.endpoint, "Chat completion request");

        let mut builder = self.http_client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Unavailable(format!(
                "chat endpoint returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(CollaboratorError::InvalidOutput(
                "chat completion had no content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait::async_trait]
impl Captioner for ChatCompletionClient {
    async fn caption(&self, photo: &str) -> Result<String, CollaboratorError> {
        let image_url = image_reference(photo).await?;
        let messages = vec![json!({
            "role": "user",
            "content": [
                { "type": "text", "text": CAPTION_PROMPT },
                { "type": "image_url", "image_url": { "url": image_url } },
            ],
        })];
        self.complete(messages, 0.2, 120).await
    }
}

#[async_trait::async_trait]
impl Summarizer for ChatCompletionClient {
    async fn summarize(&self, captions: &[String]) -> Result<String, CollaboratorError> {
        let messages = vec![
            json!({ "role": "system", "content": SUMMARY_SYSTEM_PROMPT }),
            json!({ "role": "user", "content": summary_user_prompt(captions) }),
        ];
        self.complete(messages, 0.7, 256).await
    }
}

#[async_trait::async_trait]
impl Lyricist for ChatCompletionClient {
    async fn write_lyrics(
        &self,
        summary: &str,
        genre: &str,
        mood: &str,
    ) -> Result<String, CollaboratorError> {
        let messages = vec![
            json!({ "role": "system", "content": LYRICS_SYSTEM_PROMPT }),
            json!({
                "role": "user",
                "content": lyrics_user_prompt(summary, genre, mood, &self.lyrics_shape),
            }),
        ];
        self.complete(messages, 0.9, 800).await
    }
}

/// URL the vision model can fetch: remote URLs and data URLs pass through,
/// local files are inlined as base64 data URLs
async fn image_reference(photo: &str) -> Result<String, CollaboratorError> {
    let photo = photo.trim();
    if photo.starts_with("http://") || photo.starts_with("https://") || photo.starts_with("data:")
    {
        return Ok(photo.to_string());
    }

    let path = Path::new(photo);
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        CollaboratorError::InvalidOutput(format!("cannot read photo {}: {}", photo, e))
    })?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", image_mime(path), encoded))
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}
