//! Services
//!
//! HTTP clients implementing the collaborator traits in [`crate::types`],
//! the prompts they send, and the pipeline orchestrator that drives them.

pub mod audio_client;
pub mod chat_client;
pub mod pipeline_orchestrator;
pub mod prompts;

pub use audio_client::AudioServiceClient;
pub use chat_client::ChatCompletionClient;
pub use pipeline_orchestrator::{PipelineOrchestrator, PipelineSettings};

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CollaboratorConfig;
use crate::models::LyricsParameters;
use crate::types::{CollaboratorError, Collaborators};

/// Build the collaborator set from configuration
///
/// Anything without an endpoint stays [`crate::types::Unconfigured`] and the
/// pipeline relies on fallbacks for it.
pub fn build_collaborators(
    config: &CollaboratorConfig,
    lyrics_shape: &LyricsParameters,
) -> Result<Collaborators, CollaboratorError> {
    let mut collaborators = Collaborators::unconfigured();

    match &config.llm_url {
        Some(url) => {
            let text = ChatCompletionClient::new(url, &config.llm_model, config.api_key.clone())?
                .with_lyrics_shape(lyrics_shape.clone());
            let caption_model = config
                .caption_model
                .clone()
                .unwrap_or_else(|| config.llm_model.clone());
            let vision =
                ChatCompletionClient::new(url, caption_model, config.api_key.clone())?;

            info!(endpoint = %url, model = %text.model(), caption_model = %vision.model(), "Chat collaborators configured");

            collaborators.captioner = Arc::new(vision);
            let text = Arc::new(text);
            collaborators.summarizer = text.clone();
            collaborators.lyricist = text;
        }
        None => warn!("No chat endpoint configured; captions are skipped and text uses templates"),
    }

    match &config.music_url {
        Some(url) => {
            info!(endpoint = %url, "Music generator configured");
            collaborators.music = Arc::new(AudioServiceClient::new(url)?);
        }
        None => warn!("No music endpoint configured; songs will be vocals only"),
    }

    match &config.voice_url {
        Some(url) => {
            info!(endpoint = %url, "Voice synthesizer configured");
            collaborators.voice = Arc::new(AudioServiceClient::new(url)?);
        }
        None => warn!("No voice endpoint configured; vocals use the fallback tone"),
    }

    Ok(collaborators)
}
