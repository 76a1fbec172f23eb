//! Collaborator traits for the song pipeline
//!
//! Each generative stage talks to one external collaborator through a trait
//! so the orchestrator can be driven by HTTP clients in production and by
//! fakes in tests:
//! - [`Captioner`]: photo -> one-line caption
//! - [`Summarizer`]: captions -> family narrative
//! - [`Lyricist`]: narrative + genre + mood -> structured lyrics
//! - [`MusicGenerator`]: prompt -> instrumental waveform
//! - [`VoiceSynthesizer`]: lyrics -> sung vocals waveform

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::audio::{AudioError, Waveform};

// ============================================================================
// Errors
// ============================================================================

/// Collaborator call failure
///
/// Every variant is recoverable at the stage level: the fallback policy
/// decides what to substitute.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// No endpoint configured or service refused the call
    #[error("{0} unavailable")]
    Unavailable(String),

    /// Call exceeded its per-stage timeout
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    /// Call returned something unusable
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("audio decode error: {0}")]
    Audio(#[from] AudioError),
}

// ============================================================================
// Text collaborators
// ============================================================================

#[async_trait::async_trait]
pub trait Captioner: Send + Sync {
    /// Caption one photo (URL, data URL or local path)
    async fn caption(&self, photo: &str) -> Result<String, CollaboratorError>;
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Turn captions into a short narrative paragraph
    async fn summarize(&self, captions: &[String]) -> Result<String, CollaboratorError>;
}

#[async_trait::async_trait]
pub trait Lyricist: Send + Sync {
    /// Write verse/chorus lyrics from the narrative
    async fn write_lyrics(
        &self,
        summary: &str,
        genre: &str,
        mood: &str,
    ) -> Result<String, CollaboratorError>;
}

// ============================================================================
// Audio collaborators
// ============================================================================

/// Sampling quality knobs for instrumental generation
#[derive(Debug, Clone, PartialEq)]
pub struct MusicQuality {
    pub inference_steps: u32,
    pub guidance_scale: f32,
}

/// Instrumental generation request
#[derive(Debug, Clone, PartialEq)]
pub struct MusicRequest {
    pub prompt: String,
    pub negative_prompt: String,
    /// Already clamped to the generative ceiling
    pub duration_secs: f32,
    pub quality: MusicQuality,
}

#[async_trait::async_trait]
pub trait MusicGenerator: Send + Sync {
    async fn generate(&self, request: &MusicRequest) -> Result<Waveform, CollaboratorError>;
}

#[async_trait::async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    /// Sing the lyrics
    async fn synthesize(&self, lyrics: &str) -> Result<Waveform, CollaboratorError>;
}

// ============================================================================
// Unconfigured stand-in
// ============================================================================

/// Collaborator with no endpoint: every call reports `Unavailable`
///
/// Lets the service run end to end on fallbacks alone.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    name: &'static str,
}

impl Unconfigured {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    fn unavailable(&self) -> CollaboratorError {
        CollaboratorError::Unavailable(self.name.to_string())
    }
}

#[async_trait::async_trait]
impl Captioner for Unconfigured {
    async fn caption(&self, _photo: &str) -> Result<String, CollaboratorError> {
        Err(self.unavailable())
    }
}

#[async_trait::async_trait]
impl Summarizer for Unconfigured {
    async fn summarize(&self, _captions: &[String]) -> Result<String, CollaboratorError> {
        Err(self.unavailable())
    }
}

#[async_trait::async_trait]
impl Lyricist for Unconfigured {
    async fn write_lyrics(
        &self,
        _summary: &str,
        _genre: &str,
        _mood: &str,
    ) -> Result<String, CollaboratorError> {
        Err(self.unavailable())
    }
}

#[async_trait::async_trait]
impl MusicGenerator for Unconfigured {
    async fn generate(&self, _request: &MusicRequest) -> Result<Waveform, CollaboratorError> {
        Err(self.unavailable())
    }
}

#[async_trait::async_trait]
impl VoiceSynthesizer for Unconfigured {
    async fn synthesize(&self, _lyrics: &str) -> Result<Waveform, CollaboratorError> {
        Err(self.unavailable())
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// The five collaborators a pipeline run uses
#[derive(Clone)]
pub struct Collaborators {
    pub captioner: Arc<dyn Captioner>,
    pub summarizer: Arc<dyn Summarizer>,
    pub lyricist: Arc<dyn Lyricist>,
    pub music: Arc<dyn MusicGenerator>,
    pub voice: Arc<dyn VoiceSynthesizer>,
}

impl Collaborators {
    /// All collaborators unconfigured
    pub fn unconfigured() -> Self {
        Self {
            captioner: Arc::new(Unconfigured::new("captioner")),
            summarizer: Arc::new(Unconfigured::new("summarizer")),
            lyricist: Arc::new(Unconfigured::new("lyricist")),
            music: Arc::new(Unconfigured::new("music generator")),
            voice: Arc::new(Unconfigured::new("voice synthesizer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_reports_unavailable() {
        let c = Collaborators::unconfigured();
        let err = c.summarizer.summarize(&[]).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(ref n) if n == "summarizer"));
        assert!(c.voice.synthesize("la la").await.is_err());
    }
}
