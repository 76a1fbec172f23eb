//! Fallback policy for collaborator stages
//!
//! Every collaborator call is wrapped in a timeout by [`attempt`], then the
//! result is resolved per stage:
//!
//! | Stage      | On failure                          |
//! |------------|-------------------------------------|
//! | Captioning | photo dropped, others proceed       |
//! | Summary    | rule-based summary                  |
//! | Lyrics     | rule-based lyrics                   |
//! | Music      | none, mixing goes vocals-only       |
//! | Vocals     | 440 Hz tone                         |
//!
//! Resolution is pure: it never calls a collaborator itself and always
//! returns a [`StageOutcome`].

pub mod lyrics;
pub mod summary;
pub mod tone;

pub use lyrics::{extract_keywords, is_valid_lyrics, template_lyrics};
pub use summary::{is_valid_summary, template_summary};
pub use tone::fallback_tone;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::audio::Waveform;
use crate::models::{LyricsParameters, VoiceParameters};
use crate::types::CollaboratorError;

/// Result of resolving one stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// Collaborator output accepted
    Primary(T),
    /// Fallback substituted after the primary failed
    Degraded { value: T, cause: String },
    /// Primary and fallback both failed
    Exhausted { reason: String },
}

impl<T> StageOutcome<T> {
    /// The usable value, if any
    pub fn into_value(self) -> Option<T> {
        match self {
            StageOutcome::Primary(value) | StageOutcome::Degraded { value, .. } => Some(value),
            StageOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }
}

/// Rule-based generator failure
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback produced empty output")]
    Empty,

    #[error("fallback unavailable: {0}")]
    Unavailable(String),
}

/// Rule-based text generators used when a text collaborator fails
///
/// Swappable so tests can simulate a fallback that fails too.
pub trait FallbackWriter: Send + Sync {
    fn summary(&self, captions: &[String]) -> Result<String, FallbackError>;

    fn lyrics(
        &self,
        summary: &str,
        genre: &str,
        mood: &str,
        shape: &LyricsParameters,
    ) -> Result<String, FallbackError>;
}

/// Template-based [`FallbackWriter`]
#[derive(Debug, Clone, Default)]
pub struct TemplateWriter;

impl FallbackWriter for TemplateWriter {
    fn summary(&self, captions: &[String]) -> Result<String, FallbackError> {
        non_empty(template_summary(captions))
    }

    fn lyrics(
        &self,
        summary: &str,
        genre: &str,
        mood: &str,
        shape: &LyricsParameters,
    ) -> Result<String, FallbackError> {
        non_empty(template_lyrics(summary, genre, mood, shape))
    }
}

fn non_empty(text: String) -> Result<String, FallbackError> {
    if text.trim().is_empty() {
        Err(FallbackError::Empty)
    } else {
        Ok(text)
    }
}

/// Run a collaborator call under a timeout
///
/// Elapsed time surfaces as [`CollaboratorError::Timeout`].
pub async fn attempt<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout { after: timeout }),
    }
}

/// Per-stage fallback decisions
#[derive(Clone)]
pub struct FallbackPolicy {
    writer: Arc<dyn FallbackWriter>,
    lyrics: LyricsParameters,
    voice: VoiceParameters,
}

impl FallbackPolicy {
    pub fn new(lyrics: LyricsParameters, voice: VoiceParameters) -> Self {
        Self {
            writer: Arc::new(TemplateWriter),
            lyrics,
            voice,
        }
    }

    /// Replace the rule-based text generators
    pub fn with_writer(mut self, writer: Arc<dyn FallbackWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn voice_parameters(&self) -> &VoiceParameters {
        &self.voice
    }

    pub fn lyrics_parameters(&self) -> &LyricsParameters {
        &self.lyrics
    }

    /// Keep a caption only if the call succeeded with non-blank text
    pub fn resolve_caption(&self, attempt: Result<String, CollaboratorError>) -> Option<String> {
        match attempt {
            Ok(caption) => {
                let caption = caption.trim();
                if caption.is_empty() {
                    debug!("Dropping blank caption");
                    None
                } else {
                    Some(caption.to_string())
                }
            }
            Err(e) => {
                debug!("Dropping failed caption: {}", e);
                None
            }
        }
    }

    pub fn resolve_summary(
        &self,
        attempt: Result<String, CollaboratorError>,
        captions: &[String],
    ) -> StageOutcome<String> {
        let cause = match attempt {
            Ok(text) if is_valid_summary(text.trim()) => {
                return StageOutcome::Primary(text.trim().to_string())
            }
            Ok(_) => "summary failed quality check".to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Summarizer failed ({}), using rule-based summary", cause);
        match self.writer.summary(captions) {
            Ok(value) => StageOutcome::Degraded { value, cause },
            Err(e) => StageOutcome::Exhausted {
                reason: format!("{}; fallback: {}", cause, e),
            },
        }
    }

    pub fn resolve_lyrics(
        &self,
        attempt: Result<String, CollaboratorError>,
        summary: &str,
        genre: &str,
        mood: &str,
    ) -> StageOutcome<String> {
        let cause = match attempt {
            Ok(text) if is_valid_lyrics(text.trim()) => {
                return StageOutcome::Primary(text.trim().to_string())
            }
            Ok(_) => "lyrics failed quality check".to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Lyricist failed ({}), using rule-based lyrics", cause);
        match self.writer.lyrics(summary, genre, mood, &self.lyrics) {
            Ok(value) => StageOutcome::Degraded { value, cause },
            Err(e) => StageOutcome::Exhausted {
                reason: format!("{}; fallback: {}", cause, e),
            },
        }
    }

    /// Music has no substitute: failure degrades to no instrumental
    pub fn resolve_music(
        &self,
        attempt: Result<Waveform, CollaboratorError>,
    ) -> StageOutcome<Option<Waveform>> {
        match attempt {
            Ok(wave) if wave.is_empty() => StageOutcome::Degraded {
                value: None,
                cause: "instrumental is empty".to_string(),
            },
            Ok(wave) if !wave.has_mixable_layout() => StageOutcome::Degraded {
                value: None,
                cause: format!("instrumental has {} channels", wave.channels),
            },
            Ok(wave) => StageOutcome::Primary(Some(wave)),
            Err(e) => {
                warn!("Music generation failed: {}", e);
                StageOutcome::Degraded {
                    value: None,
                    cause: e.to_string(),
                }
            }
        }
    }

    /// Silent, unmixable or failed vocals become the fallback tone
    pub fn resolve_vocals(
        &self,
        attempt: Result<Waveform, CollaboratorError>,
    ) -> StageOutcome<Waveform> {
        let cause = match attempt {
            Ok(wave) if !wave.has_mixable_layout() => {
                format!("synthesized vocals have {} channels", wave.channels)
            }
            Ok(wave) if wave.is_silent(self.voice.silence_threshold) => {
                "synthesized vocals are silent".to_string()
            }
            Ok(wave) => return StageOutcome::Primary(wave),
            Err(e) => e.to_string(),
        };

        warn!("Voice synthesis failed ({}), using fallback tone", cause);
        match fallback_tone(&self.voice) {
            Ok(value) => StageOutcome::Degraded { value, cause },
            Err(e) => StageOutcome::Exhausted {
                reason: format!("{}; fallback: {}", cause, e),
            },
        }
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(LyricsParameters::default(), VoiceParameters::default())
    }
}
