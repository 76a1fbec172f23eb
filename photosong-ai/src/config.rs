//! Service configuration for photosong-ai
//!
//! Resolution order, highest first:
//! 1. Command-line arguments (handled in `main`)
//! 2. Environment variables (`PHOTOSONG_*`)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! Every TOML key is optional. Example:
//!
//! ```toml
//! port = 5740
//! store = "sqlite"
//!
//! [collaborators]
//! llm_url = "http://localhost:1234/v1/chat/completions"
//! llm_model = "local-model"
//!
//! [mix]
//! music_gain_db = -10.0
//!
//! [jobs]
//! max_concurrent = 2
//! ```

use photosong_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::models::{LyricsParameters, MixParameters, MusicParameters, VoiceParameters};

pub const LLM_URL_ENV: &str = "PHOTOSONG_LLM_URL";
pub const LLM_MODEL_ENV: &str = "PHOTOSONG_LLM_MODEL";
pub const CAPTION_MODEL_ENV: &str = "PHOTOSONG_CAPTION_MODEL";
pub const LLM_API_KEY_ENV: &str = "PHOTOSONG_LLM_API_KEY";
pub const MUSIC_URL_ENV: &str = "PHOTOSONG_MUSIC_URL";
pub const VOICE_URL_ENV: &str = "PHOTOSONG_VOICE_URL";

/// Job store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// `<root>/photosong.db`
    Sqlite,
    /// Process memory, lost on restart
    Memory,
}

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root folder for the database and audio files
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_store")]
    pub store: StoreKind,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub collaborators: CollaboratorConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub mix: MixParameters,

    #[serde(default)]
    pub lyrics: LyricsParameters,

    #[serde(default)]
    pub music: MusicParameters,

    #[serde(default)]
    pub voice: VoiceParameters,

    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// External collaborator endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// OpenAI-compatible chat completions URL (captions, summary, lyrics)
    #[serde(default)]
    pub llm_url: Option<String>,

    /// Text model name
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Vision model for captions (defaults to `llm_model`)
    #[serde(default)]
    pub caption_model: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Instrumental generation endpoint (returns WAV)
    #[serde(default)]
    pub music_url: Option<String>,

    /// Voice synthesis endpoint (returns WAV)
    #[serde(default)]
    pub voice_url: Option<String>,
}

/// Per-stage collaborator timeouts in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_caption_secs")]
    pub caption_secs: u64,
    #[serde(default = "default_summary_secs")]
    pub summary_secs: u64,
    #[serde(default = "default_lyrics_secs")]
    pub lyrics_secs: u64,
    #[serde(default = "default_music_secs")]
    pub music_secs: u64,
    #[serde(default = "default_voice_secs")]
    pub voice_secs: u64,
}

impl TimeoutConfig {
    pub fn caption(&self) -> Duration {
        Duration::from_secs(self.caption_secs)
    }

    pub fn summary(&self) -> Duration {
        Duration::from_secs(self.summary_secs)
    }

    pub fn lyrics(&self) -> Duration {
        Duration::from_secs(self.lyrics_secs)
    }

    pub fn music(&self) -> Duration {
        Duration::from_secs(self.music_secs)
    }

    pub fn voice(&self) -> Duration {
        Duration::from_secs(self.voice_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Jobs allowed in CAPTIONING..MIXING at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl ServiceConfig {
    /// Load from a TOML file, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                photosong_common::config::load_toml_config(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `PHOTOSONG_*` collaborator overrides
    pub fn apply_env_overrides(&mut self) {
        let c = &mut self.collaborators;
        if let Some(v) = env_value(LLM_URL_ENV) {
            c.llm_url = Some(v);
        }
        if let Some(v) = env_value(LLM_MODEL_ENV) {
            c.llm_model = v;
        }
        if let Some(v) = env_value(CAPTION_MODEL_ENV) {
            c.caption_model = Some(v);
        }
        if let Some(v) = env_value(LLM_API_KEY_ENV) {
            c.api_key = Some(v);
        }
        if let Some(v) = env_value(MUSIC_URL_ENV) {
            c.music_url = Some(v);
        }
        if let Some(v) = env_value(VOICE_URL_ENV) {
            c.voice_url = Some(v);
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.jobs.max_concurrent == 0 {
            return Err(Error::Config("jobs.max_concurrent must be at least 1".into()));
        }
        if !matches!(self.mix.channels, 1 | 2) {
            return Err(Error::Config(format!(
                "mix.channels must be 1 or 2, got {}",
                self.mix.channels
            )));
        }
        if self.mix.sample_rate == 0 || self.voice.fallback_sample_rate == 0 {
            return Err(Error::Config("sample rates must be positive".into()));
        }
        if !(self.mix.peak_ceiling > 0.0 && self.mix.peak_ceiling < 1.0) {
            return Err(Error::Config(format!(
                "mix.peak_ceiling must be in (0, 1), got {}",
                self.mix.peak_ceiling
            )));
        }
        if self.mix.max_duration_secs <= 0.0 {
            return Err(Error::Config("mix.max_duration_secs must be positive".into()));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Default value functions
fn default_port() -> u16 {
    5740
}

fn default_store() -> StoreKind {
    StoreKind::Sqlite
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_llm_model() -> String {
    "local-model".to_string()
}

fn default_caption_secs() -> u64 {
    60
}

fn default_summary_secs() -> u64 {
    120
}

fn default_lyrics_secs() -> u64 {
    120
}

fn default_music_secs() -> u64 {
    600
}

fn default_voice_secs() -> u64 {
    300
}

fn default_max_concurrent() -> usize {
    1
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            store: default_store(),
            logging: LoggingConfig::default(),
            collaborators: CollaboratorConfig::default(),
            timeouts: TimeoutConfig::default(),
            mix: MixParameters::default(),
            lyrics: LyricsParameters::default(),
            music: MusicParameters::default(),
            voice: VoiceParameters::default(),
            jobs: JobsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            llm_url: None,
            llm_model: default_llm_model(),
            caption_model: None,
            api_key: None,
            music_url: None,
            voice_url: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            caption_secs: default_caption_secs(),
            summary_secs: default_summary_secs(),
            lyrics_secs: default_lyrics_secs(),
            music_secs: default_music_secs(),
            voice_secs: default_voice_secs(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.jobs.max_concurrent, 1);
        assert_eq!(config.collaborators.llm_model, "local-model");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: ServiceConfig = toml::from_str(
            r#"
            port = 6000
            store = "memory"

            [collaborators]
            music_url = "http://gpu-box:8000/music"

            [timeouts]
            music_secs = 30

            [mix]
            channels = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(
            config.collaborators.music_url.as_deref(),
            Some("http://gpu-box:8000/music")
        );
        assert_eq!(config.timeouts.music(), Duration::from_secs(30));
        assert_eq!(config.timeouts.caption_secs, 60);
        assert_eq!(config.mix.channels, 1);
        assert_eq!(config.mix.sample_rate, 44100);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photosong-ai.toml");
        std::fs::write(&path, "[jobs]\nmax_concurrent = 3\n").unwrap();

        let config = ServiceConfig::load(Some(&path)).unwrap();
        assert_eq!(config.jobs.max_concurrent, 3);
        assert!(ServiceConfig::load(None).is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = ServiceConfig::default();
        config.jobs.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.mix.peak_ceiling = 1.5;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.mix.channels = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(LLM_URL_ENV, "http://llm:1234/v1/chat/completions");
        std::env::set_var(LLM_MODEL_ENV, "  ");
        std::env::set_var(VOICE_URL_ENV, "http://tts:9000/sing");

        let mut config = ServiceConfig::default();
        config.apply_env_overrides();

        std::env::remove_var(LLM_URL_ENV);
        std::env::remove_var(LLM_MODEL_ENV);
        std::env::remove_var(VOICE_URL_ENV);

        assert_eq!(
            config.collaborators.llm_url.as_deref(),
            Some("http://llm:1234/v1/chat/completions")
        );
        // Blank values are ignored
        assert_eq!(config.collaborators.llm_model, "local-model");
        assert_eq!(
            config.collaborators.voice_url.as_deref(),
            Some("http://tts:9000/sing")
        );
    }
}
