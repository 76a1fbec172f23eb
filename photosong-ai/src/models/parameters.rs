//! Generation and mixing parameters
//!
//! All structs deserialize from the matching TOML config section with every
//! field optional.

use serde::{Deserialize, Serialize};

/// Generative ceiling of the music collaborator, in seconds
pub const MUSIC_CEILING_SECS: f32 = 47.0;

/// Parameters for combining instrumental and vocals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixParameters {
    /// Gain applied to the instrumental bed (default: -8 dB)
    #[serde(default = "default_music_gain_db")]
    pub music_gain_db: f32,

    /// Gain applied to the vocals (default: +2 dB)
    #[serde(default = "default_vocals_gain_db")]
    pub vocals_gain_db: f32,

    /// Output sample rate (default: 44100 Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output channels, 1 or 2 (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Longest final track in seconds (default: 47)
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f32,

    /// Peak the normalized mix lands on, as a fraction of full scale (default: 0.95)
    #[serde(default = "default_peak_ceiling")]
    pub peak_ceiling: f32,
}

/// Rule-based lyrics shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsParameters {
    /// Lines per verse (default: 4)
    #[serde(default = "default_lines_per_verse")]
    pub lines_per_verse: usize,

    /// Number of verses (default: 2)
    #[serde(default = "default_num_verses")]
    pub num_verses: usize,
}

/// Instrumental generation request settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicParameters {
    /// Requested length in seconds, clamped to [`MUSIC_CEILING_SECS`] (default: 30)
    #[serde(default = "default_music_seconds")]
    pub seconds: f32,

    /// Diffusion steps (default: 150)
    #[serde(default = "default_inference_steps")]
    pub inference_steps: u32,

    /// Classifier-free guidance scale (default: 7.0)
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
}

/// Vocals fallback tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    /// Sample rate of the fallback tone (default: 24000 Hz)
    #[serde(default = "default_voice_sample_rate")]
    pub fallback_sample_rate: u32,

    /// Tone frequency (default: 440 Hz)
    #[serde(default = "default_tone_frequency_hz")]
    pub tone_frequency_hz: f32,

    /// Tone length (default: 2.0 s)
    #[serde(default = "default_tone_duration_secs")]
    pub tone_duration_secs: f32,

    /// Tone amplitude (default: 0.1)
    #[serde(default = "default_tone_amplitude")]
    pub tone_amplitude: f32,

    /// Peak below which synthesized vocals count as silent (default: 0.001)
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
}

impl MixParameters {
    /// Linear multiplier for `music_gain_db`
    pub fn music_gain(&self) -> f32 {
        db_to_linear(self.music_gain_db)
    }

    /// Linear multiplier for `vocals_gain_db`
    pub fn vocals_gain(&self) -> f32 {
        db_to_linear(self.vocals_gain_db)
    }

    /// Output frame cap derived from `max_duration_secs`
    pub fn max_frames(&self) -> usize {
        (self.max_duration_secs.max(0.0) * self.sample_rate as f32) as usize
    }
}

impl MusicParameters {
    /// Duration actually requested from the music collaborator
    pub fn requested_seconds(&self) -> f32 {
        self.seconds.clamp(1.0, MUSIC_CEILING_SECS)
    }
}

/// Convert decibels to a linear gain: `10^(db/20)`
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

// Default value functions
fn default_music_gain_db() -> f32 {
    -8.0
}

fn default_vocals_gain_db() -> f32 {
    2.0
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    2
}

fn default_max_duration_secs() -> f32 {
    MUSIC_CEILING_SECS
}

fn default_peak_ceiling() -> f32 {
    0.95
}

fn default_lines_per_verse() -> usize {
    4
}

fn default_num_verses() -> usize {
    2
}

fn default_music_seconds() -> f32 {
    30.0
}

fn default_inference_steps() -> u32 {
    150
}

fn default_guidance_scale() -> f32 {
    7.0
}

fn default_voice_sample_rate() -> u32 {
    24_000
}

fn default_tone_frequency_hz() -> f32 {
    440.0
}

fn default_tone_duration_secs() -> f32 {
    2.0
}

fn default_tone_amplitude() -> f32 {
    0.1
}

fn default_silence_threshold() -> f32 {
    0.001
}

impl Default for MixParameters {
    fn default() -> Self {
        Self {
            music_gain_db: default_music_gain_db(),
            vocals_gain_db: default_vocals_gain_db(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            max_duration_secs: default_max_duration_secs(),
            peak_ceiling: default_peak_ceiling(),
        }
    }
}

impl Default for LyricsParameters {
    fn default() -> Self {
        Self {
            lines_per_verse: default_lines_per_verse(),
            num_verses: default_num_verses(),
        }
    }
}

impl Default for MusicParameters {
    fn default() -> Self {
        Self {
            seconds: default_music_seconds(),
            inference_steps: default_inference_steps(),
            guidance_scale: default_guidance_scale(),
        }
    }
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            fallback_sample_rate: default_voice_sample_rate(),
            tone_frequency_hz: default_tone_frequency_hz(),
            tone_duration_secs: default_tone_duration_secs(),
            tone_amplitude: default_tone_amplitude(),
            silence_threshold: default_silence_threshold(),
        }
    }
}
