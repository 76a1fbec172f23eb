//! In-memory audio and signal processing
//!
//! Waveforms are interleaved `f32` samples in [-1, 1] with an explicit
//! sample rate and channel count.

pub mod mixer;
pub mod resampler;
pub mod wav;

pub use mixer::{mix, mix_tracks, MixOutput};
pub use resampler::{convert_channels, Resampler};

use thiserror::Error;

/// Audio processing errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// WAV encode/decode error (includes file I/O)
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u16),

    #[error("Invalid waveform: {0}")]
    Invalid(String),
}

/// Interleaved PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Waveform {
    /// Build a waveform, checking that samples split evenly into frames
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::Invalid("sample rate is zero".to_string()));
        }
        if channels == 0 {
            return Err(AudioError::UnsupportedChannels(0));
        }
        if samples.len() % channels as usize != 0 {
            return Err(AudioError::Invalid(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// True when nothing rises above `threshold`
    pub fn is_silent(&self, threshold: f32) -> bool {
        self.peak() < threshold
    }

    /// Mono or stereo, the layouts [`convert_channels`] can conform
    pub fn has_mixable_layout(&self) -> bool {
        matches!(self.channels, 1 | 2)
    }
}

/// Scale samples so the peak lands exactly on `ceiling`
///
/// Non-finite samples are zeroed first. All-zero input is left alone.
pub fn normalize_peak(samples: &mut [f32], ceiling: f32) {
    for s in samples.iter_mut() {
        if !s.is_finite() {
            *s = 0.0;
        }
    }

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }

    let scale = ceiling / peak;
    for s in samples.iter_mut() {
        // Clamp absorbs rounding in the division
        *s = (*s * scale).clamp(-ceiling, ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_shape_checks() {
        assert!(Waveform::new(vec![0.0; 6], 44100, 2).is_ok());
        assert!(Waveform::new(vec![0.0; 5], 44100, 2).is_err());
        assert!(Waveform::new(vec![0.0; 4], 0, 1).is_err());
        assert!(matches!(
            Waveform::new(vec![], 44100, 0),
            Err(AudioError::UnsupportedChannels(0))
        ));
    }

    #[test]
    fn test_frames_and_duration() {
        let wave = Waveform::new(vec![0.0; 48000], 24000, 2).unwrap();
        assert_eq!(wave.frames(), 24000);
        assert!((wave.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_peak_and_silence() {
        let wave = Waveform::new(vec![0.0, -0.4, 0.2, 0.0005], 8000, 1).unwrap();
        assert!((wave.peak() - 0.4).abs() < 1e-6);
        assert!(!wave.is_silent(0.001));

        let quiet = Waveform::new(vec![0.0, 0.0005, -0.0002], 8000, 1).unwrap();
        assert!(quiet.is_silent(0.001));
    }

    #[test]
    fn test_normalize_peak() {
        let mut samples = vec![0.5, -2.0, 1.0];
        normalize_peak(&mut samples, 0.9);
        assert!((samples[1] + 0.9).abs() < 1e-6);
        assert!((samples[0] - 0.225).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_peak_zeroes_non_finite() {
        let mut samples = vec![f32::NAN, f32::INFINITY, 0.5];
        normalize_peak(&mut samples, 0.95);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.0);
        assert!((samples[2] - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_silence_untouched() {
        let mut samples = vec![0.0; 8];
        normalize_peak(&mut samples, 0.95);
        assert!(samples.iter().all(|s| *s == 0.0));
    }
}
