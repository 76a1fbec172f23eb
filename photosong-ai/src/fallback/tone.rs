//! Audible stand-in for failed voice synthesis

use crate::audio::{AudioError, Waveform};
use crate::models::VoiceParameters;
use std::f32::consts::PI;

/// Mono sine tone at the configured vocals rate
pub fn fallback_tone(params: &VoiceParameters) -> Result<Waveform, AudioError> {
    let frames = (params.tone_duration_secs.max(0.0) * params.fallback_sample_rate as f32) as usize;
    if frames == 0 {
        return Err(AudioError::Invalid("fallback tone has zero length".to_string()));
    }

    let rate = params.fallback_sample_rate as f32;
    let samples = (0..frames)
        .map(|i| (2.0 * PI * params.tone_frequency_hz * i as f32 / rate).sin() * params.tone_amplitude)
        .collect();

    Waveform::new(samples, params.fallback_sample_rate, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tone() {
        let params = VoiceParameters::default();
        let tone = fallback_tone(&params).unwrap();

        assert_eq!(tone.sample_rate, 24000);
        assert_eq!(tone.channels, 1);
        assert_eq!(tone.frames(), 48000);
        assert!(tone.peak() <= 0.1 + 1e-6);
        assert!(!tone.is_silent(params.silence_threshold));
    }

    #[test]
    fn test_zero_length_tone_rejected() {
        let params = VoiceParameters {
            tone_duration_secs: 0.0,
            ..VoiceParameters::default()
        };
        assert!(fallback_tone(&params).is_err());
    }
}
