//! Sample rate and channel layout conversion
//!
//! Both tracks are brought to the mix rate and layout before summing.

use super::{AudioError, Waveform};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato
pub struct Resampler;

impl Resampler {
    /// Resample a waveform to `output_rate`
    ///
    /// Returns a copy when the rate already matches.
    pub fn resample(wave: &Waveform, output_rate: u32) -> Result<Waveform, AudioError> {
        if output_rate == 0 {
            return Err(AudioError::Invalid("target sample rate is zero".to_string()));
        }

        if wave.sample_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(wave.clone());
        }

        if wave.is_empty() {
            return Waveform::new(Vec::new(), output_rate, wave.channels);
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            wave.sample_rate, output_rate, wave.channels
        );

        // rubato expects planar input
        let planar_input = Self::deinterleave(&wave.samples, wave.channels);
        let input_frames = planar_input[0].len();

        let mut resampler =
            Self::create_resampler(wave.sample_rate, output_rate, wave.channels, input_frames)?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;

        let interleaved = Self::interleave(planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved.len() / wave.channels as usize
        );

        Waveform::new(interleaved, output_rate, wave.channels)
    }

    /// Whole-buffer polynomial resampler (one chunk covers the entire input)
    fn create_resampler(
        input_rate: u32,
        output_rate: u32,
        channels: u16,
        chunk_size: usize,
    ) -> Result<FastFixedIn<f32>, AudioError> {
        FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            chunk_size,
            channels as usize,
        )
        .map_err(|e| AudioError::Resample(format!("Failed to create resampler: {}", e)))
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, L, R, ...]
    /// Output: [[L, L, L, ...], [R, R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }
        planar
    }

    /// Convert planar samples to interleaved format.
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }
        interleaved
    }
}

/// Convert between mono and stereo
///
/// Mono is duplicated to both sides; stereo is averaged down to mono.
pub fn convert_channels(wave: &Waveform, channels: u16) -> Result<Waveform, AudioError> {
    match (wave.channels, channels) {
        (from, to) if from == to => Ok(wave.clone()),
        (1, 2) => {
            let samples = wave.samples.iter().flat_map(|s| [*s, *s]).collect();
            Waveform::new(samples, wave.sample_rate, 2)
        }
        (2, 1) => {
            let samples = wave
                .samples
                .chunks_exact(2)
                .map(|frame| (frame[0] + frame[1]) * 0.5)
                .collect();
            Waveform::new(samples, wave.sample_rate, 1)
        }
        (1, other) | (2, other) => Err(AudioError::UnsupportedChannels(other)),
        (other, _) => Err(AudioError::UnsupportedChannels(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let planar = Resampler::deinterleave(&interleaved, 2);

        assert_eq!(planar.len(), 2);
        assert_eq!(planar[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(planar[1], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_interleave() {
        let planar = vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]];
        assert_eq!(Resampler::interleave(planar), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_resample_same_rate_is_copy() {
        let wave = Waveform::new(vec![0.1, 0.2, 0.3, 0.4], 44100, 2).unwrap();
        assert_eq!(Resampler::resample(&wave, 44100).unwrap(), wave);
    }

    #[test]
    fn test_resample_changes_length() {
        let samples: Vec<f32> = (0..24000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 24000.0).sin() * 0.5)
            .collect();
        let wave = Waveform::new(samples, 24000, 1).unwrap();

        let out = Resampler::resample(&wave, 48000).unwrap();
        assert_eq!(out.sample_rate, 48000);
        assert_eq!(out.channels, 1);
        let frames = out.frames() as i64;
        assert!((frames - 48000).abs() < 1000, "got {} frames", frames);
    }

    #[test]
    fn test_resample_empty() {
        let wave = Waveform::new(Vec::new(), 24000, 1).unwrap();
        let out = Resampler::resample(&wave, 44100).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.sample_rate, 44100);
    }

    #[test]
    fn test_convert_channels() {
        let mono = Waveform::new(vec![0.2, -0.4], 8000, 1).unwrap();
        let stereo = convert_channels(&mono, 2).unwrap();
        assert_eq!(stereo.samples, vec![0.2, 0.2, -0.4, -0.4]);

        let back = convert_channels(&stereo, 1).unwrap();
        assert_eq!(back.samples, vec![0.2, -0.4]);

        let quad = Waveform::new(vec![0.0; 8], 8000, 4).unwrap();
        assert!(matches!(
            convert_channels(&quad, 2),
            Err(AudioError::UnsupportedChannels(4))
        ));
        assert!(matches!(
            convert_channels(&mono, 6),
            Err(AudioError::UnsupportedChannels(6))
        ));
    }
}
