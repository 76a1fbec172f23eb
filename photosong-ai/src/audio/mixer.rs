//! Instrumental + vocals mixer
//!
//! Pure and deterministic: the same inputs and parameters always produce the
//! same samples. Output length follows the vocals, capped at
//! `max_duration_secs`. The instrumental is looped or truncated to fit.

use super::{convert_channels, normalize_peak, AudioError, Resampler, Waveform};
use crate::error::MixingDegraded;
use crate::models::MixParameters;
use tracing::{debug, warn};

/// Mixer result
#[derive(Debug, Clone)]
pub struct MixOutput {
    pub waveform: Waveform,
    /// Set when the instrumental was dropped and vocals carry the track alone
    pub degraded: Option<MixingDegraded>,
}

impl MixOutput {
    pub fn is_vocals_only(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Mix vocals over an optional instrumental
///
/// A missing or unusable instrumental degrades to vocals only. Errors only
/// when the vocals themselves cannot be brought to the output format.
pub fn mix(
    music: Option<&Waveform>,
    vocals: &Waveform,
    params: &MixParameters,
) -> Result<MixOutput, AudioError> {
    let reason = match music {
        None => "instrumental unavailable".to_string(),
        Some(music) => match mix_tracks(music, vocals, params) {
            Ok(waveform) => {
                return Ok(MixOutput {
                    waveform,
                    degraded: None,
                })
            }
            Err(e) => {
                warn!("Mixing failed, keeping vocals only: {}", e);
                e.to_string()
            }
        },
    };

    let waveform = vocals_only(vocals, params)?;
    Ok(MixOutput {
        waveform,
        degraded: Some(MixingDegraded(reason)),
    })
}

/// Sum gained instrumental and vocals, then peak-normalize
pub fn mix_tracks(
    music: &Waveform,
    vocals: &Waveform,
    params: &MixParameters,
) -> Result<Waveform, AudioError> {
    check_params(params)?;

    let vocals = conform(vocals, params)?;
    let music = conform(music, params)?;

    if vocals.is_empty() {
        return Err(AudioError::Invalid("vocals are empty".to_string()));
    }
    if music.is_empty() {
        return Err(AudioError::Invalid("instrumental is empty".to_string()));
    }

    let out_frames = vocals.frames().min(params.max_frames());
    let out_len = out_frames * params.channels as usize;
    let music_gain = params.music_gain();
    let vocals_gain = params.vocals_gain();

    debug!(
        "Mixing {} frames (music {} frames, gains {:.3}/{:.3})",
        out_frames,
        music.frames(),
        music_gain,
        vocals_gain
    );

    // music.samples.len() is a whole number of frames, so the modulo keeps channels aligned
    let music_len = music.samples.len();
    let mut mixed: Vec<f32> = (0..out_len)
        .map(|i| {
            let m = finite_or_zero(music.samples[i % music_len]);
            let v = finite_or_zero(vocals.samples[i]);
            m * music_gain + v * vocals_gain
        })
        .collect();

    normalize_peak(&mut mixed, params.peak_ceiling);

    Waveform::new(mixed, params.sample_rate, params.channels)
}

/// Vocals alone in the output format, capped and peak-limited
fn vocals_only(vocals: &Waveform, params: &MixParameters) -> Result<Waveform, AudioError> {
    check_params(params)?;

    let mut wave = conform(vocals, params)?;
    wave.samples
        .truncate(params.max_frames() * params.channels as usize);
    normalize_peak(&mut wave.samples, params.peak_ceiling);
    Ok(wave)
}

fn conform(wave: &Waveform, params: &MixParameters) -> Result<Waveform, AudioError> {
    let converted = convert_channels(wave, params.channels)?;
    Resampler::resample(&converted, params.sample_rate)
}

fn check_params(params: &MixParameters) -> Result<(), AudioError> {
    if !(params.peak_ceiling > 0.0 && params.peak_ceiling <= 1.0) {
        return Err(AudioError::Invalid(format!(
            "peak ceiling {} outside (0, 1]",
            params.peak_ceiling
        )));
    }
    if !matches!(params.channels, 1 | 2) {
        return Err(AudioError::UnsupportedChannels(params.channels));
    }
    if params.sample_rate == 0 {
        return Err(AudioError::Invalid("output sample rate is zero".to_string()));
    }
    Ok(())
}

fn finite_or_zero(s: f32) -> f32 {
    if s.is_finite() {
        s
    } else {
        0.0
    }
}
