//! WAV file I/O
//!
//! Reads any PCM or float WAV hound understands; writes 16-bit PCM so the
//! final track plays everywhere.

use super::{AudioError, Waveform};
use std::io::{Cursor, Read};
use std::path::Path;

/// Read a WAV file from disk
pub fn read_wav(path: impl AsRef<Path>) -> Result<Waveform, AudioError> {
    let reader = hound::WavReader::open(path)?;
    read_samples(reader)
}

/// Decode a WAV held in memory (e.g. an HTTP response body)
pub fn decode_wav(bytes: &[u8]) -> Result<Waveform, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    read_samples(reader)
}

fn read_samples<R: Read>(reader: hound::WavReader<R>) -> Result<Waveform, AudioError> {
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Waveform::new(samples, spec.sample_rate, spec.channels)
}

/// Write a waveform as 16-bit PCM WAV
///
/// Samples outside [-1, 1] are clipped.
pub fn write_wav(path: impl AsRef<Path>, wave: &Waveform) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: wave.channels,
        sample_rate: wave.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in &wave.samples {
        let clipped = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
        writer.write_sample((clipped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let wave = Waveform::new(vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25], 24000, 2).unwrap();

        write_wav(&path, &wave).unwrap();
        let read = read_wav(&path).unwrap();

        assert_eq!(read.sample_rate, 24000);
        assert_eq!(read.channels, 2);
        assert_eq!(read.frames(), 3);
        for (a, b) in wave.samples.iter().zip(read.samples.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_out_of_range_samples_clipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let wave = Waveform::new(vec![3.0, -3.0, f32::NAN], 8000, 1).unwrap();

        write_wav(&path, &wave).unwrap();
        let read = read_wav(&path).unwrap();

        assert!(read.peak() <= 1.0);
        assert_eq!(read.samples[2], 0.0);
    }

    #[test]
    fn test_decode_float_wav_from_memory() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0.1f32, -0.2, 0.3] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let wave = decode_wav(cursor.get_ref()).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.samples, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_wav(b"not a wav file"), Err(AudioError::Wav(_))));
    }
}
