//! GENERATING_AUDIO phase
//!
//! Instrumental and vocals are requested concurrently and joined before
//! anything is written. Music failure leaves the instrumental absent; vocals
//! failure substitutes the fallback tone.

use super::PipelineOrchestrator;
use crate::audio::wav::{read_wav, write_wav};
use crate::audio::{AudioError, Waveform};
use crate::error::PipelineError;
use crate::fallback::attempt;
use crate::db::StoreError;
use crate::models::{Job, JobStage, MUSIC_CEILING_SECS};
use crate::services::prompts::music_request;
use uuid::Uuid;

/// Waveforms and their on-disk copies
pub(super) struct GeneratedAudio {
    pub music: Option<Waveform>,
    pub vocals: Waveform,
    pub music_path: Option<String>,
    pub vocals_path: String,
}

impl PipelineOrchestrator {
    pub(super) async fn phase_audio(
        &self,
        job_id: Uuid,
        lyrics: &str,
        genre: &str,
        mood: &str,
    ) -> Result<GeneratedAudio, PipelineError> {
        tracing::info!(job_id = %job_id, "GENERATING_AUDIO");

        let request = music_request(lyrics, genre, mood, &self.settings.music);
        tracing::debug!(
            job_id = %job_id,
            prompt = %request.prompt,
            seconds = request.duration_secs,
            "Music request"
        );

        let (music, vocals) = tokio::join!(
            attempt(
                self.settings.timeouts.music(),
                self.collaborators.music.generate(&request)
            ),
            attempt(
                self.settings.timeouts.voice(),
                self.collaborators.voice.synthesize(lyrics)
            ),
        );

        let music = self.settle(job_id, JobStage::GeneratingAudio, self.policy.resolve_music(music))?;
        let vocals = self.settle(job_id, JobStage::GeneratingAudio, self.policy.resolve_vocals(vocals))?;
        let music = music.map(cap_to_ceiling);

        tokio::fs::create_dir_all(&self.settings.audio_dir).await?;
        let music_path = music.as_ref().map(|_| self.audio_path(job_id, "music"));
        let vocals_path = self.audio_path(job_id, "vocals");

        let (music, vocals) = {
            let music_path = music_path.clone();
            let vocals_path = vocals_path.clone();
            tokio::task::spawn_blocking(move || -> Result<_, AudioError> {
                if let (Some(wave), Some(path)) = (&music, &music_path) {
                    write_wav(path, wave)?;
                }
                write_wav(&vocals_path, &vocals)?;
                Ok((music, vocals))
            })
            .await??
        };

        tracing::info!(
            job_id = %job_id,
            music_secs = ?music.as_ref().map(|m| m.duration_secs()),
            vocals_secs = vocals.duration_secs(),
            "Audio generated"
        );

        Ok(GeneratedAudio {
            music,
            vocals,
            music_path: music_path.map(|p| p.to_string_lossy().into_owned()),
            vocals_path: vocals_path.to_string_lossy().into_owned(),
        })
    }

    /// Read back the WAV files of a job that stopped before mixing
    pub(super) async fn reload_audio(&self, job: &Job) -> Result<GeneratedAudio, PipelineError> {
        let vocals_path = job.artifacts.vocals_path.clone().ok_or_else(|| {
            StoreError::Corrupt(format!("Job {} reached {} without vocals", job.job_id, job.stage))
        })?;
        let music_path = job.artifacts.music_path.clone();
        tracing::debug!(job_id = %job.job_id, vocals = %vocals_path, "Reloading generated audio");

        let (music, vocals) = {
            let music_path = music_path.clone();
            let vocals_path = vocals_path.clone();
            tokio::task::spawn_blocking(move || -> Result<_, AudioError> {
                let music = music_path.as_ref().map(read_wav).transpose()?;
                Ok((music, read_wav(&vocals_path)?))
            })
            .await??
        };

        Ok(GeneratedAudio {
            music,
            vocals,
            music_path,
            vocals_path,
        })
    }
}

/// Drop anything past the generative ceiling
fn cap_to_ceiling(mut wave: Waveform) -> Waveform {
    let max_frames = (MUSIC_CEILING_SECS * wave.sample_rate as f32) as usize;
    wave.samples.truncate(max_frames * wave.channels as usize);
    wave
}
