//! MIXING phase

use super::phase_audio::GeneratedAudio;
use super::PipelineOrchestrator;
use crate::audio::wav::write_wav;
use crate::audio::{mix, AudioError};
use crate::error::PipelineError;
use chrono::Utc;
use photosong_common::events::SongEvent;
use uuid::Uuid;

/// Final track written to disk
pub(super) struct MixedTrack {
    pub path: String,
    pub vocals_only: bool,
    pub duration_secs: f32,
}

impl PipelineOrchestrator {
    /// Mix on a blocking thread and write `<job_id>_final.wav`
    pub(super) async fn phase_mixing(
        &self,
        job_id: Uuid,
        audio: GeneratedAudio,
    ) -> Result<MixedTrack, PipelineError> {
        tracing::info!(job_id = %job_id, with_music = audio.music.is_some(), "MIXING");

        let params = self.settings.mix.clone();
        let path = self.audio_path(job_id, "final");
        let output_path = path.clone();

        let output = tokio::task::spawn_blocking(move || -> Result<_, AudioError> {
            let output = mix(audio.music.as_ref(), &audio.vocals, &params)?;
            write_wav(&output_path, &output.waveform)?;
            Ok(output)
        })
        .await??;

        if let Some(degraded) = &output.degraded {
            tracing::warn!(job_id = %job_id, "{}", degraded);
            self.event_bus.emit_lossy(SongEvent::MixDegraded {
                job_id,
                reason: degraded.0.clone(),
                timestamp: Utc::now(),
            });
        }

        Ok(MixedTrack {
            path: path.to_string_lossy().into_owned(),
            vocals_only: output.is_vocals_only(),
            duration_secs: output.waveform.duration_secs(),
        })
    }
}
