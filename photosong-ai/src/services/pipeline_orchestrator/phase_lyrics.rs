//! WRITING_LYRICS phase

use super::PipelineOrchestrator;
use crate::error::PipelineError;
use crate::fallback::attempt;
use crate::models::JobStage;
use uuid::Uuid;

impl PipelineOrchestrator {
    /// Structured lyrics from the summary, rule-based when the lyricist fails
    pub(super) async fn phase_lyrics(
        &self,
        job_id: Uuid,
        summary: &str,
        genre: &str,
        mood: &str,
    ) -> Result<String, PipelineError> {
        tracing::info!(job_id = %job_id, genre = %genre, mood = %mood, "WRITING_LYRICS");

        let primary = attempt(
            self.settings.timeouts.lyrics(),
            self.collaborators.lyricist.write_lyrics(summary, genre, mood),
        )
        .await;

        let outcome = self.policy.resolve_lyrics(primary, summary, genre, mood);
        self.settle(job_id, JobStage::WritingLyrics, outcome)
    }
}
