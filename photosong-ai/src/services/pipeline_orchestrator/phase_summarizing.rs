//! SUMMARIZING phase

use super::PipelineOrchestrator;
use crate::error::PipelineError;
use crate::fallback::attempt;
use crate::models::JobStage;
use uuid::Uuid;

impl PipelineOrchestrator {
    /// Narrative summary of the captions, rule-based when the summarizer fails
    pub(super) async fn phase_summarizing(
        &self,
        job_id: Uuid,
        captions: &[String],
    ) -> Result<String, PipelineError> {
        tracing::info!(job_id = %job_id, captions = captions.len(), "SUMMARIZING");

        let primary = attempt(
            self.settings.timeouts.summary(),
            self.collaborators.summarizer.summarize(captions),
        )
        .await;

        let outcome = self.policy.resolve_summary(primary, captions);
        self.settle(job_id, JobStage::Summarizing, outcome)
    }
}
