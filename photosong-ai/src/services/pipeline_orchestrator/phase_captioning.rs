//! CAPTIONING phase
//!
//! Every photo is captioned concurrently under the caption timeout. A photo
//! whose caption fails is dropped without a substitute; the others proceed.
//! An empty caption list is a valid outcome.

use super::PipelineOrchestrator;
use crate::fallback::attempt;
use futures::future::join_all;
use uuid::Uuid;

impl PipelineOrchestrator {
    /// Caption each photo; output keeps submission order minus failures
    pub(super) async fn phase_captioning(&self, job_id: Uuid, photos: &[String]) -> Vec<String> {
        tracing::info!(job_id = %job_id, photos = photos.len(), "CAPTIONING");

        let timeout = self.settings.timeouts.caption();
        let calls = photos
            .iter()
            .map(|photo| attempt(timeout, self.collaborators.captioner.caption(photo)));

        let captions: Vec<String> = join_all(calls)
            .await
            .into_iter()
            .filter_map(|result| self.policy.resolve_caption(result))
            .collect();

        tracing::info!(
            job_id = %job_id,
            captioned = captions.len(),
            dropped = photos.len() - captions.len(),
            "Captioning finished"
        );

        captions
    }
}
