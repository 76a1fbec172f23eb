//! In-memory job store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobStore, StoreError};
use crate::models::{FailureReason, Job, StageArtifact, StateTransition};

/// Job store backed by a map; jobs are lost on restart
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Apply `change` to a copy and store it only if the change succeeds
    async fn update<F>(&self, job_id: Uuid, change: F) -> Result<(Job, StateTransition), StoreError>
    where
        F: FnOnce(&mut Job) -> Result<StateTransition, StoreError> + Send,
    {
        let mut jobs = self.jobs.write().await;
        let current = jobs.get(&job_id).ok_or(StoreError::NotFound(job_id))?;

        let mut updated = current.clone();
        let transition = change(&mut updated)?;
        jobs.insert(job_id, updated.clone());

        Ok((updated, transition))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.job_id) {
            return Err(StoreError::Duplicate(job.job_id));
        }
        jobs.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::NotFound(job_id))
    }

    async fn list_unfinished(&self) -> Result<Vec<Job>, StoreError> {
        let mut unfinished: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| !job.is_terminal())
            .cloned()
            .collect();
        unfinished.sort_by_key(|job| job.created_at);
        Ok(unfinished)
    }

    async fn advance(
        &self,
        job_id: Uuid,
        artifact: StageArtifact,
    ) -> Result<(Job, StateTransition), StoreError> {
        self.update(job_id, |job| Ok(job.advance(artifact)?)).await
    }

    async fn fail(
        &self,
        job_id: Uuid,
        reason: FailureReason,
    ) -> Result<(Job, StateTransition), StoreError> {
        self.update(job_id, |job| Ok(job.fail(reason)?)).await
    }
}
