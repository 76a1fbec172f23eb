//! Song pipeline orchestrator
//!
//! Drives one job from CREATED to COMPLETED or FAILED.
//!
//! # Stage Progression
//! CREATED → QUEUED → CAPTIONING → SUMMARIZING → WRITING_LYRICS →
//! GENERATING_AUDIO → MIXING → COMPLETED
//!
//! Each stage is handled by a `phase_*` method in its own file:
//!
//! - **CAPTIONING**: caption every photo concurrently, drop failures
//! - **SUMMARIZING**: narrative summary, template on failure
//! - **WRITING_LYRICS**: verse/chorus lyrics, template on failure
//! - **GENERATING_AUDIO**: instrumental and vocals concurrently, then WAV files
//! - **MIXING**: combine and write the final WAV
//!
//! A semaphore bounds how many jobs run CAPTIONING..MIXING at once; the rest
//! wait in QUEUED. Any stage whose primary and fallback both fail moves the
//! job to FAILED with every earlier artifact kept.
//!
//! `execute` starts from the persisted stage, so a job interrupted by a
//! restart continues where it stopped; `resume_unfinished` picks all of them
//! up at startup.

use chrono::Utc;
use photosong_common::events::{EventBus, SongEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::{ServiceConfig, TimeoutConfig};
use crate::db::{JobStore, StoreError};
use crate::error::PipelineError;
use crate::fallback::{FallbackPolicy, StageOutcome};
use crate::models::{
    FailureReason, Job, JobInputs, JobStage, MixParameters, MusicParameters, StageArtifact,
    TransitionError,
};
use crate::types::Collaborators;

mod phase_audio;
mod phase_captioning;
mod phase_lyrics;
mod phase_mixing;
mod phase_summarizing;

/// Knobs the orchestrator needs beyond its collaborators
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub timeouts: TimeoutConfig,
    pub mix: MixParameters,
    pub music: MusicParameters,
    /// Where `<job_id>_*.wav` files are written
    pub audio_dir: PathBuf,
    pub max_concurrent: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &ServiceConfig, root_folder: &Path) -> Self {
        Self {
            timeouts: config.timeouts.clone(),
            mix: config.mix.clone(),
            music: config.music.clone(),
            audio_dir: root_folder.join("audio"),
            max_concurrent: config.jobs.max_concurrent,
        }
    }
}

/// Pipeline orchestrator service
pub struct PipelineOrchestrator {
    store: Arc<dyn JobStore>,
    event_bus: EventBus,
    collaborators: Collaborators,
    policy: FallbackPolicy,
    settings: PipelineSettings,
    permits: Arc<Semaphore>,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        event_bus: EventBus,
        collaborators: Collaborators,
        policy: FallbackPolicy,
        settings: PipelineSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Self {
            store,
            event_bus,
            collaborators,
            policy,
            settings,
            permits,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Validate, persist and start a job in the background
    ///
    /// Returns as soon as the job is stored. Invalid inputs are rejected here
    /// and nothing is created.
    pub async fn submit(self: &Arc<Self>, inputs: JobInputs) -> Result<Uuid, PipelineError> {
        inputs.validate().map_err(PipelineError::Validation)?;
        let job_id = self.create(inputs).await?;

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.execute(job_id).await {
                tracing::error!(job_id = %job_id, error = %e, "Job could not be driven to a terminal state");
            }
        });

        Ok(job_id)
    }

    /// Persist a new job in CREATED without starting it
    pub async fn create(&self, inputs: JobInputs) -> Result<Uuid, PipelineError> {
        let job = Job::new(inputs);
        self.store.create(&job).await?;

        tracing::info!(
            job_id = %job.job_id,
            photos = job.inputs.photos.len(),
            genre = %job.inputs.genre,
            mood = %job.inputs.mood,
            "Job submitted"
        );

        self.event_bus.emit_lossy(SongEvent::JobSubmitted {
            job_id: job.job_id,
            photo_count: job.inputs.photos.len(),
            genre: job.inputs.genre.clone(),
            mood: job.inputs.mood.clone(),
            timestamp: Utc::now(),
        });

        Ok(job.job_id)
    }

    /// Run a stored job to COMPLETED or FAILED
    ///
    /// A job stored mid-pipeline picks up at its current stage from the
    /// artifacts already persisted. Returns the terminal job. Errs only when
    /// the failure itself cannot be recorded (store unavailable) or the job
    /// was already terminal.
    pub async fn execute(&self, job_id: Uuid) -> Result<Job, PipelineError> {
        match self.drive(job_id).await {
            Ok(job) => Ok(job),
            Err(err) => self.record_failure(job_id, err).await,
        }
    }

    /// Restart every job a previous run left unfinished
    ///
    /// Called once at startup. Each job runs in the background from the
    /// stage it was persisted in. Returns how many were picked up.
    pub async fn resume_unfinished(self: &Arc<Self>) -> Result<usize, PipelineError> {
        let unfinished = self.store.list_unfinished().await?;

        for job in &unfinished {
            let job_id = job.job_id;
            tracing::info!(job_id = %job_id, stage = %job.stage, "Resuming unfinished job");

            let orchestrator = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = orchestrator.execute(job_id).await {
                    tracing::error!(job_id = %job_id, error = %e, "Resumed job could not be driven to a terminal state");
                }
            });
        }

        Ok(unfinished.len())
    }

    async fn drive(&self, job_id: Uuid) -> Result<Job, PipelineError> {
        let mut job = self.store.get(job_id).await?;
        if job.is_terminal() {
            return Err(StoreError::Transition(TransitionError::Terminal(job.stage)).into());
        }
        job.inputs.validate().map_err(PipelineError::Validation)?;

        let mut permit = None;
        let mut generated = None;
        let mut mixed = None;

        while !job.is_terminal() {
            if job.stage != JobStage::Created && permit.is_none() {
                permit = Some(
                    Arc::clone(&self.permits)
                        .acquire_owned()
                        .await
                        .map_err(|e| PipelineError::Task(e.to_string()))?,
                );
            }

            let artifact = match job.stage {
                JobStage::Created => StageArtifact::Accepted,
                JobStage::Queued => StageArtifact::Started,
                JobStage::Captioning => {
                    let captions = self.phase_captioning(job_id, &job.inputs.photos).await;
                    StageArtifact::Captions(captions)
                }
                JobStage::Summarizing => {
                    let captions = stored(&job, job.artifacts.captions.as_deref(), "captions")?;
                    StageArtifact::Summary(self.phase_summarizing(job_id, captions).await?)
                }
                JobStage::WritingLyrics => {
                    let summary = stored(&job, job.artifacts.summary.as_deref(), "summary")?;
                    StageArtifact::Lyrics(
                        self.phase_lyrics(job_id, summary, &job.inputs.genre, &job.inputs.mood)
                            .await?,
                    )
                }
                JobStage::GeneratingAudio => {
                    let lyrics = stored(&job, job.artifacts.lyrics.as_deref(), "lyrics")?;
                    let audio = self
                        .phase_audio(job_id, lyrics, &job.inputs.genre, &job.inputs.mood)
                        .await?;
                    let artifact = StageArtifact::Audio {
                        music_path: audio.music_path.clone(),
                        vocals_path: audio.vocals_path.clone(),
                    };
                    generated = Some(audio);
                    artifact
                }
                JobStage::Mixing => {
                    let audio = match generated.take() {
                        Some(audio) => audio,
                        None => self.reload_audio(&job).await?,
                    };
                    let track = self.phase_mixing(job_id, audio).await?;
                    let artifact = StageArtifact::FinalMix {
                        path: track.path.clone(),
                        vocals_only: track.vocals_only,
                    };
                    mixed = Some(track);
                    artifact
                }
                JobStage::Completed | JobStage::Failed => break,
            };

            job = self.advance(job_id, artifact).await?;
        }

        if let Some(mixed) = mixed {
            tracing::info!(
                job_id = %job_id,
                path = %mixed.path,
                vocals_only = mixed.vocals_only,
                duration_secs = mixed.duration_secs,
                "Job completed"
            );

            self.event_bus.emit_lossy(SongEvent::JobCompleted {
                job_id,
                final_audio_path: mixed.path,
                vocals_only: mixed.vocals_only,
                duration_seconds: mixed.duration_secs.round() as u64,
                timestamp: Utc::now(),
            });
        }

        Ok(job)
    }

    /// Persist the stage's artifact and move on, broadcasting the transition
    async fn advance(&self, job_id: Uuid, artifact: StageArtifact) -> Result<Job, PipelineError> {
        let (job, transition) = self.store.advance(job_id, artifact).await?;

        tracing::debug!(
            job_id = %job_id,
            from = %transition.old_stage,
            to = %transition.new_stage,
            "Stage transition"
        );

        self.event_bus.emit_lossy(SongEvent::JobStageChanged {
            job_id,
            old_stage: transition.old_stage.to_string(),
            new_stage: transition.new_stage.to_string(),
            timestamp: transition.transitioned_at,
        });

        Ok(job)
    }

    /// Move the job to FAILED at whatever stage it reached
    async fn record_failure(&self, job_id: Uuid, err: PipelineError) -> Result<Job, PipelineError> {
        let current = self.store.get(job_id).await?;
        if current.is_terminal() {
            return Err(err);
        }

        let reason = FailureReason::new(current.stage, err.failure_kind(), err.to_string());
        tracing::error!(
            job_id = %job_id,
            stage = %reason.stage,
            kind = ?reason.kind,
            "Job failed: {}",
            reason.message
        );

        let (job, transition) = self.store.fail(job_id, reason.clone()).await?;

        self.event_bus.emit_lossy(SongEvent::JobStageChanged {
            job_id,
            old_stage: transition.old_stage.to_string(),
            new_stage: transition.new_stage.to_string(),
            timestamp: transition.transitioned_at,
        });
        self.event_bus.emit_lossy(SongEvent::JobFailed {
            job_id,
            stage: reason.stage.to_string(),
            reason: reason.message,
            timestamp: transition.transitioned_at,
        });

        Ok(job)
    }

    /// Turn a resolved outcome into the stage value or a fatal error
    fn settle<T>(
        &self,
        job_id: Uuid,
        stage: JobStage,
        outcome: StageOutcome<T>,
    ) -> Result<T, PipelineError> {
        match outcome {
            StageOutcome::Primary(value) => Ok(value),
            StageOutcome::Degraded { value, cause } => {
                self.report_fallback(job_id, stage, &cause);
                Ok(value)
            }
            StageOutcome::Exhausted { reason } => {
                Err(PipelineError::FallbackExhausted { stage, reason })
            }
        }
    }

    /// Broadcast that a stage continued on a substitute
    fn report_fallback(&self, job_id: Uuid, stage: JobStage, cause: &str) {
        tracing::warn!(job_id = %job_id, stage = %stage, "Fallback applied: {}", cause);
        self.event_bus.emit_lossy(SongEvent::FallbackApplied {
            job_id,
            stage: stage.to_string(),
            cause: cause.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn audio_path(&self, job_id: Uuid, suffix: &str) -> PathBuf {
        self.settings
            .audio_dir
            .join(format!("{}_{}.wav", job_id, suffix))
    }
}

/// Artifact an earlier stage must have persisted before `job.stage` can run
fn stored<'a, T: ?Sized>(
    job: &Job,
    value: Option<&'a T>,
    name: &str,
) -> Result<&'a T, PipelineError> {
    value.ok_or_else(|| {
        PipelineError::Store(StoreError::Corrupt(format!(
            "Job {} reached {} without {}",
            job.job_id, job.stage, name
        )))
    })
}
