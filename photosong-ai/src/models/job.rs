//! Song job state machine
//!
//! A job progresses through 8 ordered stages:
//! CREATED → QUEUED → CAPTIONING → SUMMARIZING → WRITING_LYRICS →
//! GENERATING_AUDIO → MIXING → COMPLETED
//!
//! FAILED is absorbing and reachable from every non-terminal stage. Each
//! forward step is paid for with the artifact of the stage being left, and
//! every artifact is written exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Pipeline stage
///
/// Declaration order is pipeline order; `Ord` follows it and FAILED sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStage {
    /// Job persisted, inputs not yet validated
    Created,
    /// Accepted, waiting for a processing slot
    Queued,
    /// Captioning each photo
    Captioning,
    /// Turning captions into a narrative summary
    Summarizing,
    /// Turning the summary into structured lyrics
    WritingLyrics,
    /// Instrumental and vocals generation (concurrent)
    GeneratingAudio,
    /// Combining instrumental and vocals
    Mixing,
    /// Final track available
    Completed,
    /// Stage exhausted primary and fallback, or inputs were invalid
    Failed,
}

impl JobStage {
    /// Stages in pipeline order, excluding FAILED
    pub const PIPELINE: [JobStage; 8] = [
        JobStage::Created,
        JobStage::Queued,
        JobStage::Captioning,
        JobStage::Summarizing,
        JobStage::WritingLyrics,
        JobStage::GeneratingAudio,
        JobStage::Mixing,
        JobStage::Completed,
    ];

    /// Stage following this one on the success path
    pub fn next(self) -> Option<JobStage> {
        match self {
            JobStage::Created => Some(JobStage::Queued),
            JobStage::Queued => Some(JobStage::Captioning),
            JobStage::Captioning => Some(JobStage::Summarizing),
            JobStage::Summarizing => Some(JobStage::WritingLyrics),
            JobStage::WritingLyrics => Some(JobStage::GeneratingAudio),
            JobStage::GeneratingAudio => Some(JobStage::Mixing),
            JobStage::Mixing => Some(JobStage::Completed),
            JobStage::Completed | JobStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }

    /// Client-facing status derived from the stage
    pub fn status(self) -> JobStatus {
        match self {
            JobStage::Created => JobStatus::Created,
            JobStage::Queued => JobStatus::Queued,
            JobStage::Captioning
            | JobStage::Summarizing
            | JobStage::WritingLyrics
            | JobStage::GeneratingAudio
            | JobStage::Mixing => JobStatus::Processing,
            JobStage::Completed => JobStatus::Completed,
            JobStage::Failed => JobStatus::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Created => "CREATED",
            JobStage::Queued => "QUEUED",
            JobStage::Captioning => "CAPTIONING",
            JobStage::Summarizing => "SUMMARIZING",
            JobStage::WritingLyrics => "WRITING_LYRICS",
            JobStage::GeneratingAudio => "GENERATING_AUDIO",
            JobStage::Mixing => "MIXING",
            JobStage::Completed => "COMPLETED",
            JobStage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStage::PIPELINE
            .iter()
            .chain(std::iter::once(&JobStage::Failed))
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown job stage: {}", s))
    }
}

/// Client-facing job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Immutable job inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInputs {
    /// Photo references (URLs or local paths), in submission order
    pub photos: Vec<String>,
    pub genre: String,
    pub mood: String,
}

impl JobInputs {
    /// Check that photos, genre and mood are all present
    pub fn validate(&self) -> Result<(), String> {
        if self.photos.is_empty() {
            return Err("No photos provided".to_string());
        }
        if let Some(index) = self.photos.iter().position(|p| p.trim().is_empty()) {
            return Err(format!("Photo reference {} is blank", index));
        }
        if self.genre.trim().is_empty() {
            return Err("Genre is required".to_string());
        }
        if self.mood.trim().is_empty() {
            return Err("Mood is required".to_string());
        }
        Ok(())
    }
}

/// Stage outputs accumulated over the job's life
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobArtifacts {
    /// Captions of the photos that captioned successfully (may be empty)
    pub captions: Option<Vec<String>>,
    pub summary: Option<String>,
    pub lyrics: Option<String>,
    /// Instrumental WAV; stays `None` when music generation was unavailable
    pub music_path: Option<String>,
    pub vocals_path: Option<String>,
    pub final_audio_path: Option<String>,
    /// Final track contains vocals only
    #[serde(default)]
    pub vocals_only: bool,
}

/// Artifact handed to [`Job::advance`] to leave the current stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageArtifact {
    /// Inputs validated (CREATED → QUEUED)
    Accepted,
    /// Processing slot acquired (QUEUED → CAPTIONING)
    Started,
    /// CAPTIONING → SUMMARIZING
    Captions(Vec<String>),
    /// SUMMARIZING → WRITING_LYRICS
    Summary(String),
    /// WRITING_LYRICS → GENERATING_AUDIO
    Lyrics(String),
    /// GENERATING_AUDIO → MIXING
    Audio {
        music_path: Option<String>,
        vocals_path: String,
    },
    /// MIXING → COMPLETED
    FinalMix { path: String, vocals_only: bool },
}

impl StageArtifact {
    fn kind(&self) -> &'static str {
        match self {
            StageArtifact::Accepted => "accepted",
            StageArtifact::Started => "started",
            StageArtifact::Captions(_) => "captions",
            StageArtifact::Summary(_) => "summary",
            StageArtifact::Lyrics(_) => "lyrics",
            StageArtifact::Audio { .. } => "audio",
            StageArtifact::FinalMix { .. } => "final_mix",
        }
    }
}

/// Rejected state machine operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Job is already terminal ({0})")]
    Terminal(JobStage),

    #[error("Stage {stage} cannot be completed with a {artifact} artifact")]
    UnexpectedArtifact {
        stage: JobStage,
        artifact: &'static str,
    },

    #[error("Artifact {0} was already written")]
    AlreadyWritten(&'static str),

    #[error("Artifact {0} is empty")]
    EmptyArtifact(&'static str),
}

/// Why a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Inputs missing or malformed
    Validation,
    /// Primary collaborator and its fallback both failed
    FallbackExhausted,
    /// Store or filesystem error while running the stage
    Internal,
}

/// Failure record attached to a FAILED job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Stage that was running when the job failed
    pub stage: JobStage,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(stage: JobStage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// Stage transition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: Uuid,
    pub old_stage: JobStage,
    pub new_stage: JobStage,
    pub transitioned_at: DateTime<Utc>,
}

/// Song generation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub inputs: JobInputs,
    pub stage: JobStage,
    pub artifacts: JobArtifacts,
    pub failure_reason: Option<FailureReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in CREATED
    pub fn new(inputs: JobInputs) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            inputs,
            stage: JobStage::Created,
            artifacts: JobArtifacts::default(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.stage.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Record the current stage's artifact and move to the next stage
    ///
    /// On error the job is left untouched.
    pub fn advance(&mut self, artifact: StageArtifact) -> Result<StateTransition, TransitionError> {
        let old_stage = self.stage;
        let new_stage = old_stage.next().ok_or(TransitionError::Terminal(old_stage))?;

        let mut artifacts = self.artifacts.clone();
        match (old_stage, artifact) {
            (JobStage::Created, StageArtifact::Accepted)
            | (JobStage::Queued, StageArtifact::Started) => {}
            (JobStage::Captioning, StageArtifact::Captions(captions)) => {
                write_once(&mut artifacts.captions, "captions", captions)?;
            }
            (JobStage::Summarizing, StageArtifact::Summary(summary)) => {
                write_text(&mut artifacts.summary, "summary", summary)?;
            }
            (JobStage::WritingLyrics, StageArtifact::Lyrics(lyrics)) => {
                write_text(&mut artifacts.lyrics, "lyrics", lyrics)?;
            }
            (JobStage::GeneratingAudio, StageArtifact::Audio { music_path, vocals_path }) => {
                if let Some(path) = music_path {
                    write_text(&mut artifacts.music_path, "music_path", path)?;
                }
                write_text(&mut artifacts.vocals_path, "vocals_path", vocals_path)?;
            }
            (JobStage::Mixing, StageArtifact::FinalMix { path, vocals_only }) => {
                write_text(&mut artifacts.final_audio_path, "final_audio_path", path)?;
                artifacts.vocals_only = vocals_only;
            }
            (stage, other) => {
                return Err(TransitionError::UnexpectedArtifact {
                    stage,
                    artifact: other.kind(),
                });
            }
        }

        self.artifacts = artifacts;
        Ok(self.transition_to(new_stage))
    }

    /// Move to FAILED, keeping every artifact produced so far
    pub fn fail(&mut self, reason: FailureReason) -> Result<StateTransition, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self.stage));
        }
        self.failure_reason = Some(reason);
        Ok(self.transition_to(JobStage::Failed))
    }

    fn transition_to(&mut self, new_stage: JobStage) -> StateTransition {
        let now = Utc::now();
        let transition = StateTransition {
            job_id: self.job_id,
            old_stage: self.stage,
            new_stage,
            transitioned_at: now,
        };
        self.stage = new_stage;
        self.updated_at = now;
        transition
    }

    /// Names of artifacts that should exist for the stage reached but don't
    ///
    /// Empty for every job that was only ever mutated through [`Job::advance`]
    /// and [`Job::fail`].
    pub fn missing_artifacts(&self) -> Vec<&'static str> {
        let reached = match (&self.stage, &self.failure_reason) {
            (JobStage::Failed, Some(reason)) => reason.stage,
            (stage, _) => *stage,
        };

        let a = &self.artifacts;
        let mut missing = Vec::new();
        if reached > JobStage::Captioning && a.captions.is_none() {
            missing.push("captions");
        }
        if reached > JobStage::Summarizing && is_blank(&a.summary) {
            missing.push("summary");
        }
        if reached > JobStage::WritingLyrics && is_blank(&a.lyrics) {
            missing.push("lyrics");
        }
        if reached > JobStage::GeneratingAudio && is_blank(&a.vocals_path) {
            missing.push("vocals_path");
        }
        if self.stage == JobStage::Completed && is_blank(&a.final_audio_path) {
            missing.push("final_audio_path");
        }
        if self.stage != JobStage::Completed && a.final_audio_path.is_some() {
            missing.push("final_audio_path exposed before completion");
        }
        missing
    }

    /// Status snapshot for polling clients
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job_id,
            stage: self.stage,
            status: self.status(),
            failure_reason: self.failure_reason.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Final result, available only once COMPLETED
    pub fn result_view(&self) -> Option<JobResultView> {
        if self.stage != JobStage::Completed {
            return None;
        }
        let a = &self.artifacts;
        Some(JobResultView {
            job_id: self.job_id,
            genre: self.inputs.genre.clone(),
            mood: self.inputs.mood.clone(),
            captions: a.captions.clone().unwrap_or_default(),
            summary: a.summary.clone()?,
            lyrics: a.lyrics.clone()?,
            final_audio_path: a.final_audio_path.clone()?,
            vocals_only: a.vocals_only,
        })
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn write_once<T>(slot: &mut Option<T>, name: &'static str, value: T) -> Result<(), TransitionError> {
    if slot.is_some() {
        return Err(TransitionError::AlreadyWritten(name));
    }
    *slot = Some(value);
    Ok(())
}

fn write_text(slot: &mut Option<String>, name: &'static str, value: String) -> Result<(), TransitionError> {
    if value.trim().is_empty() {
        return Err(TransitionError::EmptyArtifact(name));
    }
    write_once(slot, name, value)
}

/// Status query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: Uuid,
    pub stage: JobStage,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultView {
    pub job_id: Uuid,
    pub genre: String,
    pub mood: String,
    pub captions: Vec<String>,
    pub summary: String,
    pub lyrics: String,
    pub final_audio_path: String,
    pub vocals_only: bool,
}
