//! Data models for photosong-ai
//!
//! - Job state machine and artifacts
//! - Generation and mixing parameters

pub mod job;
pub mod parameters;

pub use job::{
    FailureKind, FailureReason, Job, JobArtifacts, JobInputs, JobResultView, JobStage, JobStatus,
    JobStatusView, StageArtifact, StateTransition, TransitionError,
};
pub use parameters::{
    db_to_linear, LyricsParameters, MixParameters, MusicParameters, VoiceParameters,
    MUSIC_CEILING_SECS,
};
