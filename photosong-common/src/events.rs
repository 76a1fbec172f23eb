//! Event types and broadcast bus for PhotoSong
//!
//! Events are emitted by the pipeline orchestrator as a job moves through its
//! stages and are fanned out to any number of subscribers (SSE clients, tests).
//! Stage names are carried as strings so this crate does not depend on the
//! job model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Job lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SongEvent {
    /// Job accepted and persisted
    JobSubmitted {
        job_id: Uuid,
        photo_count: usize,
        genre: String,
        mood: String,
        timestamp: DateTime<Utc>,
    },

    /// Job advanced from one stage to the next
    JobStageChanged {
        job_id: Uuid,
        old_stage: String,
        new_stage: String,
        timestamp: DateTime<Utc>,
    },

    /// A collaborator failed and the stage continued with a degraded substitute
    FallbackApplied {
        job_id: Uuid,
        stage: String,
        cause: String,
        timestamp: DateTime<Utc>,
    },

    /// Instrumental could not be mixed in; final track is vocals only
    MixDegraded {
        job_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Job reached COMPLETED
    JobCompleted {
        job_id: Uuid,
        final_audio_path: String,
        vocals_only: bool,
        duration_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Job reached FAILED
    JobFailed {
        job_id: Uuid,
        stage: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl SongEvent {
    /// Event type name (used as the SSE `event:` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            SongEvent::JobSubmitted { .. } => "JobSubmitted",
            SongEvent::JobStageChanged { .. } => "JobStageChanged",
            SongEvent::FallbackApplied { .. } => "FallbackApplied",
            SongEvent::MixDegraded { .. } => "MixDegraded",
            SongEvent::JobCompleted { .. } => "JobCompleted",
            SongEvent::JobFailed { .. } => "JobFailed",
        }
    }

    /// Job the event belongs to
    pub fn job_id(&self) -> Uuid {
        match self {
            SongEvent::JobSubmitted { job_id, .. }
            | SongEvent::JobStageChanged { job_id, .. }
            | SongEvent::FallbackApplied { job_id, .. }
            | SongEvent::MixDegraded { job_id, .. }
            | SongEvent::JobCompleted { job_id, .. }
            | SongEvent::JobFailed { job_id, .. } => *job_id,
        }
    }
}

/// Broadcast bus for [`SongEvent`]s
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SongEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped for slow receivers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SongEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SongEvent,
    ) -> Result<usize, broadcast::error::SendError<SongEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SongEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
