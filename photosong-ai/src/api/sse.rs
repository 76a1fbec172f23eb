//! Server-Sent Events for job progress

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use photosong_common::sse::create_event_sse_stream;
use serde::Deserialize;
use std::convert::Infallible;
use uuid::Uuid;

/// GET /events query
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    /// Only forward events for this job
    pub job_id: Option<Uuid>,
}

/// GET /events
///
/// Streams JobSubmitted, JobStageChanged, FallbackApplied, MixDegraded,
/// JobCompleted and JobFailed.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_event_sse_stream("photosong-ai", &state.event_bus, query.job_id)
}
