//! Job API handlers
//!
//! POST /jobs, GET /jobs/:id, GET /jobs/:id/result, GET /jobs/:id/audio

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{JobInputs, JobResultView, JobStage, JobStatusView};
use crate::AppState;

/// POST /jobs request
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub mood: String,
}

/// POST /jobs response
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub stage: JobStage,
}

/// POST /jobs
///
/// Returns 202 Accepted with the job ID as soon as the job is stored.
/// Generation continues in the background. A body that is not valid JSON
/// gets the same 400 error shape as invalid inputs.
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let Json(request) = payload?;
    let inputs = JobInputs {
        photos: request.photos,
        genre: request.genre,
        mood: request.mood,
    };

    let job_id = state.orchestrator.submit(inputs).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id,
            stage: JobStage::Created,
        }),
    ))
}

/// GET /jobs/:id
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusView>> {
    let job = state.orchestrator.store().get(job_id).await?;
    Ok(Json(job.status_view()))
}

/// GET /jobs/:id/result
///
/// 409 until the job has COMPLETED.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobResultView>> {
    let job = state.orchestrator.store().get(job_id).await?;
    job.result_view().map(Json).ok_or_else(|| {
        ApiError::Conflict(format!("Job {} has no result yet (stage {})", job_id, job.stage))
    })
}

/// GET /jobs/:id/audio
///
/// Streams the final WAV.
pub async fn get_job_audio(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Response> {
    let job = state.orchestrator.store().get(job_id).await?;
    let path = job.result_view().map(|r| r.final_audio_path).ok_or_else(|| {
        ApiError::Conflict(format!("Job {} has no audio yet (stage {})", job_id, job.stage))
    })?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::error!(job_id = %job_id, path = %path, error = %e, "Final audio missing");
        ApiError::NotFound(format!("Audio for job {}", job_id))
    })?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.wav\"", job_id),
            ),
        ],
        body,
    )
        .into_response())
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:id", get(get_job_status))
        .route("/jobs/:id/result", get(get_job_result))
        .route("/jobs/:id/audio", get(get_job_audio))
}
