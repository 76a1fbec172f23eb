//! SQLite job store
//!
//! One row per job. List and failure fields are stored as JSON text,
//! timestamps as RFC 3339.
//!
//! Stage changes are a read followed by a single guarded `UPDATE ... WHERE
//! stage = <stage read>`: the artifact columns and the new stage land in one
//! statement, and a writer that raced ahead makes the update match no rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{JobStore, StoreError};
use crate::models::{
    FailureReason, Job, JobArtifacts, JobInputs, JobStage, StageArtifact, StateTransition,
};

/// Job store backed by the `jobs` table
#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Wrap a pool whose schema was created by [`super::init_database_pool`]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read, apply `change`, and write back if nobody moved the job meanwhile
    async fn update<F>(&self, job_id: Uuid, change: F) -> Result<(Job, StateTransition), StoreError>
    where
        F: FnOnce(&mut Job) -> Result<StateTransition, StoreError> + Send,
    {
        let mut job = self.get(job_id).await?;
        let expected_stage = job.stage;

        let transition = change(&mut job)?;

        let captions = job
            .artifacts
            .captions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize captions: {}", e)))?;
        let failure_reason = job
            .failure_reason
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize failure reason: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                stage = ?,
                captions = ?,
                summary = ?,
                lyrics = ?,
                music_path = ?,
                vocals_path = ?,
                final_audio_path = ?,
                vocals_only = ?,
                failure_reason = ?,
                updated_at = ?
            WHERE job_id = ? AND stage = ?
            "#,
        )
        .bind(job.stage.as_str())
        .bind(&captions)
        .bind(&job.artifacts.summary)
        .bind(&job.artifacts.lyrics)
        .bind(&job.artifacts.music_path)
        .bind(&job.artifacts.vocals_path)
        .bind(&job.artifacts.final_audio_path)
        .bind(job.artifacts.vocals_only)
        .bind(&failure_reason)
        .bind(job.updated_at.to_rfc3339())
        .bind(job_id.to_string())
        .bind(expected_stage.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "Job {} left stage {} concurrently",
                job_id, expected_stage
            )));
        }

        tracing::debug!(
            job_id = %job_id,
            from = %transition.old_stage,
            to = %transition.new_stage,
            "Job stage persisted"
        );

        Ok((job, transition))
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let photos = serde_json::to_string(&job.inputs.photos)
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize photos: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (job_id, stage, photos, genre, mood, vocals_only, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT(job_id) DO NOTHING
            "#,
        )
        .bind(job.job_id.to_string())
        .bind(job.stage.as_str())
        .bind(&photos)
        .bind(&job.inputs.genre)
        .bind(&job.inputs.mood)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(job.job_id));
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE job_id = ?", JOB_COLUMNS))
        .bind(job_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => job_from_row(&row),
            None => Err(StoreError::NotFound(job_id)),
        }
    }

    async fn list_unfinished(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE stage NOT IN (?, ?) ORDER BY created_at",
            JOB_COLUMNS
        ))
        .bind(JobStage::Completed.as_str())
        .bind(JobStage::Failed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
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

const JOB_COLUMNS: &str = "job_id, stage, photos, genre, mood, captions, summary, lyrics, \
    music_path, vocals_path, final_audio_path, vocals_only, failure_reason, created_at, updated_at";

fn job_from_row(row: &SqliteRow) -> Result<Job, StoreError> {
    let job_id: String = row.try_get("job_id")?;
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|e| StoreError::Corrupt(format!("Invalid job id {}: {}", job_id, e)))?;

    let stage: String = row.try_get("stage")?;
    let stage: JobStage = stage.parse().map_err(StoreError::Corrupt)?;

    let photos: String = row.try_get("photos")?;
    let photos: Vec<String> = serde_json::from_str(&photos)
        .map_err(|e| StoreError::Corrupt(format!("Failed to deserialize photos: {}", e)))?;

    let captions: Option<String> = row.try_get("captions")?;
    let captions: Option<Vec<String>> = captions
        .map(|c| serde_json::from_str(&c))
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("Failed to deserialize captions: {}", e)))?;

    let failure_reason: Option<String> = row.try_get("failure_reason")?;
    let failure_reason: Option<FailureReason> = failure_reason
        .map(|f| serde_json::from_str(&f))
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("Failed to deserialize failure reason: {}", e)))?;

    Ok(Job {
        job_id,
        inputs: JobInputs {
            photos,
            genre: row.try_get("genre")?,
            mood: row.try_get("mood")?,
        },
        stage,
        artifacts: JobArtifacts {
            captions,
            summary: row.try_get("summary")?,
            lyrics: row.try_get("lyrics")?,
            music_path: row.try_get("music_path")?,
            vocals_path: row.try_get("vocals_path")?,
            final_audio_path: row.try_get("final_audio_path")?,
            vocals_only: row.try_get("vocals_only")?,
        },
        failure_reason,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("Failed to parse {}: {}", column, e)))
}
