//! Job persistence
//!
//! [`JobStore`] is the only shared mutable state between jobs. Stage changes
//! go through [`JobStore::advance`] and [`JobStore::fail`], which apply the
//! state machine and write the artifact together, so a reader never sees a
//! stage without the artifact that paid for it.

pub mod jobs;
pub mod memory;

pub use jobs::SqliteJobStore;
pub use memory::MemoryJobStore;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FailureReason, Job, StageArtifact, StateTransition, TransitionError};

/// Job store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job already exists: {0}")]
    Duplicate(Uuid),

    /// State machine refused the change; nothing was written
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt job record: {0}")]
    Corrupt(String),
}

/// Job persistence
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError>;

    /// Jobs not yet COMPLETED or FAILED, oldest first
    async fn list_unfinished(&self) -> Result<Vec<Job>, StoreError>;

    /// Atomically apply [`Job::advance`] and persist the result
    async fn advance(
        &self,
        job_id: Uuid,
        artifact: StageArtifact,
    ) -> Result<(Job, StateTransition), StoreError>;

    /// Atomically apply [`Job::fail`] and persist the result
    async fn fail(
        &self,
        job_id: Uuid,
        reason: FailureReason,
    ) -> Result<(Job, StateTransition), StoreError>;
}

/// Initialize database connection pool
///
/// Creates the database file and the `jobs` table if missing.
pub async fn init_database_pool(db_path: &Path) -> photosong_common::Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the `jobs` table if it doesn't exist
async fn init_tables(pool: &SqlitePool) -> photosong_common::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            stage TEXT NOT NULL,
            photos TEXT NOT NULL,
            genre TEXT NOT NULL,
            mood TEXT NOT NULL,
            captions TEXT,
            summary TEXT,
            lyrics TEXT,
            music_path TEXT,
            vocals_path TEXT,
            final_audio_path TEXT,
            vocals_only INTEGER NOT NULL DEFAULT 0,
            failure_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (jobs)");

    Ok(())
}
