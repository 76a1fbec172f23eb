//! SQLite job store tests
//!
//! Each test gets its own database file; `sqlite::memory:` pools hand every
//! connection a separate database.

use photosong_ai::db::{init_database_pool, JobStore, SqliteJobStore, StoreError};
use photosong_ai::models::{
    FailureKind, FailureReason, Job, JobInputs, JobStage, StageArtifact, TransitionError,
};
use std::sync::Arc;
use uuid::Uuid;

async fn create_store() -> (SqliteJobStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database_pool(&dir.path().join("photosong.db"))
        .await
        .unwrap();
    (SqliteJobStore::new(pool), dir)
}

fn new_job() -> Job {
    Job::new(JobInputs {
        photos: vec!["a.jpg".to_string(), "b.jpg".to_string()],
        genre: "folk".to_string(),
        mood: "nostalgic".to_string(),
    })
}

async fn advance_to_summarizing(store: &SqliteJobStore, job_id: Uuid) {
    store.advance(job_id, StageArtifact::Accepted).await.unwrap();
    store.advance(job_id, StageArtifact::Started).await.unwrap();
    store
        .advance(job_id, StageArtifact::Captions(vec!["A porch".to_string()]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_and_get_roundtrip() {
    let (store, _dir) = create_store().await;
    let job = new_job();

    store.create(&job).await.unwrap();
    let loaded = store.get(job.job_id).await.unwrap();

    assert_eq!(loaded.job_id, job.job_id);
    assert_eq!(loaded.inputs, job.inputs);
    assert_eq!(loaded.stage, JobStage::Created);
    assert_eq!(loaded.artifacts, job.artifacts);
    assert!(loaded.failure_reason.is_none());
}

#[tokio::test]
async fn test_duplicate_create_rejected() {
    let (store, _dir) = create_store().await;
    let job = new_job();

    store.create(&job).await.unwrap();
    let err = store.create(&job).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(id) if id == job.job_id));
}

#[tokio::test]
async fn test_get_missing_job() {
    let (store, _dir) = create_store().await;
    let id = Uuid::new_v4();
    assert!(matches!(store.get(id).await, Err(StoreError::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn test_full_progression_persists_artifacts() {
    let (store, _dir) = create_store().await;
    let job = new_job();
    store.create(&job).await.unwrap();
    let id = job.job_id;

    advance_to_summarizing(&store, id).await;
    store
        .advance(id, StageArtifact::Summary("A quiet evening on the porch.".to_string()))
        .await
        .unwrap();
    store
        .advance(id, StageArtifact::Lyrics("[Verse 1]\nPorch light\n\n[Chorus]\nHome".to_string()))
        .await
        .unwrap();
    store
        .advance(
            id,
            StageArtifact::Audio {
                music_path: None,
                vocals_path: "/tmp/v.wav".to_string(),
            },
        )
        .await
        .unwrap();
    let (job, transition) = store
        .advance(
            id,
            StageArtifact::FinalMix {
                path: "/tmp/final.wav".to_string(),
                vocals_only: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(transition.old_stage, JobStage::Mixing);
    assert_eq!(transition.new_stage, JobStage::Completed);

    let loaded = store.get(id).await.unwrap();
    assert_eq!(loaded, job);
    assert_eq!(loaded.artifacts.captions, Some(vec!["A porch".to_string()]));
    assert_eq!(loaded.artifacts.music_path, None);
    assert_eq!(loaded.artifacts.vocals_path.as_deref(), Some("/tmp/v.wav"));
    assert_eq!(loaded.artifacts.final_audio_path.as_deref(), Some("/tmp/final.wav"));
    assert!(loaded.artifacts.vocals_only);
    assert!(loaded.missing_artifacts().is_empty());
}

#[tokio::test]
async fn test_empty_captions_persist_as_empty() {
    let (store, _dir) = create_store().await;
    let job = new_job();
    store.create(&job).await.unwrap();
    let id = job.job_id;

    store.advance(id, StageArtifact::Accepted).await.unwrap();
    store.advance(id, StageArtifact::Started).await.unwrap();
    store.advance(id, StageArtifact::Captions(vec![])).await.unwrap();

    let loaded = store.get(id).await.unwrap();
    assert_eq!(loaded.artifacts.captions, Some(vec![]));
}

#[tokio::test]
async fn test_wrong_artifact_leaves_row_untouched() {
    let (store, _dir) = create_store().await;
    let job = new_job();
    store.create(&job).await.unwrap();
    let id = job.job_id;

    let err = store
        .advance(id, StageArtifact::Summary("too early".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Transition(TransitionError::UnexpectedArtifact { .. })
    ));

    let loaded = store.get(id).await.unwrap();
    assert_eq!(loaded.stage, JobStage::Created);
    assert!(loaded.artifacts.summary.is_none());
}

#[tokio::test]
async fn test_fail_keeps_earlier_artifacts() {
    let (store, _dir) = create_store().await;
    let job = new_job();
    store.create(&job).await.unwrap();
    let id = job.job_id;
    advance_to_summarizing(&store, id).await;

    let reason = FailureReason::new(
        JobStage::Summarizing,
        FailureKind::FallbackExhausted,
        "summarizer unavailable; fallback: empty",
    );
    let (job, transition) = store.fail(id, reason.clone()).await.unwrap();

    assert_eq!(transition.old_stage, JobStage::Summarizing);
    assert_eq!(job.stage, JobStage::Failed);

    let loaded = store.get(id).await.unwrap();
    assert_eq!(loaded.failure_reason, Some(reason));
    assert_eq!(loaded.artifacts.captions, Some(vec!["A porch".to_string()]));
    assert!(loaded.artifacts.summary.is_none());
}

#[tokio::test]
async fn test_terminal_job_rejects_further_changes() {
    let (store, _dir) = create_store().await;
    let job = new_job();
    store.create(&job).await.unwrap();
    let id = job.job_id;

    let reason = FailureReason::new(JobStage::Created, FailureKind::Validation, "no genre");
    store.fail(id, reason.clone()).await.unwrap();

    assert!(matches!(
        store.advance(id, StageArtifact::Accepted).await,
        Err(StoreError::Transition(TransitionError::Terminal(JobStage::Failed)))
    ));
    assert!(store.fail(id, reason).await.is_err());
}

#[tokio::test]
async fn test_concurrent_advances_only_one_wins() {
    let (store, _dir) = create_store().await;
    let store = Arc::new(store);
    let job = new_job();
    store.create(&job).await.unwrap();
    let id = job.job_id;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.advance(id, StageArtifact::Accepted).await })
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(store.get(id).await.unwrap().stage, JobStage::Queued);
}

#[tokio::test]
async fn test_jobs_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photosong.db");
    let job = new_job();

    {
        let store = SqliteJobStore::new(init_database_pool(&path).await.unwrap());
        store.create(&job).await.unwrap();
        store.advance(job.job_id, StageArtifact::Accepted).await.unwrap();
        store.pool().close().await;
    }

    let store = SqliteJobStore::new(init_database_pool(&path).await.unwrap());
    assert_eq!(store.get(job.job_id).await.unwrap().stage, JobStage::Queued);
}

#[tokio::test]
async fn test_list_unfinished_returns_only_running_jobs() {
    let (store, _dir) = create_store().await;

    let summarizing = new_job();
    store.create(&summarizing).await.unwrap();
    advance_to_summarizing(&store, summarizing.job_id).await;

    let failed = new_job();
    store.create(&failed).await.unwrap();
    let reason = FailureReason::new(JobStage::Created, FailureKind::Validation, "no mood");
    store.fail(failed.job_id, reason).await.unwrap();

    let created = new_job();
    store.create(&created).await.unwrap();

    let unfinished = store.list_unfinished().await.unwrap();
    let ids: Vec<Uuid> = unfinished.iter().map(|job| job.job_id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&summarizing.job_id));
    assert!(ids.contains(&created.job_id));

    let resumed = unfinished
        .iter()
        .find(|job| job.job_id == summarizing.job_id)
        .unwrap();
    assert_eq!(resumed.stage, JobStage::Summarizing);
    assert_eq!(resumed.artifacts.captions, Some(vec!["A porch".to_string()]));
}
