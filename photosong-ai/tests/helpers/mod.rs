//! Shared test fixtures: scripted collaborators and a ready-made orchestrator

#![allow(dead_code)]

use async_trait::async_trait;
use photosong_ai::audio::Waveform;
use photosong_ai::config::TimeoutConfig;
use photosong_ai::db::{JobStore, MemoryJobStore};
use photosong_ai::fallback::FallbackPolicy;
use photosong_ai::models::{
    Job, JobInputs, LyricsParameters, MixParameters, MusicParameters, VoiceParameters,
};
use photosong_ai::services::{PipelineOrchestrator, PipelineSettings};
use photosong_ai::types::{
    Captioner, CollaboratorError, Collaborators, Lyricist, MusicGenerator, MusicRequest,
    Summarizer, VoiceSynthesizer,
};
use photosong_common::events::{EventBus, SongEvent};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const TEST_RATE: u32 = 16_000;

pub const GOOD_SUMMARY: &str = "A family gathers at the beach for a sunny afternoon, \
building sandcastles and laughing together as the waves roll in.";

pub const GOOD_LYRICS: &str = "[Verse 1]\n\
Sandcastles rising by the shore\n\
Laughing voices, who could ask for more\n\
Sunlight dancing on the sea\n\
Every moment, you and me\n\
\n\
[Chorus]\n\
Hold on to the summer light\n\
Hold on, everything is bright\n";

/// Mono sine at [`TEST_RATE`]
pub fn tone(seconds: f32, frequency: f32, amplitude: f32) -> Waveform {
    let frames = (seconds * TEST_RATE as f32) as usize;
    let samples = (0..frames)
        .map(|i| {
            (2.0 * std::f32::consts::PI * frequency * i as f32 / TEST_RATE as f32).sin() * amplitude
        })
        .collect();
    Waveform::new(samples, TEST_RATE, 1).unwrap()
}

/// How a scripted collaborator answers
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
}

/// Collaborators whose answers are fixed up front
pub struct Script {
    /// Photos whose reference contains this marker fail to caption
    pub caption_fail_marker: Option<String>,
    pub summary: Reply,
    pub lyrics: Reply,
    pub music: Option<Waveform>,
    pub vocals: Option<Waveform>,
    /// Added to every summarizer call
    pub summary_delay: Duration,
    pub active_summaries: Arc<AtomicUsize>,
    pub peak_active_summaries: Arc<AtomicUsize>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            caption_fail_marker: None,
            summary: Reply::Text(GOOD_SUMMARY.to_string()),
            lyrics: Reply::Text(GOOD_LYRICS.to_string()),
            music: Some(tone(2.0, 220.0, 0.5)),
            vocals: Some(tone(1.0, 440.0, 0.5)),
            summary_delay: Duration::ZERO,
            active_summaries: Arc::new(AtomicUsize::new(0)),
            peak_active_summaries: Arc::new(AtomicUsize::new(0)),
        }
    }
}

pub struct ScriptedCollaborators(Arc<Script>);

impl ScriptedCollaborators {
    pub fn into_collaborators(script: Script) -> Collaborators {
        let shared = Arc::new(ScriptedCollaborators(Arc::new(script)));
        Collaborators {
            captioner: shared.clone(),
            summarizer: shared.clone(),
            lyricist: shared.clone(),
            music: shared.clone(),
            voice: shared,
        }
    }
}

fn reply(reply: &Reply, name: &str) -> Result<String, CollaboratorError> {
    match reply {
        Reply::Text(text) => Ok(text.clone()),
        Reply::Fail => Err(CollaboratorError::Unavailable(name.to_string())),
    }
}

#[async_trait]
impl Captioner for ScriptedCollaborators {
    async fn caption(&self, photo: &str) -> Result<String, CollaboratorError> {
        match &self.0.caption_fail_marker {
            Some(marker) if photo.contains(marker.as_str()) => {
                Err(CollaboratorError::InvalidOutput(format!("cannot read {}", photo)))
            }
            _ => Ok(format!("A happy moment in {}", photo)),
        }
    }
}

#[async_trait]
impl Summarizer for ScriptedCollaborators {
    async fn summarize(&self, _captions: &[String]) -> Result<String, CollaboratorError> {
        let script = &self.0;
        let active = script.active_summaries.fetch_add(1, Ordering::SeqCst) + 1;
        script.peak_active_summaries.fetch_max(active, Ordering::SeqCst);
        if !script.summary_delay.is_zero() {
            tokio::time::sleep(script.summary_delay).await;
        }
        script.active_summaries.fetch_sub(1, Ordering::SeqCst);
        reply(&script.summary, "summarizer")
    }
}

#[async_trait]
impl Lyricist for ScriptedCollaborators {
    async fn write_lyrics(
        &self,
        _summary: &str,
        _genre: &str,
        _mood: &str,
    ) -> Result<String, CollaboratorError> {
        reply(&self.0.lyrics, "lyricist")
    }
}

#[async_trait]
impl MusicGenerator for ScriptedCollaborators {
    async fn generate(&self, _request: &MusicRequest) -> Result<Waveform, CollaboratorError> {
        self.0
            .music
            .clone()
            .ok_or_else(|| CollaboratorError::Unavailable("music generator".to_string()))
    }
}

#[async_trait]
impl VoiceSynthesizer for ScriptedCollaborators {
    async fn synthesize(&self, _lyrics: &str) -> Result<Waveform, CollaboratorError> {
        self.0
            .vocals
            .clone()
            .ok_or_else(|| CollaboratorError::Unavailable("voice synthesizer".to_string()))
    }
}

pub fn test_settings(audio_dir: &Path, max_concurrent: usize) -> PipelineSettings {
    PipelineSettings {
        timeouts: TimeoutConfig::default(),
        mix: MixParameters {
            sample_rate: TEST_RATE,
            channels: 1,
            ..MixParameters::default()
        },
        music: MusicParameters::default(),
        audio_dir: audio_dir.to_path_buf(),
        max_concurrent,
    }
}

pub fn test_policy() -> FallbackPolicy {
    FallbackPolicy::new(
        LyricsParameters::default(),
        VoiceParameters {
            fallback_sample_rate: TEST_RATE,
            ..VoiceParameters::default()
        },
    )
}

/// Orchestrator over a memory store
pub fn orchestrator(
    collaborators: Collaborators,
    audio_dir: &Path,
    max_concurrent: usize,
) -> Arc<PipelineOrchestrator> {
    orchestrator_with(
        Arc::new(MemoryJobStore::new()),
        collaborators,
        test_policy(),
        audio_dir,
        max_concurrent,
    )
}

pub fn orchestrator_with(
    store: Arc<dyn JobStore>,
    collaborators: Collaborators,
    policy: FallbackPolicy,
    audio_dir: &Path,
    max_concurrent: usize,
) -> Arc<PipelineOrchestrator> {
    orchestrator_with_settings(
        store,
        collaborators,
        policy,
        test_settings(audio_dir, max_concurrent),
    )
}

pub fn orchestrator_with_settings(
    store: Arc<dyn JobStore>,
    collaborators: Collaborators,
    policy: FallbackPolicy,
    settings: PipelineSettings,
) -> Arc<PipelineOrchestrator> {
    Arc::new(PipelineOrchestrator::new(
        store,
        EventBus::new(1000),
        collaborators,
        policy,
        settings,
    ))
}

pub fn inputs(photos: &[&str]) -> JobInputs {
    JobInputs {
        photos: photos.iter().map(|p| p.to_string()).collect(),
        genre: "pop".to_string(),
        mood: "happy".to_string(),
    }
}

/// Poll until the job is COMPLETED or FAILED
pub async fn wait_for_terminal(orchestrator: &PipelineOrchestrator, job_id: Uuid) -> Job {
    for _ in 0..1000 {
        let job = orchestrator.store().get(job_id).await.unwrap();
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal stage", job_id);
}

/// Receive events up to and including the job's JobCompleted or JobFailed
pub async fn events_until_done(
    rx: &mut broadcast::Receiver<SongEvent>,
    job_id: Uuid,
) -> Vec<SongEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for job events")
            .expect("event bus closed");
        if event.job_id() != job_id {
            continue;
        }
        let done = matches!(
            event,
            SongEvent::JobCompleted { .. } | SongEvent::JobFailed { .. }
        );
        events.push(event);
        if done {
            return events;
        }
    }
}
