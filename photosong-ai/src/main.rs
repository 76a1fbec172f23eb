//! photosong-ai - Photo-to-song generation service
//!
//! Accepts a set of photos with a genre and mood, and turns them into a
//! short song: captions, a narrative summary, lyrics, an instrumental and a
//! vocal track, mixed into one WAV. Progress is exposed over HTTP REST + SSE.

use anyhow::{Context, Result};
use clap::Parser;
use photosong_common::events::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photosong_ai::config::{ServiceConfig, StoreKind};
use photosong_ai::db::{self, JobStore, MemoryJobStore, SqliteJobStore};
use photosong_ai::fallback::FallbackPolicy;
use photosong_ai::services::{build_collaborators, PipelineOrchestrator, PipelineSettings};
use photosong_ai::AppState;

/// Command-line arguments for photosong-ai
#[derive(Parser, Debug)]
#[command(name = "photosong-ai")]
#[command(about = "Photo-to-song generation service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "PHOTOSONG_PORT")]
    port: Option<u16>,

    /// Root folder for the database and generated audio
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| photosong_common::config::locate_config_file("photosong-ai"));
    let mut config = ServiceConfig::load(config_path.as_deref())?;
    config.apply_env_overrides();
    config.validate()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("photosong_ai={},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = args.port.unwrap_or(config.port);
    info!("Starting photosong-ai on port {}", port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    let root_folder = photosong_common::config::resolve_root_folder(
        args.root_folder.as_deref(),
        config.root_folder.as_deref(),
    );
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let store: Arc<dyn JobStore> = match config.store {
        StoreKind::Sqlite => {
            let db_path = root_folder.join("photosong.db");
            info!("Database: {}", db_path.display());
            let pool = db::init_database_pool(&db_path).await?;
            Arc::new(SqliteJobStore::new(pool))
        }
        StoreKind::Memory => {
            info!("Using in-memory job store");
            Arc::new(MemoryJobStore::new())
        }
    };

    let collaborators = build_collaborators(&config.collaborators, &config.lyrics)?;
    let policy = FallbackPolicy::new(config.lyrics.clone(), config.voice.clone());
    let settings = PipelineSettings::from_config(&config, &root_folder);
    info!(
        audio_dir = %settings.audio_dir.display(),
        max_concurrent = settings.max_concurrent,
        "Pipeline configured"
    );

    let event_bus = EventBus::new(100);
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store,
        event_bus,
        collaborators,
        policy,
        settings,
    ));

    let resumed = orchestrator
        .resume_unfinished()
        .await
        .context("Failed to resume unfinished jobs")?;
    if resumed > 0 {
        info!("Resumed {} unfinished job(s)", resumed);
    }

    let app = photosong_ai::build_router(AppState::new(orchestrator));

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("photosong-ai stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
