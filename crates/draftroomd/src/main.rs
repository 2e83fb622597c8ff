// Headless draft room service.
//
// Startup sequence:
// 1. Load config (copying defaults into config/ on first run)
// 2. Initialize tracing
// 3. Open the database and import the player seed CSV if configured
// 4. Wire the engine: broadcast publisher, chat sink, collaborators
// 5. Spawn the event log task and the expiration sweeper
// 6. Wait for Ctrl-C, then stop background tasks

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use draftroom_core::chat::LogChatSink;
use draftroom_core::events::BroadcastPublisher;
use draftroom_core::store::Database;
use draftroom_engine::{DraftEngine, EngineContext};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Config
    let config = config::load_config().context("failed to load configuration")?;

    // 2. Tracing. RUST_LOG overrides the configured filter.
    init_tracing(&config.logging.filter)?;
    info!("draftroomd starting");

    // 3. Database
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
    }
    let db_path = config.db_path.to_string_lossy().into_owned();
    let db = Arc::new(Database::open(&db_path).context("failed to open database")?);
    info!("Database opened at {}", db_path);

    if let Some(csv_path) = &config.players.csv_path {
        let count = db.import_players_csv(csv_path)?;
        info!("Imported {} players from {}", count, csv_path.display());
    }

    // 4. Engine
    let publisher = Arc::new(BroadcastPublisher::new(config.events.channel_capacity));
    let ctx = EngineContext::new(db, Arc::new(LogChatSink), publisher.clone());
    let engine = DraftEngine::new(ctx);

    // 5. Background tasks
    let mut events = publisher.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(msg) => debug!(
                    league_id = msg.league_id,
                    event_type = msg.event.event_type(),
                    "draft event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event log lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let sweeper = Arc::new(engine.sweeper(config.sweeper.max_concurrent_drafts));
    let sweeper_handle = tokio::spawn(
        sweeper.run(Duration::from_secs(config.sweeper.interval_seconds)),
    );

    // 6. Shutdown
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    sweeper_handle.abort();
    event_log.abort();

    info!("draftroomd stopped");
    Ok(())
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
