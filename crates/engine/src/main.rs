//! Taleweaver engine - transcript replay entry point.
//!
//! Usage: `taleweaver-engine <transcript.json>`
//!
//! Replays the transcript through the rule-based detector, logs every
//! lifecycle event, and prints the resulting review queue as JSON.

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taleweaver_domain::GameId;
use taleweaver_engine::infrastructure::config::EngineConfig;
use taleweaver_engine::replay::{parse_transcript, replay};
use taleweaver_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (binary may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taleweaver_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let transcript_path = std::env::args()
        .nth(1)
        .context("usage: taleweaver-engine <transcript.json>")?;

    let config = EngineConfig::from_env();
    tracing::info!(?config, "Starting Taleweaver engine");

    let transcript = tokio::fs::read_to_string(&transcript_path)
        .await
        .with_context(|| format!("reading transcript {}", transcript_path))?;
    let entries = parse_transcript(&transcript)
        .with_context(|| format!("parsing transcript {}", transcript_path))?;

    let app = App::from_config(&config).await?;

    // Log lifecycle events as a downstream broadcaster would see them.
    let mut rx = app.events.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::info!(
                    event = event.name(),
                    evolution_id = %event.evolution().id,
                    subject = %event.evolution().subject,
                    "Lifecycle event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let game_id = GameId::new();
    let queued = replay(&app.evolution, game_id, &entries).await?;
    tracing::info!(
        game_id = %game_id,
        entries = entries.len(),
        queued = queued.len(),
        "Transcript replayed"
    );

    let pending = app.evolution.get_pending_evolutions(game_id, true).await?;

    // Dropping the app closes the event channel so the logger drains and exits.
    drop(app);
    event_logger.await?;

    println!("{}", serde_json::to_string_pretty(&pending)?);
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
