//! Simulated progress sync session.
//!
//! Runs a small clicker game against an in-memory remote store with a
//! file-backed mirror, including a critical reset and a teardown drain, and
//! prints the resulting record.

mod game;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::{FileMirror, MemoryRemoteStore, StoreBeacon};
use sync_engine::{SyncConfig, SyncDeps, SyncEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::game::{clicker_schema, ClickerGame};

#[derive(Parser)]
#[command(
    name = "sync_sim",
    about = "Simulate a progress sync session against an in-memory store"
)]
struct Cli {
    /// Sync config JSON file. Defaults apply when it is missing, and the
    /// clicker fields are declared when it names no core fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the file-backed local mirror.
    #[arg(long, default_value = "sync-mirror")]
    mirror_dir: PathBuf,

    /// Number of game ticks to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u32,

    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Latency of every remote call in milliseconds.
    #[arg(long, default_value_t = 120)]
    latency_ms: u64,

    /// Make every Nth tick's next remote write fail (0 disables).
    #[arg(long, default_value_t = 0)]
    fail_every: u32,

    /// Tick at which the player prestiges (critical flush).
    #[arg(long)]
    reset_at: Option<u32>,
}

/// Declare the clicker's fields unless the config already names core fields.
///
/// A config without core fields would let corrupt currency values through.
fn with_clicker_schema(config: SyncConfig) -> SyncConfig {
    if config.schema.core_fields().next().is_some() {
        return config;
    }
    let schema = clicker_schema(&config.automation_flag)
        .with_magnitude_cap(config.schema.magnitude_cap);
    config.with_schema(schema)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("reading sync config {}", path.display()))?,
        None => SyncConfig::default(),
    };
    let config = with_clicker_schema(config);
    config.validate().context("invalid sync config")?;
    tracing::info!("Starting sync simulation for {}", config.record_key);

    let remote = Arc::new(
        MemoryRemoteStore::new().with_latency(Duration::from_millis(cli.latency_ms)),
    );
    let mirror = Arc::new(FileMirror::new(&cli.mirror_dir).with_context(|| {
        format!("creating mirror directory {}", cli.mirror_dir.display())
    })?);
    let beacon = Arc::new(StoreBeacon::new(
        Arc::clone(&remote),
        tokio::runtime::Handle::current(),
    ));

    let deps = SyncDeps::new(Arc::clone(&remote), mirror, beacon);
    let engine = SyncEngine::open(config.clone(), deps)
        .await
        .context("opening sync session")?;

    let mut game = ClickerGame::from_snapshot(&engine.snapshot(), &config.automation_flag);
    let mut ticker = tokio::time::interval(Duration::from_millis(cli.tick_ms));

    for tick in 1..=cli.ticks {
        ticker.tick().await;

        if cli.fail_every > 0 && tick % cli.fail_every == 0 {
            remote.fail_next(1);
        }

        if cli.reset_at == Some(tick) {
            match engine.critical_flush(game.prestige()).await {
                Ok(()) => tracing::info!("Prestige saved at tick {}", tick),
                Err(e) => tracing::warn!("Prestige not saved, player may retry: {}", e),
            }
            continue;
        }

        engine.ingest(game.tick(tick));

        if tick % 20 == 0 {
            let status = engine.status();
            tracing::info!(
                "tick {}: {} ({} pending, token {}, last flush {})",
                tick,
                status.phase.label(),
                status.pending_fields,
                status.fencing_token,
                status.formatted_since_last_flush()
            );
        }
    }

    engine.drain();
    engine.dispose();

    // Give the detached drain write time to land before reading the store.
    tokio::time::sleep(Duration::from_millis(cli.latency_ms * 2 + 10)).await;

    let status = engine.status();
    println!("{}", serde_json::to_string_pretty(&status.stats)?);
    match remote.record(engine.key()) {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("no record written"),
    }

    Ok(())
}
