//! leasebook server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the contract status API over HTTP.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use leasebook_api::ApiState;
use leasebook_core::clock::{Clock, SystemClock};
use leasebook_server::{ServerConfig, app, load_config, spawn_periodic_sweep};
use leasebook_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Leasebook contract status server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg: ServerConfig = load_config(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let clock: Arc<dyn Clock> = Arc::new(SystemClock);
  let state = Arc::new(ApiState::new(Arc::new(store), clock, server_cfg.sweep.on_request));

  if let Some(secs) = server_cfg.sweep.interval_secs.filter(|s| *s > 0) {
    tracing::info!(every_secs = secs, "background expiry sweep enabled");
    spawn_periodic_sweep(state.service.clone(), Duration::from_secs(secs));
  }

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(state)).await.context("server error")?;

  Ok(())
}
