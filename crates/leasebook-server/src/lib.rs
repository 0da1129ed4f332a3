//! Process wiring for the Leasebook server: configuration, the HTTP app, and
//! the optional background expiry sweep.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use leasebook_api::{ApiState, retry};
use leasebook_core::{StatusService, clock::Clock, store::ContractDirectory};
use serde::Deserialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LEASEBOOK_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub sweep:      SweepConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       5240,
      store_path: PathBuf::from("leasebook.db"),
      sweep:      SweepConfig::default(),
    }
  }
}

/// When overdue contracts get expired.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
  /// Sweep before handling each API request.
  pub on_request:    bool,
  /// Also sweep every this many seconds in the background.
  pub interval_secs: Option<u64>,
}

impl Default for SweepConfig {
  fn default() -> Self { Self { on_request: true, interval_secs: None } }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn environment() -> config::Environment {
  config::Environment::with_prefix("LEASEBOOK")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

/// Read `path` if it exists, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  load_config_from(path, environment())
}

fn load_config_from(
  path: &Path,
  env: config::Environment,
) -> Result<ServerConfig, config::ConfigError> {
  let mut cfg: ServerConfig = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(env)
    .build()?
    .try_deserialize()?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn app<S>(state: Arc<ApiState<S>>) -> Router
where
  S: ContractDirectory + 'static,
{
  leasebook_api::api_router(state).layer(TraceLayer::new_for_http())
}

/// Sweep every `every`, starting immediately. Failures are logged and the
/// loop carries on.
pub fn spawn_periodic_sweep<S>(
  service: StatusService<S, Arc<dyn Clock>>,
  every: Duration,
) -> JoinHandle<()>
where
  S: ContractDirectory + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      let service = &service;
      match retry::on_conflict(move || service.refresh()).await {
        Ok(0) => {}
        Ok(n) => tracing::debug!(transitioned = n, "background sweep finished"),
        Err(e) => tracing::error!(error = %e, "background sweep failed"),
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use leasebook_core::{
    clock::ManualClock, contract::NewContract, memory::MemoryStore, status::ContractStatus,
    store::StatusHistoryStore as _,
  };

  use super::*;

  fn no_env() -> config::Environment { environment().source(Some(HashMap::new())) }

  fn env(vars: &[(&str, &str)]) -> config::Environment {
    let map = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    environment().source(Some(map))
  }

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml"), no_env()).unwrap();
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.address(), "127.0.0.1:5240");
    assert!(cfg.sweep.on_request);
    assert_eq!(cfg.sweep.interval_secs, None);
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
      &path,
      "port = 8080\nstore_path = \"/var/lib/leasebook.db\"\n\n[sweep]\non_request = false\ninterval_secs = 60\n",
    )
    .unwrap();

    let cfg = load_config_from(&path, no_env()).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/leasebook.db"));
    assert!(!cfg.sweep.on_request);
    assert_eq!(cfg.sweep.interval_secs, Some(60));
  }

  #[test]
  fn environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 8080\n").unwrap();

    let cfg = load_config_from(
      &path,
      env(&[("LEASEBOOK_PORT", "9000"), ("LEASEBOOK_SWEEP__INTERVAL_SECS", "30")]),
    )
    .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.sweep.interval_secs, Some(30));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/lb.db")), PathBuf::from(home).join("lb.db"));
    assert_eq!(expand_tilde(Path::new("/abs/lb.db")), PathBuf::from("/abs/lb.db"));
  }

  #[tokio::test]
  async fn periodic_sweep_expires_overdue_contracts() {
    let d = |y, m, day| chrono::NaiveDate::from_ymd_opt(y, m, day).unwrap();
    let store = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(d(2024, 7, 1)));
    let service = StatusService::with_clock(store.clone(), clock);

    let c = store.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();

    let handle = spawn_periodic_sweep(service, Duration::from_millis(5));
    let mut expired = false;
    for _ in 0..100 {
      let open = store.open_interval(c.contract_id).await.unwrap().unwrap();
      if open.status == ContractStatus::Expired {
        expired = true;
        break;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    handle.abort();
    assert!(expired);
  }
}
