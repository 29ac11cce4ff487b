//! cmdb server binary.
//!
//! Loads configuration from `config.toml` (or `--config <path>`) layered with
//! `CMDB_*` environment variables, e.g. `CMDB_PORT=9000`, opens the SQLite
//! store and serves the JSON API under `/api`.

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use cmdb_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "cmdb configuration store server")]
struct Cli {
  /// TOML configuration file. Missing files are ignored.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

fn init_tracing() {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();
  tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let path = expand_tilde(&cfg.store_path);
  if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create store directory {dir:?}"))?;
  }

  let store = SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))?;
  tracing::info!(path = ?path, "store opened");
  Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  init_tracing();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;
  let store = open_store(&cfg).await?;

  let app = Router::new()
    .nest("/api", cmdb_api::api_router(Arc::new(store)))
    .layer(TraceLayer::new_for_http());

  let address = cfg.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!(%address, "serving cmdb API");

  axum::serve(listener, app).await.context("server error")
}
