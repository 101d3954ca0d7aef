//! `pulse` server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and either serves the JSON API or runs one sync
//! pass over configured batch files.
//!
//! # Configuration
//!
//! ```toml
//! host       = "127.0.0.1"
//! port       = 8650
//! store_path = "~/.local/share/pulse/index.db"
//!
//! [sources]
//! github = "batches/github.json"
//! slack  = "batches/slack.json"
//! ```
//!
//! Each `[sources]` entry maps a source name to a batch file — the JSON dump
//! of one connector's collected output. Keeping one scheduler invocation per
//! source is the operator's job; the engine assumes no concurrent syncs of
//! the same source.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pulse_core::adapter::{AdapterRegistry, SourceBatch};
use pulse_store_sqlite::SqliteStore;
use pulse_sync::SyncEngine;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Runtime configuration, deserialised from `config.toml` and `PULSE_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  host:       String,
  port:       u16,
  store_path: PathBuf,
  /// Source name → batch file with that connector's collected output.
  #[serde(default)]
  sources:    BTreeMap<String, PathBuf>,
}

#[derive(Parser)]
#[command(author, version, about = "Pulse team-activity index")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,
  /// Run one sync pass over configured batch files.
  Sync {
    /// Sync only this source instead of every configured one.
    #[arg(long)]
    source: Option<String>,
  },
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PULSE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Serve => serve(server_cfg, store).await,
    Command::Sync { source } => sync(server_cfg, store, source).await,
  }
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let app = axum::Router::new()
    .nest("/api", pulse_api::api_router(Arc::new(store)))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn sync(
  cfg: ServerConfig,
  store: SqliteStore,
  only: Option<String>,
) -> anyhow::Result<()> {
  let registry = assemble_registry(&cfg)?;
  let engine = SyncEngine::new(store);

  let names: Vec<String> = match only {
    Some(name) => vec![name],
    None => registry.names().iter().map(|s| s.to_string()).collect(),
  };

  if names.is_empty() {
    anyhow::bail!("no sources configured; add a [sources] table to config.toml");
  }

  for name in names {
    let adapter = registry
      .build(&name)
      .ok_or_else(|| pulse_core::Error::UnknownSource(name.clone()))?;

    let stats = engine
      .sync(adapter.as_ref())
      .await
      .with_context(|| format!("sync failed for source {name:?}"))?;

    println!(
      "{}",
      serde_json::to_string(&serde_json::json!({ "source": name, "stats": stats }))?
    );
  }

  Ok(())
}

/// Load every configured batch file and register a replay adapter for it.
fn assemble_registry(cfg: &ServerConfig) -> anyhow::Result<AdapterRegistry> {
  let mut registry = AdapterRegistry::new();

  for (name, path) in &cfg.sources {
    let path = expand_tilde(path);
    let raw = std::fs::read_to_string(&path)
      .with_context(|| format!("reading batch file {}", path.display()))?;
    let mut batch = SourceBatch::from_json(&raw)
      .with_context(|| format!("parsing batch file {}", path.display()))?;

    if batch.source != *name {
      tracing::warn!(
        configured = %name,
        declared = %batch.source,
        "batch file declares a different source name; using the configured one"
      );
      batch.source = name.clone();
    }

    registry.register(name.clone(), Box::new(move || Box::new(batch.clone())));
  }

  Ok(registry)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
