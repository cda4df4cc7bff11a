//! polity-server binary.
//!
//! `polity-server serve` (the default) loads `config.toml`, opens the SQLite
//! store and serves the JSON API. `polity-server hash-password` reads a
//! password from stdin and prints the argon2 PHC string to paste into a
//! user's `password_hash`.

use std::{io::BufRead as _, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use polity_server::{AppState, ServerConfig, auth::hash_password};
use polity_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Polity identity hierarchy server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (default).
  Serve,
  /// Hash a password read from stdin for use in `config.toml`.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let mut password = String::new();
      std::io::stdin().lock().read_line(&mut password)?;
      let hash = hash_password(password.trim_end_matches(['\n', '\r']))
        .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
    Command::Serve => {
      let cfg = ServerConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;
      serve(cfg).await
    }
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  if cfg.users.is_empty() {
    warn!("no users configured; every API request will be rejected");
  }

  let store_path = cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  info!(path = ?store_path, "opened identity store");

  let state = AppState {
    store: Arc::new(store),
    auth:  Arc::new(cfg.auth()),
  };

  let address = cfg.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  info!("listening on http://{address}");

  axum::serve(listener, polity_server::router(state))
    .await
    .context("server error")
}
