//! HTTP server for Polity.
//!
//! Mounts the JSON API from [`polity_api`] under `/api`, behind HTTP Basic
//! auth with per-user capabilities, plus an unauthenticated `/health` probe.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, middleware, routing::get};
use polity_core::store::IdentityStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, UserConfig, authorize};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Prefix for environment overrides, e.g. `POLITY_PORT=9000`.
pub const ENV_PREFIX: &str = "POLITY";

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub users:      Vec<UserConfig>,
}

impl ServerConfig {
  /// Layer defaults, the TOML file at `path` (if present) and `POLITY_*`
  /// environment variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080_i64)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~/` expanded to `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    let raw = self.store_path.to_string_lossy();
    match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
      (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
      _ => self.store_path.clone(),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn auth(&self) -> AuthConfig { AuthConfig { users: self.users.clone() } }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs: the store and the accepted accounts.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      auth:  Arc::clone(&self.auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: IdentityStore + 'static,
{
  let api = polity_api::api_router(state.store)
    .layer(middleware::from_fn_with_state(state.auth, authorize));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Tests ────────────────────────────────────────────────────────────────────
