//! JSON REST API for Polity.
//!
//! Exposes an axum [`Router`] backed by any
//! [`polity_core::store::IdentityStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", polity_api::api_router(store.clone()))
//! ```

pub mod admin;
pub mod error;
pub mod identities;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use polity_core::{Directory, Hierarchy, store::IdentityStore};

pub use error::ApiError;

/// Handler state: the read façade and the write engine over one store.
pub struct ApiState<S> {
  pub directory: Directory<S>,
  pub hierarchy: Hierarchy<S>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      directory: self.directory.clone(),
      hierarchy: self.hierarchy.clone(),
    }
  }
}

impl<S: IdentityStore> ApiState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      directory: Directory::new(Arc::clone(&store)),
      hierarchy: Hierarchy::new(store),
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: IdentityStore + 'static,
{
  Router::new()
    .route(
      "/identities",
      get(identities::list::<S>).post(admin::create::<S>),
    )
    .route("/identities/categories", get(identities::categories::<S>))
    .route("/identities/hierarchy", get(identities::hierarchy::<S>))
    .route(
      "/identities/{id}",
      get(identities::get_one::<S>).patch(admin::update::<S>),
    )
    .route("/identities/{id}/descendants", get(identities::descendants::<S>))
    .route("/identities/{id}/ancestors", get(identities::ancestors::<S>))
    .route("/identities/{id}/move", post(admin::move_node::<S>))
    .route("/identities/{id}/deactivate", post(admin::deactivate::<S>))
    .route("/identities/{id}/activate", post(admin::activate::<S>))
    .with_state(ApiState::new(store))
}

#[cfg(test)]
mod tests;
