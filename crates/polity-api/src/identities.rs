//! Read handlers for `/identities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/identities` | `?level`, `?category`, `?search`, `?include_inactive`, `?page`, `?page_size` |
//! | `GET`  | `/identities/categories` | Active top-level identities |
//! | `GET`  | `/identities/hierarchy` | Optional `?root=<id or slug>` |
//! | `GET`  | `/identities/:id` | Id or slug; 404 if not found |
//! | `GET`  | `/identities/:id/descendants` | Optional `?include_inactive=true` |
//! | `GET`  | `/identities/:id/ancestors` | Root-first |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use polity_core::{
  identity::{Identity, IdentityRef},
  query::{ListFilter, Page, Paginated},
  store::IdentityStore,
  tree::IdentityNode,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// Parse a path or query segment; never fails, digits become ids.
fn key(raw: &str) -> IdentityRef {
  match raw.parse() {
    Ok(key) => key,
    Err(never) => match never {},
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub level:            Option<u32>,
  /// Id or slug of a top-level identity.
  pub category:         Option<String>,
  pub search:           Option<String>,
  #[serde(default)]
  pub include_inactive: bool,
  pub page:             Option<u32>,
  pub page_size:        Option<u32>,
}

/// `GET /identities[?level=..][&category=..][&search=..][&page=..][&page_size=..]`
pub async fn list<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Identity>>, ApiError> {
  let filter = ListFilter {
    level:            params.level,
    category:         params.category.as_deref().map(key),
    search:           params.search,
    include_inactive: params.include_inactive,
  };
  let page = Page::new(params.page, params.page_size);
  Ok(Json(state.directory.list(filter, page).await?))
}

// ─── Single record ────────────────────────────────────────────────────────────

/// `GET /identities/:id`. `:id` may be a numeric id or a slug.
pub async fn get_one<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Identity>, ApiError> {
  Ok(Json(state.directory.get_one(&key(&id)).await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct DescendantParams {
  #[serde(default)]
  pub include_inactive: bool,
}

/// `GET /identities/:id/descendants[?include_inactive=true]`
pub async fn descendants<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
  Query(params): Query<DescendantParams>,
) -> Result<Json<Vec<Identity>>, ApiError> {
  let node = state.directory.get_one(&key(&id)).await?;
  let found = state
    .directory
    .get_descendants(node.id, params.include_inactive)
    .await?;
  Ok(Json(found))
}

/// `GET /identities/:id/ancestors`
pub async fn ancestors<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Identity>>, ApiError> {
  let node = state.directory.get_one(&key(&id)).await?;
  Ok(Json(state.directory.get_ancestors(node.id).await?))
}

// ─── Hierarchy ────────────────────────────────────────────────────────────────

/// `GET /identities/categories`
pub async fn categories<S: IdentityStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Identity>>, ApiError> {
  Ok(Json(state.directory.get_categories().await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct HierarchyParams {
  pub root: Option<String>,
}

/// `GET /identities/hierarchy[?root=<id or slug>]`
pub async fn hierarchy<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<HierarchyParams>,
) -> Result<Json<Vec<IdentityNode>>, ApiError> {
  let trees = match params.root {
    None => state.directory.get_hierarchy().await?,
    Some(root) => {
      let root = state.directory.get_one(&key(&root)).await?;
      state.directory.get_subtree(root.id).await?
    }
  };
  Ok(Json(trees))
}
