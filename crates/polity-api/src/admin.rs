//! Write handlers for `/identities` endpoints. All of them go through the
//! hierarchy engine.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/identities` | Body: [`NewIdentity`]; returns 201 + stored record |
//! | `PATCH` | `/identities/:id` | Body: [`IdentityPatch`] |
//! | `POST`  | `/identities/:id/move` | Body: `{"parent_id": 3}` or `{"parent_id": null}` |
//! | `POST`  | `/identities/:id/deactivate` | Body: `{"cascade": true}`; returns changed records |
//! | `POST`  | `/identities/:id/activate` | No body |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use polity_core::{
  identity::{Identity, IdentityPatch, NewIdentity},
  store::IdentityStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// `POST /identities`
pub async fn create<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewIdentity>,
) -> Result<impl IntoResponse, ApiError> {
  let identity = state.hierarchy.create(body).await?;
  Ok((StatusCode::CREATED, Json(identity)))
}

/// `PATCH /identities/:id`
pub async fn update<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(patch): Json<IdentityPatch>,
) -> Result<Json<Identity>, ApiError> {
  Ok(Json(state.hierarchy.update(id, patch).await?))
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
  /// `null` makes the identity a root.
  pub parent_id: Option<i64>,
}

/// `POST /identities/:id/move`
pub async fn move_node<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<MoveBody>,
) -> Result<Json<Identity>, ApiError> {
  Ok(Json(state.hierarchy.move_node(id, body.parent_id).await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct DeactivateBody {
  #[serde(default)]
  pub cascade: bool,
}

/// `POST /identities/:id/deactivate`
pub async fn deactivate<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<DeactivateBody>,
) -> Result<Json<Vec<Identity>>, ApiError> {
  Ok(Json(state.hierarchy.deactivate(id, body.cascade).await?))
}

/// `POST /identities/:id/activate`
pub async fn activate<S: IdentityStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Identity>, ApiError> {
  Ok(Json(state.hierarchy.activate(id).await?))
}
