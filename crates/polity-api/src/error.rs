//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use polity_core::validate::ValidationErrors;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("validation failed: {0}")]
  Invalid(ValidationErrors),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<polity_core::Error> for ApiError {
  fn from(e: polity_core::Error) -> Self {
    use polity_core::Error as E;
    match e {
      E::NotFound(_) => ApiError::NotFound(e.to_string()),
      E::Validation(errors) => ApiError::Invalid(errors),
      E::ParentNotFound(_) => ApiError::BadRequest(e.to_string()),
      E::Conflict { .. } | E::CycleDetected { .. } | E::HasActiveChildren(_) => {
        ApiError::Conflict(e.to_string())
      }
      E::Store(source) => ApiError::Store(source),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Invalid(errors) => {
        let fields: Vec<_> = errors
          .iter()
          .map(|e| json!({ "field": e.field, "message": e.violation.to_string() }))
          .collect();
        (
          StatusCode::BAD_REQUEST,
          json!({ "error": "validation failed", "fields": fields }),
        )
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
