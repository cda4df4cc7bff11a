//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::Capability;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("user {username:?} lacks the {capability} capability")]
  Forbidden {
    username:   String,
    capability: Capability,
  },
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"polity\""),
        );
        res
      }
      Error::Forbidden { .. } => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
    }
  }
}
