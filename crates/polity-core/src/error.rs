//! Error types for `polity-core`.

use thiserror::Error;

use crate::{identity::IdentityRef, validate::ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
  #[error("identity not found: {0}")]
  NotFound(IdentityRef),

  #[error("parent identity {0} does not exist or is inactive")]
  ParentNotFound(i64),

  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("{field} {value:?} is already taken")]
  Conflict { field: &'static str, value: String },

  #[error("moving identity {id} under {parent_id} would create a cycle")]
  CycleDetected { id: i64, parent_id: i64 },

  #[error("identity {0} has active children")]
  HasActiveChildren(i64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
