//! Error type for `polity-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] polity_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored column held a value that does not fit the domain type.
  #[error("corrupt column {column}: {value}")]
  Corrupt { column: &'static str, value: String },
}

/// Domain failures pass through unchanged; everything else is a store fault.
impl From<Error> for polity_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => polity_core::Error::Store(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
