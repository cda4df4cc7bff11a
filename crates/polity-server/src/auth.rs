//! HTTP Basic-auth verification and the capability middleware guarding the
//! API.

use std::{fmt, sync::Arc};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method},
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// A named permission attached to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Capability {
  #[serde(rename = "identities:read")]
  Read,
  #[serde(rename = "identities:write")]
  Write,
}

impl Capability {
  /// The capability a request with `method` needs.
  pub fn required_for(method: &Method) -> Self {
    if method == Method::GET || method == Method::HEAD {
      Capability::Read
    } else {
      Capability::Write
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Capability::Read => "identities:read",
      Capability::Write => "identities:write",
    })
  }
}

/// One configured account.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  #[serde(default)]
  pub capabilities:  Vec<Capability>,
}

impl UserConfig {
  pub fn can(&self, capability: Capability) -> bool {
    self.capabilities.contains(&capability)
  }
}

/// Accounts accepted by this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub users: Vec<UserConfig>,
}

/// Hash `password` with a fresh salt into the PHC string stored as a user's
/// `password_hash`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify Basic credentials from `headers` and return the matching user.
pub fn verify_auth<'a>(
  headers: &HeaderMap,
  config:  &'a AuthConfig,
) -> Result<&'a UserConfig, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let user = config
    .users
    .iter()
    .find(|u| u.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&user.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(user)
}

/// Middleware: authenticate the request, then check the capability its
/// method requires.
pub async fn authorize(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  let required = Capability::required_for(req.method());
  let user = verify_auth(req.headers(), &auth).inspect_err(|_| {
    debug!(method = %req.method(), uri = %req.uri(), "rejected unauthenticated request");
  })?;

  if !user.can(required) {
    debug!(username = %user.username, %required, "rejected request lacking capability");
    return Err(Error::Forbidden {
      username:   user.username.clone(),
      capability: required,
    });
  }

  Ok(next.run(req).await)
}
