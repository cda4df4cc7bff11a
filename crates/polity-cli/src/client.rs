//! Async HTTP client wrapping the polity JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use polity_core::{
  identity::{Identity, IdentityPatch, NewIdentity},
  query::Paginated,
  tree::IdentityNode,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Connection settings for the polity API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Query parameters for `GET /identities`.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  pub level:            Option<u32>,
  pub category:         Option<String>,
  pub search:           Option<String>,
  pub include_inactive: bool,
  pub page:             Option<u32>,
  pub page_size:        Option<u32>,
}

impl ListQuery {
  fn pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(level) = self.level {
      pairs.push(("level", level.to_string()));
    }
    if let Some(category) = &self.category {
      pairs.push(("category", category.clone()));
    }
    if let Some(search) = &self.search {
      pairs.push(("search", search.clone()));
    }
    if self.include_inactive {
      pairs.push(("include_inactive", "true".to_string()));
    }
    if let Some(page) = self.page {
      pairs.push(("page", page.to_string()));
    }
    if let Some(page_size) = self.page_size {
      pairs.push(("page_size", page_size.to_string()));
    }
    pairs
  }
}

/// Async HTTP client for the polity JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req` and decode a successful JSON body; error bodies are folded
  /// into the returned error.
  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    debug!(what, "sending request");
    let resp = self
      .auth(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(anyhow!("{what} → {status}: {}", error_message(&body)));
    }
    resp
      .json()
      .await
      .with_context(|| format!("deserialising response to {what}"))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `GET /api/identities`
  pub async fn list(&self, query: &ListQuery) -> Result<Paginated<Identity>> {
    let req = self.client.get(self.url("/identities")).query(&query.pairs());
    self.send(req, "GET /identities").await
  }

  /// `GET /api/identities/{id_or_slug}`
  pub async fn get(&self, key: &str) -> Result<Identity> {
    let req = self.client.get(self.url(&format!("/identities/{key}")));
    self.send(req, &format!("GET /identities/{key}")).await
  }

  /// `GET /api/identities/{id_or_slug}/descendants`
  pub async fn descendants(&self, key: &str, include_inactive: bool) -> Result<Vec<Identity>> {
    let req = self
      .client
      .get(self.url(&format!("/identities/{key}/descendants")))
      .query(&[("include_inactive", include_inactive.to_string())]);
    self.send(req, &format!("GET /identities/{key}/descendants")).await
  }

  /// `GET /api/identities/{id_or_slug}/ancestors`
  pub async fn ancestors(&self, key: &str) -> Result<Vec<Identity>> {
    let req = self.client.get(self.url(&format!("/identities/{key}/ancestors")));
    self.send(req, &format!("GET /identities/{key}/ancestors")).await
  }

  /// `GET /api/identities/categories`
  pub async fn categories(&self) -> Result<Vec<Identity>> {
    let req = self.client.get(self.url("/identities/categories"));
    self.send(req, "GET /identities/categories").await
  }

  /// `GET /api/identities/hierarchy[?root=..]`
  pub async fn hierarchy(&self, root: Option<&str>) -> Result<Vec<IdentityNode>> {
    let mut req = self.client.get(self.url("/identities/hierarchy"));
    if let Some(root) = root {
      req = req.query(&[("root", root)]);
    }
    self.send(req, "GET /identities/hierarchy").await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// `POST /api/identities`
  pub async fn create(&self, input: &NewIdentity) -> Result<Identity> {
    let req = self.client.post(self.url("/identities")).json(input);
    self.send(req, "POST /identities").await
  }

  /// `PATCH /api/identities/{id}`
  pub async fn update(&self, id: i64, patch: &IdentityPatch) -> Result<Identity> {
    let req = self.client.patch(self.url(&format!("/identities/{id}"))).json(patch);
    self.send(req, &format!("PATCH /identities/{id}")).await
  }

  /// `POST /api/identities/{id}/move`
  pub async fn move_to(&self, id: i64, parent_id: Option<i64>) -> Result<Identity> {
    let req = self
      .client
      .post(self.url(&format!("/identities/{id}/move")))
      .json(&json!({ "parent_id": parent_id }));
    self.send(req, &format!("POST /identities/{id}/move")).await
  }

  /// `POST /api/identities/{id}/deactivate`
  pub async fn deactivate(&self, id: i64, cascade: bool) -> Result<Vec<Identity>> {
    let req = self
      .client
      .post(self.url(&format!("/identities/{id}/deactivate")))
      .json(&json!({ "cascade": cascade }));
    self.send(req, &format!("POST /identities/{id}/deactivate")).await
  }

  /// `POST /api/identities/{id}/activate`
  pub async fn activate(&self, id: i64) -> Result<Identity> {
    let req = self.client.post(self.url(&format!("/identities/{id}/activate")));
    self.send(req, &format!("POST /identities/{id}/activate")).await
  }
}

/// Human-readable text for an API error body. Field-level validation
/// errors are listed one per field; anything else is passed through.
pub fn error_message(body: &str) -> String {
  let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
    return body.trim().to_string();
  };
  let Some(error) = value.get("error").and_then(|e| e.as_str()) else {
    return body.trim().to_string();
  };
  let fields: Vec<String> = value
    .get("fields")
    .and_then(|f| f.as_array())
    .into_iter()
    .flatten()
    .filter_map(|f| Some(format!("{} {}", f.get("field")?.as_str()?, f.get("message")?.as_str()?)))
    .collect();
  if fields.is_empty() {
    error.to_string()
  } else {
    format!("{error} ({})", fields.join("; "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_query_only_sends_set_params() {
    let q = ListQuery {
      level: Some(1),
      search: Some("dem".into()),
      ..Default::default()
    };
    assert_eq!(
      q.pairs(),
      vec![("level", "1".to_string()), ("search", "dem".to_string())]
    );
    assert!(ListQuery::default().pairs().is_empty());
  }

  #[test]
  fn url_joins_base_and_api_prefix() {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://localhost:8080/".into(),
      username: String::new(),
      password: String::new(),
    })
    .unwrap();
    assert_eq!(client.url("/identities"), "http://localhost:8080/api/identities");
  }

  #[test]
  fn error_message_lists_fields() {
    let body = r#"{"error":"validation failed","fields":[{"field":"color","message":"must be a hex colour like #1A2B3C"}]}"#;
    assert_eq!(
      error_message(body),
      "validation failed (color must be a hex colour like #1A2B3C)"
    );
    assert_eq!(error_message(r#"{"error":"not found"}"#), "not found");
    assert_eq!(error_message("Unauthorized"), "Unauthorized");
  }
}
