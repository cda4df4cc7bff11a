use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use polity_core::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

fn app() -> Router { api_router(Arc::new(MemoryStore::new())) }

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, value)
}

async fn create(app: &Router, body: Value) -> Value {
  let (status, value) = send(app, "POST", "/identities", Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "create failed: {value}");
  value
}

/// partisan(1) → democrat(2) → progressive(3); ideology(4) root.
async fn seeded() -> Router {
  let app = app();
  create(&app, json!({ "name": "Partisan", "color": "#112233" })).await;
  create(&app, json!({ "name": "Democrat", "parent_id": 1, "abbr": "D" })).await;
  create(&app, json!({ "name": "Progressive", "parent_id": 2 })).await;
  create(&app, json!({ "name": "Ideology" })).await;
  app
}

fn ids(list: &Value) -> Vec<i64> {
  list
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v["id"].as_i64().unwrap())
    .collect()
}

// ── Create ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_201_with_derived_fields() {
  let app = seeded().await;
  let (status, v) = send(&app, "GET", "/identities/3", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["slug"], "progressive");
  assert_eq!(v["path"], json!([1, 2]));
  assert_eq!(v["level"], 2);
  assert_eq!(v["color"], "#808080");
  assert_eq!(v["is_active"], true);
}

#[tokio::test]
async fn invalid_create_returns_400_with_every_field() {
  let app = app();
  let (status, v) = send(
    &app,
    "POST",
    "/identities",
    Some(json!({ "name": "", "slug": "Bad Slug", "color": "not-a-color" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let fields: Vec<&str> = v["fields"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["field"].as_str().unwrap())
    .collect();
  assert!(fields.contains(&"name"));
  assert!(fields.contains(&"slug"));
  assert!(fields.contains(&"color"));

  let (_, list) = send(&app, "GET", "/identities", None).await;
  assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn duplicate_slug_returns_409() {
  let app = seeded().await;
  let (status, _) = send(&app, "POST", "/identities", Some(json!({ "name": "Democrat" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_parent_returns_400() {
  let app = app();
  let (status, v) =
    send(&app, "POST", "/identities", Some(json!({ "name": "X", "parent_id": 42 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(v["error"].as_str().unwrap().contains("42"));
}

// ── Reads ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_by_slug_and_missing_returns_404() {
  let app = seeded().await;
  let (status, v) = send(&app, "GET", "/identities/democrat", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["id"], 2);

  let (status, _) = send(&app, "GET", "/identities/nobody", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&app, "GET", "/identities/99", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_and_pages() {
  let app = seeded().await;

  let (_, v) = send(&app, "GET", "/identities?category=partisan", None).await;
  assert_eq!(v["total"], 3);

  let (_, v) = send(&app, "GET", "/identities?search=PROG", None).await;
  assert_eq!(ids(&v["items"]), vec![3]);

  let (_, v) = send(&app, "GET", "/identities?level=0", None).await;
  assert_eq!(ids(&v["items"]), vec![4, 1]);

  let (_, v) = send(&app, "GET", "/identities?page=2&page_size=3", None).await;
  assert_eq!(v["total"], 4);
  assert_eq!(v["page"], 2);
  assert_eq!(v["items"].as_array().unwrap().len(), 1);

  let (status, _) = send(&app, "GET", "/identities?category=democrat", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "GET", "/identities?category=nope", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_descendants_and_ancestors() {
  let app = seeded().await;

  let (_, v) = send(&app, "GET", "/identities/categories", None).await;
  assert_eq!(ids(&v), vec![4, 1]);

  let (_, v) = send(&app, "GET", "/identities/1/descendants", None).await;
  assert_eq!(ids(&v), vec![2, 3]);

  let (_, v) = send(&app, "GET", "/identities/progressive/ancestors", None).await;
  assert_eq!(ids(&v), vec![1, 2]);

  let (status, _) = send(&app, "GET", "/identities/77/descendants", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hierarchy_nests_children() {
  let app = seeded().await;

  let (status, v) = send(&app, "GET", "/identities/hierarchy", None).await;
  assert_eq!(status, StatusCode::OK);
  let roots = v.as_array().unwrap();
  assert_eq!(roots.len(), 2);
  let partisan = roots.iter().find(|n| n["id"] == 1).unwrap();
  assert_eq!(partisan["children"][0]["children"][0]["slug"], "progressive");

  let (_, v) = send(&app, "GET", "/identities/hierarchy?root=democrat", None).await;
  assert_eq!(ids(&v), vec![2]);
  assert_eq!(v[0]["children"][0]["id"], 3);
}

// ── Writes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_updates_leaf_fields() {
  let app = seeded().await;
  let (status, v) = send(
    &app,
    "PATCH",
    "/identities/2",
    Some(json!({ "abbr": "DEM", "color": "#0000FF" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["abbr"], "DEM");
  assert_eq!(v["path"], json!([1]));

  let (status, v) = send(&app, "PATCH", "/identities/2", Some(json!({ "color": "blue" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(v["fields"][0]["field"], "color");
}

#[tokio::test]
async fn move_rewrites_subtree_and_rejects_cycles() {
  let app = seeded().await;

  let (status, _) =
    send(&app, "POST", "/identities/1/move", Some(json!({ "parent_id": 3 }))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, v) =
    send(&app, "POST", "/identities/2/move", Some(json!({ "parent_id": 4 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["path"], json!([4]));

  let (_, v) = send(&app, "GET", "/identities/3", None).await;
  assert_eq!(v["path"], json!([4, 2]));
  assert_eq!(v["level"], 2);

  let (status, v) =
    send(&app, "POST", "/identities/2/move", Some(json!({ "parent_id": null }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["level"], 0);
}

#[tokio::test]
async fn deactivate_and_activate() {
  let app = seeded().await;

  let (status, _) =
    send(&app, "POST", "/identities/1/deactivate", Some(json!({ "cascade": false }))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, v) =
    send(&app, "POST", "/identities/1/deactivate", Some(json!({ "cascade": true }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v.as_array().unwrap().len(), 3);

  let (_, v) = send(&app, "GET", "/identities", None).await;
  assert_eq!(ids(&v["items"]), vec![4]);
  let (_, v) = send(&app, "GET", "/identities?include_inactive=true", None).await;
  assert_eq!(v["total"], 4);

  let (status, v) = send(&app, "POST", "/identities/1/activate", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["is_active"], true);
  let (_, v) = send(&app, "GET", "/identities/2", None).await;
  assert_eq!(v["is_active"], false);
}
