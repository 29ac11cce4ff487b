//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode},
};
use cmdb_store_sqlite::SqliteStore;
use serde_json::{Value as Json, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  api_router(Arc::new(store))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Json>) -> (StatusCode, Json) {
  let request = Request::builder()
    .method(method)
    .uri(uri)
    .header("content-type", "application/json");
  let request = match body {
    Some(b) => request.body(Body::from(b.to_string())),
    None => request.body(Body::empty()),
  }
  .unwrap();

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Json::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

fn id(v: &Json, key: &str) -> String { v[key].as_str().unwrap().to_owned() }

#[tokio::test]
async fn backfill_through_the_api() {
  let app = app().await;

  let (status, schema) =
    send(&app, Method::POST, "/schemas", Some(json!({ "name": "host" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let schema_id = id(&schema, "schema_id");

  for _ in 0..3 {
    let (status, _) = send(
      &app,
      Method::POST,
      "/entities",
      Some(json!({ "schema_id": schema_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (status, field) = send(
    &app,
    Method::POST,
    &format!("/schemas/{schema_id}/fields"),
    Some(json!({ "name": "owner", "type": "STRING", "required": true, "default": "ops" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(field["type"], "string");

  let (_, entities) =
    send(&app, Method::GET, &format!("/schemas/{schema_id}/entities"), None).await;
  let entities = entities.as_array().unwrap();
  assert_eq!(entities.len(), 3);
  for entity in entities {
    let entity_id = id(entity, "entity_id");
    let (_, values) =
      send(&app, Method::GET, &format!("/entities/{entity_id}/values"), None).await;
    assert_eq!(values[0]["value"], "ops");
  }
}

#[tokio::test]
async fn error_kinds_map_to_statuses() {
  let app = app().await;

  let (_, schema) =
    send(&app, Method::POST, "/schemas", Some(json!({ "name": "host" }))).await;
  let schema_id = id(&schema, "schema_id");
  send(&app, Method::POST, "/entities", Some(json!({ "schema_id": schema_id }))).await;

  let (status, body) =
    send(&app, Method::POST, "/schemas", Some(json!({ "name": "host" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "conflict");

  let fields = format!("/schemas/{schema_id}/fields");
  let (status, body) = send(
    &app,
    Method::POST,
    &fields,
    Some(json!({ "name": "owner", "type": "string", "required": true, "unique": true, "default": "ops" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "constraint_violation");

  let (status, body) = send(
    &app,
    Method::POST,
    &fields,
    Some(json!({ "name": "ip", "type": "ip", "default": "300.1.1.1" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["kind"], "type_mismatch");

  let (status, body) = send(
    &app,
    Method::POST,
    &fields,
    Some(json!({ "name": "up", "type": "bool" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "invalid");

  let (status, _) = send(
    &app,
    Method::GET,
    "/fields/00000000-0000-0000-0000-000000000000",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn referenced_field_delete_is_refused() {
  let app = app().await;

  let (_, schema) =
    send(&app, Method::POST, "/schemas", Some(json!({ "name": "host" }))).await;
  let fields = format!("/schemas/{}/fields", id(&schema, "schema_id"));
  let (_, a) = send(&app, Method::POST, &fields, Some(json!({ "name": "a", "type": "int" }))).await;
  let (_, b) = send(&app, Method::POST, &fields, Some(json!({ "name": "b", "type": "int" }))).await;
  let (a, b) = (id(&a, "field_id"), id(&b, "field_id"));

  let (status, _) = send(
    &app,
    Method::POST,
    "/relationships",
    Some(json!({ "source_id": a, "target_id": b })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, _) = send(&app, Method::DELETE, &format!("/fields/{b}"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = send(
    &app,
    Method::DELETE,
    &format!("/relationships?source_id={a}&target_id={b}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, field) = send(&app, Method::DELETE, &format!("/fields/{b}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(field["deleted"], true);

  let (_, history) = send(&app, Method::GET, &format!("/fields/{b}/history"), None).await;
  assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn removed_schema_entities_are_not_found() {
  let app = app().await;

  let (_, schema) =
    send(&app, Method::POST, "/schemas", Some(json!({ "name": "host" }))).await;
  let schema_id = id(&schema, "schema_id");
  let entities = format!("/schemas/{schema_id}/entities");

  let (status, body) = send(&app, Method::GET, &entities, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([]));

  let (status, _) = send(&app, Method::DELETE, &format!("/schemas/{schema_id}"), None).await;
  assert!(status.is_success());

  let (status, body) = send(&app, Method::GET, &entities, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn missing_relationship_delete_is_not_found() {
  let app = app().await;
  let uri = format!(
    "/relationships?source_id={}&target_id={}",
    uuid::Uuid::new_v4(),
    uuid::Uuid::new_v4()
  );

  let (status, body) = send(&app, Method::DELETE, &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
}
