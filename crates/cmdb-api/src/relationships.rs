//! Handlers for `/relationships`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/relationships` | Every edge |
//! | `POST`   | `/relationships` | Body: `{"source_id":"...","target_id":"..."}` |
//! | `DELETE` | `/relationships?source_id=..&target_id=..` | 404 if absent |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cmdb_core::{relationship::Relationship, store::CatalogStore};

use crate::error::ApiError;

/// `GET /relationships`
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Relationship>>, ApiError> {
  let registry = store.relationships().await.map_err(ApiError::store)?;
  Ok(Json(registry.edges()))
}

/// `POST /relationships`
pub async fn create<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<Relationship>,
) -> Result<impl IntoResponse, ApiError> {
  let edge = store
    .relate(body.source_id, body.target_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(edge)))
}

/// `DELETE /relationships?source_id=<id>&target_id=<id>`
pub async fn remove<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Query(edge): Query<Relationship>,
) -> Result<StatusCode, ApiError> {
  let removed = store
    .unrelate(edge.source_id, edge.target_id)
    .await
    .map_err(ApiError::store)?;
  if !removed {
    return Err(ApiError::NotFound(format!(
      "relationship {} -> {} not found",
      edge.source_id, edge.target_id
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}
