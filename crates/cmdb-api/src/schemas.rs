//! Handlers for `/schemas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/schemas` | Live schemas only |
//! | `POST`   | `/schemas` | Body: `{"name":"host","display":"Hosts"}`; `display` optional |
//! | `GET`    | `/schemas/:id` | 404 if not found; soft-deleted schemas are returned |
//! | `DELETE` | `/schemas/:id` | Soft delete; 409 if a field is referenced |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use cmdb_core::{
  schema::{NewSchema, Schema},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /schemas`
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Schema>>, ApiError> {
  let schemas = store.list_schemas().await.map_err(ApiError::store)?;
  Ok(Json(schemas))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /schemas`
pub async fn create<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewSchema>,
) -> Result<impl IntoResponse, ApiError> {
  let schema = store.create_schema(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(schema)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /schemas/:id`
pub async fn get_one<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Schema>, ApiError> {
  let schema = store
    .get_schema(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("schema {id} not found")))?;
  Ok(Json(schema))
}

// ─── Remove ───────────────────────────────────────────────────────────────────

/// `DELETE /schemas/:id`
pub async fn remove<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Schema>, ApiError> {
  let schema = store.remove_schema(id).await.map_err(ApiError::store)?;
  Ok(Json(schema))
}
