//! Handlers for field endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/schemas/:id/fields` | Live fields of a schema |
//! | `POST`   | `/schemas/:id/fields` | Body: [`FieldSpec`]; backfills required fields |
//! | `GET`    | `/fields/:id` | Includes soft-deleted fields |
//! | `PUT`    | `/fields/:id` | Body: [`FieldSpec`]; full replacement of the definition |
//! | `DELETE` | `/fields/:id` | Soft delete; 409 if referenced |
//! | `GET`    | `/fields/:id/history` | Oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use cmdb_core::{
  field::{Field, FieldHistory, FieldSpec},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /schemas/:id/fields`
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(schema_id): Path<Uuid>,
) -> Result<Json<Vec<Field>>, ApiError> {
  let fields = store.list_fields(schema_id).await.map_err(ApiError::store)?;
  Ok(Json(fields))
}

/// `POST /schemas/:id/fields`
pub async fn add<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(schema_id): Path<Uuid>,
  Json(spec): Json<FieldSpec>,
) -> Result<impl IntoResponse, ApiError> {
  let field = store
    .add_field(schema_id, spec)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(field)))
}

/// `GET /fields/:id`
pub async fn get_one<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Field>, ApiError> {
  let field = store
    .get_field(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("field {id} not found")))?;
  Ok(Json(field))
}

/// `PUT /fields/:id`
pub async fn change<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(spec): Json<FieldSpec>,
) -> Result<Json<Field>, ApiError> {
  let field = store.change_field(id, spec).await.map_err(ApiError::store)?;
  Ok(Json(field))
}

/// `DELETE /fields/:id`
pub async fn remove<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Field>, ApiError> {
  let field = store.remove_field(id).await.map_err(ApiError::store)?;
  Ok(Json(field))
}

/// `GET /fields/:id/history`
pub async fn history<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<FieldHistory>>, ApiError> {
  let history = store.field_history(id).await.map_err(ApiError::store)?;
  if history.is_empty() {
    return Err(ApiError::NotFound(format!("field {id} not found")));
  }
  Ok(Json(history))
}
