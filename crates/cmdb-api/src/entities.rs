//! Handlers for entity and value endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/entities` | Body: `{"schema_id":"..."}`; seeds required defaults |
//! | `GET`    | `/schemas/:id/entities` | |
//! | `GET`    | `/entities/:id/values` | Current values |
//! | `PUT`    | `/entities/:id/values` | Body: `{"field_id":"...","value":<json>}` |
//! | `GET`    | `/entities/:id/history` | Optional `?field_id=` |
//! | `DELETE` | `/values/:id` | Leaves a tombstone in the history |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cmdb_core::{
  datum::Datum,
  entity::{Entity, Value, ValueHistory},
  store::CatalogStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Entities ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub schema_id: Uuid,
}

/// `POST /entities`
pub async fn create<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let entity = store
    .add_entity(body.schema_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(entity)))
}

/// `GET /schemas/:id/entities`
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(schema_id): Path<Uuid>,
) -> Result<Json<Vec<Entity>>, ApiError> {
  let entities = store
    .list_entities(schema_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entities))
}

// ─── Values ───────────────────────────────────────────────────────────────────

/// `GET /entities/:id/values`
pub async fn values<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(entity_id): Path<Uuid>,
) -> Result<Json<Vec<Value>>, ApiError> {
  let values = store.get_values(entity_id).await.map_err(ApiError::store)?;
  Ok(Json(values))
}

#[derive(Debug, Deserialize)]
pub struct SetValueBody {
  pub field_id: Uuid,
  pub value:    Datum,
}

/// `PUT /entities/:id/values`
pub async fn set_value<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(entity_id): Path<Uuid>,
  Json(body): Json<SetValueBody>,
) -> Result<Json<Value>, ApiError> {
  let value = store
    .set_value(entity_id, body.field_id, body.value)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(value))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub field_id: Option<Uuid>,
}

/// `GET /entities/:id/history[?field_id=<id>]`
pub async fn history<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(entity_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ValueHistory>>, ApiError> {
  let history = store
    .value_history(entity_id, params.field_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(history))
}

/// `DELETE /values/:id`
pub async fn remove_value<S: CatalogStore>(
  State(store): State<Arc<S>>,
  Path(value_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
  let value = store.remove_value(value_id).await.map_err(ApiError::store)?;
  Ok(Json(value))
}
