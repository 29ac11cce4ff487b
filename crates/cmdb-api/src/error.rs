//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cmdb_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// A store error, keeping the kind it was classified as.
  #[error("{source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { kind: e.kind(), source: Box::new(e) }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Store { kind, .. } => *kind,
    }
  }
}

fn status(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Conflict | ErrorKind::ConstraintViolation => StatusCode::CONFLICT,
    ErrorKind::TypeMismatch => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Invalid => StatusCode::BAD_REQUEST,
    ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let message = match &self {
      ApiError::NotFound(m) => m.clone(),
      ApiError::Store { source, .. } => source.to_string(),
    };
    (status(kind), Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}
