//! Error types for `cmdb-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::field::FieldType;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Resource {
  Schema,
  Field,
  Entity,
  Value,
  Relationship,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{resource} {name:?} already exists")]
  Conflict { resource: Resource, name: String },

  #[error("{resource} not found: {id}")]
  NotFound { resource: Resource, id: Uuid },

  #[error("{value} is not a valid {field_type} value")]
  TypeMismatch { field_type: FieldType, value: String },

  #[error("constraint violation: {0}")]
  ConstraintViolation(#[from] Violation),

  #[error("unknown field type: {0:?}")]
  UnknownFieldType(String),

  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(resource: Resource, id: Uuid) -> Self {
    Self::NotFound { resource, id }
  }

  pub fn conflict(resource: Resource, name: impl Into<String>) -> Self {
    Self::Conflict { resource, name: name.into() }
  }
}

/// The data-consistency rule a rejected mutation would have broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("field {0} participates in a relationship")]
  FieldReferenced(Uuid),

  #[error("a required field added to a populated schema cannot be unique")]
  RequiredUniqueBackfill,

  #[error("a required field added to a populated schema needs a default")]
  RequiredWithoutDefault,

  #[error("field {field_id} holds {total} values but only {distinct} are distinct")]
  DuplicateValues { field_id: Uuid, total: u64, distinct: u64 },

  #[error("only {covered} of {entities} entities hold a value for field {field_id}")]
  IncompleteCoverage { field_id: Uuid, entities: u64, covered: u64 },

  #[error("{entities} entities hold more than one value for field {field_id}")]
  MultipleValues { field_id: Uuid, entities: u64 },

  #[error("{count} values of field {field_id} cannot be read as {field_type}")]
  IncompatibleValues { field_id: Uuid, field_type: FieldType, count: u64 },

  #[error("{value} is already held by another entity for unique field {field_id}")]
  ValueTaken { field_id: Uuid, value: String },

  #[error("field {0} is required and has no default")]
  MissingRequired(Uuid),

  #[error("field {0} is required; its last value cannot be removed")]
  RequiredValue(Uuid),

  #[error("field {field_id} does not belong to the schema of entity {entity_id}")]
  SchemaMismatch { field_id: Uuid, entity_id: Uuid },
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error category surfaced to callers of the store.
///
/// Only [`ErrorKind::Transient`] is worth retrying; every other kind reflects
/// caller input or a state conflict.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  Conflict,
  NotFound,
  TypeMismatch,
  ConstraintViolation,
  Invalid,
  Transient,
  Internal,
}

/// Implemented by every error a [`crate::store::CatalogStore`] can return.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Conflict { .. } => ErrorKind::Conflict,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
      Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
      Self::UnknownFieldType(_) | Self::Invalid(_) => ErrorKind::Invalid,
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
