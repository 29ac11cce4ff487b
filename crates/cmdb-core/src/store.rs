//! The `CatalogStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `cmdb-store-sqlite`).
//! Higher layers (`cmdb-api`, `cmdb-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  datum::Datum,
  entity::{Entity, Value, ValueHistory},
  field::{Field, FieldHistory, FieldSpec},
  relationship::{Relationship, RelationshipRegistry},
  schema::{NewSchema, Schema},
};

/// Abstraction over a cmdb store backend.
///
/// Every mutating method is atomic: it either applies all of its writes,
/// including audit records, or none of them. All checks run before the
/// first write.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Schemas ───────────────────────────────────────────────────────────

  /// Create a schema. Fails with a conflict if the name or display label
  /// is held by another live schema.
  fn create_schema(
    &self,
    input: NewSchema,
  ) -> impl Future<Output = Result<Schema, Self::Error>> + Send + '_;

  /// Retrieve a schema by id, including soft-deleted ones.
  fn get_schema(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Schema>, Self::Error>> + Send + '_;

  /// List live schemas.
  fn list_schemas(
    &self,
  ) -> impl Future<Output = Result<Vec<Schema>, Self::Error>> + Send + '_;

  /// Soft-delete a schema. Every live field of the schema must be
  /// deletable.
  fn remove_schema(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Schema, Self::Error>> + Send + '_;

  // ── Fields ────────────────────────────────────────────────────────────

  /// Add a field to a live schema. When the field is required, every
  /// existing entity receives the default as its value.
  fn add_field(
    &self,
    schema_id: Uuid,
    spec: FieldSpec,
  ) -> impl Future<Output = Result<Field, Self::Error>> + Send + '_;

  /// Retrieve a field by id, including soft-deleted ones.
  fn get_field(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Field>, Self::Error>> + Send + '_;

  /// List the live fields of a schema.
  fn list_fields(
    &self,
    schema_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Field>, Self::Error>> + Send + '_;

  /// Replace a live field's definition. Tightened constraints are checked
  /// against the current values; a type change rewrites every value into
  /// the new type.
  fn change_field(
    &self,
    id: Uuid,
    spec: FieldSpec,
  ) -> impl Future<Output = Result<Field, Self::Error>> + Send + '_;

  /// Soft-delete a field that no relationship references.
  fn remove_field(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Field, Self::Error>> + Send + '_;

  /// Every recorded snapshot of a field, oldest first.
  fn field_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<FieldHistory>, Self::Error>> + Send + '_;

  // ── Relationships ─────────────────────────────────────────────────────

  /// Record an edge between two live fields. Idempotent.
  fn relate(
    &self,
    source_id: Uuid,
    target_id: Uuid,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  /// Remove an edge. Returns `false` if it did not exist.
  fn unrelate(
    &self,
    source_id: Uuid,
    target_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Load every edge into an adjacency registry.
  fn relationships(
    &self,
  ) -> impl Future<Output = Result<RelationshipRegistry, Self::Error>> + Send + '_;

  // ── Entities and values ───────────────────────────────────────────────

  /// Create an entity of a live schema, seeding every required field with
  /// its default. Fails if a required field has no default.
  fn add_entity(
    &self,
    schema_id: Uuid,
  ) -> impl Future<Output = Result<Entity, Self::Error>> + Send + '_;

  fn list_entities(
    &self,
    schema_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + '_;

  /// Write a value. For a single-valued field this replaces the entity's
  /// current value; for a multi-valued field it adds one.
  fn set_value(
    &self,
    entity_id: Uuid,
    field_id: Uuid,
    raw: Datum,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  /// Remove one value, leaving a tombstone in the history.
  fn remove_value(
    &self,
    value_id: Uuid,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  /// Current values of an entity, including those of soft-deleted fields.
  fn get_values(
    &self,
    entity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  /// Value history of one entity, optionally narrowed to one field, oldest
  /// first.
  fn value_history(
    &self,
    entity_id: Uuid,
    field_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ValueHistory>, Self::Error>> + Send + '_;
}
