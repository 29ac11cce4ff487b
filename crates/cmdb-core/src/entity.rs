//! Entities and their attribute values.
//!
//! An entity is an instance of a schema; it carries no data of its own. Each
//! attribute value lives in its own row, and every write to a value is
//! mirrored into an append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datum::Datum;

/// An instance of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
  pub entity_id:  Uuid,
  pub schema_id:  Uuid,
  pub created_at: DateTime<Utc>,
}

/// The current value of one field for one entity. Multi-valued fields have
/// several rows per entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
  pub value_id:  Uuid,
  pub entity_id: Uuid,
  pub field_id:  Uuid,
  pub value:     Datum,
}

impl Value {
  pub fn new(entity_id: Uuid, field_id: Uuid, value: Datum) -> Self {
    Self { value_id: Uuid::new_v4(), entity_id, field_id, value }
  }

  /// Record this value as written (or, with `deleted`, as removed) at
  /// `recorded_at`.
  pub fn snapshot(&self, deleted: bool, recorded_at: DateTime<Utc>) -> ValueHistory {
    ValueHistory {
      history_id: Uuid::new_v4(),
      value_id: self.value_id,
      entity_id: self.entity_id,
      field_id: self.field_id,
      value: self.value.clone(),
      deleted,
      recorded_at,
    }
  }
}

/// An immutable snapshot of a [`Value`]. `deleted` marks a tombstone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueHistory {
  pub history_id:  Uuid,
  pub value_id:    Uuid,
  pub entity_id:   Uuid,
  pub field_id:    Uuid,
  pub value:       Datum,
  pub deleted:     bool,
  pub recorded_at: DateTime<Utc>,
}
