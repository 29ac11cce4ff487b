//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond precision
//! so they sort lexically. Values and defaults are stored as canonical JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use cmdb_core::{
  datum::Datum,
  entity::{Entity, Value, ValueHistory},
  field::{Field, FieldHistory, FieldType},
  relationship::Relationship,
  schema::Schema,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_field_type(s: &str) -> Result<FieldType> {
  FieldType::parse(s).map_err(|_| Error::Corrupt(format!("unknown field type: {s:?}")))
}

pub fn encode_datum(d: &Datum) -> Result<String> { Ok(d.encode()?) }

pub fn decode_datum(s: &str) -> Result<Datum> {
  Datum::decode(s).map_err(|e| Error::Corrupt(format!("stored value {s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns read directly from a `schemas` row.
pub struct RawSchema {
  pub schema_id:  String,
  pub name:       String,
  pub display:    String,
  pub deleted:    bool,
  pub created_at: String,
}

impl RawSchema {
  pub const COLUMNS: &'static str = "schema_id, name, display, deleted, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      schema_id:  row.get(0)?,
      name:       row.get(1)?,
      display:    row.get(2)?,
      deleted:    row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_schema(self) -> Result<Schema> {
    Ok(Schema {
      schema_id:  decode_uuid(&self.schema_id)?,
      name:       self.name,
      display:    self.display,
      deleted:    self.deleted,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns read from a `fields` row.
pub struct RawField {
  pub field_id:      String,
  pub schema_id:     String,
  pub name:          String,
  pub display:       String,
  pub field_type:    String,
  pub required:      bool,
  pub multi:         bool,
  pub unique:        bool,
  pub default_value: Option<String>,
  pub deleted:       bool,
}

impl RawField {
  pub const COLUMNS: &'static str = "field_id, schema_id, name, display, field_type, \
                             required, multi, is_unique, default_value, deleted";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      field_id:      row.get(0)?,
      schema_id:     row.get(1)?,
      name:          row.get(2)?,
      display:       row.get(3)?,
      field_type:    row.get(4)?,
      required:      row.get(5)?,
      multi:         row.get(6)?,
      unique:        row.get(7)?,
      default_value: row.get(8)?,
      deleted:       row.get(9)?,
    })
  }

  pub fn into_field(self) -> Result<Field> {
    Ok(Field {
      field_id:   decode_uuid(&self.field_id)?,
      schema_id:  decode_uuid(&self.schema_id)?,
      name:       self.name,
      display:    self.display,
      field_type: decode_field_type(&self.field_type)?,
      required:   self.required,
      multi:      self.multi,
      unique:     self.unique,
      default:    self.default_value.as_deref().map(decode_datum).transpose()?,
      deleted:    self.deleted,
    })
  }
}

/// Raw columns read from a `field_history` row: a field row plus the
/// snapshot's own id and timestamp.
pub struct RawFieldHistory {
  pub history_id:  String,
  pub field:       RawField,
  pub recorded_at: String,
}

impl RawFieldHistory {
  pub const COLUMNS: &'static str = "history_id, field_id, schema_id, name, display, field_type, \
                             required, multi, is_unique, default_value, deleted, recorded_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:  row.get(0)?,
      field:       RawField {
        field_id:      row.get(1)?,
        schema_id:     row.get(2)?,
        name:          row.get(3)?,
        display:       row.get(4)?,
        field_type:    row.get(5)?,
        required:      row.get(6)?,
        multi:         row.get(7)?,
        unique:        row.get(8)?,
        default_value: row.get(9)?,
        deleted:       row.get(10)?,
      },
      recorded_at: row.get(11)?,
    })
  }

  pub fn into_history(self) -> Result<FieldHistory> {
    let history_id = decode_uuid(&self.history_id)?;
    let recorded_at = decode_dt(&self.recorded_at)?;
    let mut snapshot = self.field.into_field()?.snapshot(recorded_at);
    snapshot.history_id = history_id;
    Ok(snapshot)
  }
}

/// Raw columns read from an `entities` row.
pub struct RawEntity {
  pub entity_id:  String,
  pub schema_id:  String,
  pub created_at: String,
}

impl RawEntity {
  pub const COLUMNS: &'static str = "entity_id, schema_id, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id:  row.get(0)?,
      schema_id:  row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_entity(self) -> Result<Entity> {
    Ok(Entity {
      entity_id:  decode_uuid(&self.entity_id)?,
      schema_id:  decode_uuid(&self.schema_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns read from an `attribute_values` row.
pub struct RawValue {
  pub value_id:  String,
  pub entity_id: String,
  pub field_id:  String,
  pub value:     String,
}

impl RawValue {
  pub const COLUMNS: &'static str = "value_id, entity_id, field_id, value";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      value_id:  row.get(0)?,
      entity_id: row.get(1)?,
      field_id:  row.get(2)?,
      value:     row.get(3)?,
    })
  }

  pub fn into_value(self) -> Result<Value> {
    Ok(Value {
      value_id:  decode_uuid(&self.value_id)?,
      entity_id: decode_uuid(&self.entity_id)?,
      field_id:  decode_uuid(&self.field_id)?,
      value:     decode_datum(&self.value)?,
    })
  }
}

/// Raw columns read from a `value_history` row.
pub struct RawValueHistory {
  pub history_id:  String,
  pub value:       RawValue,
  pub deleted:     bool,
  pub recorded_at: String,
}

impl RawValueHistory {
  pub const COLUMNS: &'static str =
    "history_id, value_id, entity_id, field_id, value, deleted, recorded_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:  row.get(0)?,
      value:       RawValue {
        value_id:  row.get(1)?,
        entity_id: row.get(2)?,
        field_id:  row.get(3)?,
        value:     row.get(4)?,
      },
      deleted:     row.get(5)?,
      recorded_at: row.get(6)?,
    })
  }

  pub fn into_history(self) -> Result<ValueHistory> {
    let history_id = decode_uuid(&self.history_id)?;
    let recorded_at = decode_dt(&self.recorded_at)?;
    let mut snapshot = self.value.into_value()?.snapshot(self.deleted, recorded_at);
    snapshot.history_id = history_id;
    Ok(snapshot)
  }
}

/// Raw columns read from a `relationships` row.
pub struct RawRelationship {
  pub source_id: String,
  pub target_id: String,
}

impl RawRelationship {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { source_id: row.get(0)?, target_id: row.get(1)? })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship::new(
      decode_uuid(&self.source_id)?,
      decode_uuid(&self.target_id)?,
    ))
  }
}
