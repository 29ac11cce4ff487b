//! Transaction bodies for every mutation.
//!
//! Each function runs against the connection of an open transaction owned by
//! [`crate::SqliteStore`]: checks first, then writes. Returning `Err` from any
//! of them leaves the transaction uncommitted, which rolls back every write
//! already staged.

use chrono::{DateTime, TimeDelta, Utc};
use cmdb_core::{
  Error as CoreError, Resource, Violation, coerce,
  constraint::{self, Population as _},
  datum::Datum,
  entity::{Entity, Value},
  field::{Field, FieldSpec},
  relationship::Relationship,
  schema::{NewSchema, Schema},
};
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use crate::{Result, census::Census, rows};

// ─── Schemas ─────────────────────────────────────────────────────────────────

pub fn create_schema(
  conn: &Connection,
  input: NewSchema,
  now: DateTime<Utc>,
) -> Result<Schema> {
  let schema = input.into_schema(now)?;
  if let Some(taken) = rows::schema_conflict(conn, &schema.name, &schema.display)? {
    return Err(CoreError::conflict(Resource::Schema, taken).into());
  }
  rows::insert_schema(conn, &schema)?;
  Ok(schema)
}

pub fn remove_schema(conn: &Connection, schema_id: Uuid) -> Result<Schema> {
  let mut schema = rows::live_schema(conn, schema_id)?;
  let census = Census::new(conn);
  for field in rows::live_fields(conn, schema_id)? {
    constraint::field_deletable(&census, field.field_id)?;
  }
  rows::mark_schema_deleted(conn, schema_id)?;
  schema.deleted = true;
  Ok(schema)
}

// ─── Fields ──────────────────────────────────────────────────────────────────

pub fn add_field(
  conn: &Connection,
  schema_id: Uuid,
  spec: FieldSpec,
  now: DateTime<Utc>,
) -> Result<Field> {
  rows::live_schema(conn, schema_id)?;
  constraint::check_add_field(&Census::new(conn), schema_id, &spec)?;

  let draft = spec.resolve()?;
  if let Some(taken) =
    rows::field_conflict(conn, schema_id, &draft.name, &draft.display, None)?
  {
    return Err(CoreError::conflict(Resource::Field, taken).into());
  }

  let field = Field::from_draft(schema_id, draft);
  rows::insert_field(conn, &field)?;
  rows::insert_field_history(conn, &field.snapshot(now))?;

  if let (true, Some(default)) = (field.required, &field.default) {
    // Backfilled values are recorded strictly after the field snapshot.
    let backfilled_at = now + TimeDelta::microseconds(1);
    let entities = rows::entities(conn, schema_id)?;
    debug!(field_id = %field.field_id, entities = entities.len(), "backfilling default");
    for entity in entities {
      let value = Value::new(entity.entity_id, field.field_id, default.clone());
      write_value(conn, value, backfilled_at)?;
    }
  }

  Ok(field)
}

pub fn change_field(
  conn: &Connection,
  field_id: Uuid,
  spec: FieldSpec,
  now: DateTime<Utc>,
) -> Result<Field> {
  let mut field = rows::live_field(conn, field_id)?;
  let draft = spec.resolve()?;
  if let Some(taken) = rows::field_conflict(
    conn,
    field.schema_id,
    &draft.name,
    &draft.display,
    Some(field_id),
  )? {
    return Err(CoreError::conflict(Resource::Field, taken).into());
  }

  let rewrites = constraint::check_change_field(&Census::new(conn), &field, &draft)?;

  field.apply(draft);
  rows::update_field(conn, &field)?;
  rows::insert_field_history(conn, &field.snapshot(now))?;

  if !rewrites.is_empty() {
    debug!(%field_id, values = rewrites.len(), field_type = %field.field_type, "retyping values");
  }
  for value in rewrites {
    rows::update_value(conn, &value)?;
    rows::insert_value_history(conn, &value.snapshot(false, now))?;
  }

  Ok(field)
}

/// Soft-delete a field. Its values stay in place for audit, but the field
/// takes no new writes and drops out of every later check.
pub fn remove_field(
  conn: &Connection,
  field_id: Uuid,
  now: DateTime<Utc>,
) -> Result<Field> {
  let mut field = rows::live_field(conn, field_id)?;
  constraint::field_deletable(&Census::new(conn), field_id)?;

  field.deleted = true;
  rows::update_field(conn, &field)?;
  rows::insert_field_history(conn, &field.snapshot(now))?;
  Ok(field)
}

// ─── Relationships ───────────────────────────────────────────────────────────

pub fn relate(conn: &Connection, source_id: Uuid, target_id: Uuid) -> Result<Relationship> {
  rows::live_field(conn, source_id)?;
  rows::live_field(conn, target_id)?;
  let edge = Relationship::new(source_id, target_id);
  if !rows::insert_relationship(conn, edge)? {
    debug!(%source_id, %target_id, "relationship already present");
  }
  Ok(edge)
}

// ─── Entities and values ─────────────────────────────────────────────────────

pub fn add_entity(conn: &Connection, schema_id: Uuid, now: DateTime<Utc>) -> Result<Entity> {
  rows::live_schema(conn, schema_id)?;
  let census = Census::new(conn);

  let mut seeds = Vec::new();
  for field in rows::live_fields(conn, schema_id)? {
    if !field.required {
      continue;
    }
    let Some(default) = field.default else {
      return Err(Violation::MissingRequired(field.field_id).into());
    };
    if field.unique && census.value_count(field.field_id)? > 0 {
      return Err(
        Violation::ValueTaken { field_id: field.field_id, value: default.to_string() }.into(),
      );
    }
    seeds.push((field.field_id, default));
  }

  let entity = Entity { entity_id: Uuid::new_v4(), schema_id, created_at: now };
  rows::insert_entity(conn, &entity)?;
  for (field_id, default) in seeds {
    write_value(conn, Value::new(entity.entity_id, field_id, default), now)?;
  }
  Ok(entity)
}

pub fn set_value(
  conn: &Connection,
  entity_id: Uuid,
  field_id: Uuid,
  raw: Datum,
  now: DateTime<Utc>,
) -> Result<Value> {
  let entity = rows::entity(conn, entity_id)?
    .ok_or_else(|| CoreError::not_found(Resource::Entity, entity_id))?;
  let field = rows::live_field(conn, field_id)?;
  if field.schema_id != entity.schema_id {
    return Err(Violation::SchemaMismatch { field_id, entity_id }.into());
  }

  let datum = coerce::coerce(field.field_type, &raw)?;

  // A single-valued field overwrites the row it already has.
  let existing = if field.multi {
    None
  } else {
    rows::entity_field_values(conn, entity_id, field_id)?.into_iter().next()
  };

  if field.unique {
    let except = existing.as_ref().map(|v| v.value_id);
    if rows::value_taken(conn, field_id, &datum.encode()?, except)? {
      return Err(Violation::ValueTaken { field_id, value: datum.to_string() }.into());
    }
  }

  match existing {
    Some(mut value) => {
      value.value = datum;
      rows::update_value(conn, &value)?;
      rows::insert_value_history(conn, &value.snapshot(false, now))?;
      Ok(value)
    }
    None => write_value(conn, Value::new(entity_id, field_id, datum), now),
  }
}

pub fn remove_value(conn: &Connection, value_id: Uuid, now: DateTime<Utc>) -> Result<Value> {
  let value = rows::value(conn, value_id)?
    .ok_or_else(|| CoreError::not_found(Resource::Value, value_id))?;
  let field = rows::field(conn, value.field_id)?
    .ok_or_else(|| CoreError::not_found(Resource::Field, value.field_id))?;

  if field.required && !field.deleted {
    let held = rows::entity_field_values(conn, value.entity_id, value.field_id)?;
    if held.len() <= 1 {
      return Err(Violation::RequiredValue(field.field_id).into());
    }
  }

  rows::delete_value(conn, value_id)?;
  rows::insert_value_history(conn, &value.snapshot(true, now))?;
  Ok(value)
}

/// Insert a new value row together with its history record.
fn write_value(conn: &Connection, value: Value, now: DateTime<Utc>) -> Result<Value> {
  rows::insert_value(conn, &value)?;
  rows::insert_value_history(conn, &value.snapshot(false, now))?;
  Ok(value)
}
