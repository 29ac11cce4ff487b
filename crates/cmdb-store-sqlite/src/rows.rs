//! Row-level reads and writes. Every function takes a plain connection so
//! it can run inside whatever transaction the caller holds.

use cmdb_core::{
  Error as CoreError, Resource,
  entity::{Entity, Value, ValueHistory},
  field::{Field, FieldHistory},
  relationship::Relationship,
  schema::Schema,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawEntity, RawField, RawFieldHistory, RawRelationship, RawSchema, RawValue,
    RawValueHistory, encode_datum, encode_dt, encode_uuid,
  },
};

// ─── Schemas ─────────────────────────────────────────────────────────────────

pub fn schema(conn: &Connection, id: Uuid) -> Result<Option<Schema>> {
  let sql = format!("SELECT {} FROM schemas WHERE schema_id = ?1", RawSchema::COLUMNS);
  conn
    .query_row(&sql, params![encode_uuid(id)], RawSchema::from_row)
    .optional()?
    .map(RawSchema::into_schema)
    .transpose()
}

/// A schema that exists and is not soft-deleted.
pub fn live_schema(conn: &Connection, id: Uuid) -> Result<Schema> {
  match schema(conn, id)? {
    Some(s) if !s.deleted => Ok(s),
    _ => Err(CoreError::not_found(Resource::Schema, id).into()),
  }
}

pub fn live_schemas(conn: &Connection) -> Result<Vec<Schema>> {
  let sql = format!(
    "SELECT {} FROM schemas WHERE deleted = 0 ORDER BY created_at, rowid",
    RawSchema::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map([], RawSchema::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSchema::into_schema).collect()
}

/// The first of `name`, `display` already held by a live schema.
pub fn schema_conflict(
  conn: &Connection,
  name: &str,
  display: &str,
) -> Result<Option<String>> {
  let name_taken = conn
    .query_row(
      "SELECT 1 FROM schemas WHERE deleted = 0 AND name = ?1",
      params![name],
      |_| Ok(()),
    )
    .optional()?;
  if name_taken.is_some() {
    return Ok(Some(name.to_owned()));
  }

  let display_taken = conn
    .query_row(
      "SELECT 1 FROM schemas WHERE deleted = 0 AND display = ?1",
      params![display],
      |_| Ok(()),
    )
    .optional()?;
  Ok(display_taken.map(|_| display.to_owned()))
}

pub fn insert_schema(conn: &Connection, s: &Schema) -> Result<()> {
  conn.execute(
    "INSERT INTO schemas (schema_id, name, display, deleted, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(s.schema_id),
      s.name,
      s.display,
      s.deleted,
      encode_dt(s.created_at),
    ],
  )?;
  Ok(())
}

pub fn mark_schema_deleted(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute(
    "UPDATE schemas SET deleted = 1 WHERE schema_id = ?1",
    params![encode_uuid(id)],
  )?;
  Ok(())
}

// ─── Fields ──────────────────────────────────────────────────────────────────

pub fn field(conn: &Connection, id: Uuid) -> Result<Option<Field>> {
  let sql = format!("SELECT {} FROM fields WHERE field_id = ?1", RawField::COLUMNS);
  conn
    .query_row(&sql, params![encode_uuid(id)], RawField::from_row)
    .optional()?
    .map(RawField::into_field)
    .transpose()
}

/// A field that exists, is not soft-deleted, and belongs to a live schema.
pub fn live_field(conn: &Connection, id: Uuid) -> Result<Field> {
  match field(conn, id)? {
    Some(f) if !f.deleted => {
      live_schema(conn, f.schema_id)?;
      Ok(f)
    }
    _ => Err(CoreError::not_found(Resource::Field, id).into()),
  }
}

pub fn live_fields(conn: &Connection, schema_id: Uuid) -> Result<Vec<Field>> {
  let sql = format!(
    "SELECT {} FROM fields WHERE schema_id = ?1 AND deleted = 0 ORDER BY rowid",
    RawField::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(schema_id)], RawField::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawField::into_field).collect()
}

/// The first of `name`, `display` already held by another live field of
/// `schema_id`. `except` excludes the field being renamed.
pub fn field_conflict(
  conn: &Connection,
  schema_id: Uuid,
  name: &str,
  display: &str,
  except: Option<Uuid>,
) -> Result<Option<String>> {
  let schema_id = encode_uuid(schema_id);
  let except = except.map(encode_uuid);

  for (column, wanted) in [("name", name), ("display", display)] {
    let sql = format!(
      "SELECT 1 FROM fields
       WHERE schema_id = ?1 AND deleted = 0 AND {column} = ?2
         AND (?3 IS NULL OR field_id != ?3)"
    );
    let taken = conn
      .query_row(&sql, params![schema_id, wanted, except], |_| Ok(()))
      .optional()?;
    if taken.is_some() {
      return Ok(Some(wanted.to_owned()));
    }
  }
  Ok(None)
}

pub fn insert_field(conn: &Connection, f: &Field) -> Result<()> {
  let default = f.default.as_ref().map(encode_datum).transpose()?;
  conn.execute(
    "INSERT INTO fields (
       field_id, schema_id, name, display, field_type,
       required, multi, is_unique, default_value, deleted
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(f.field_id),
      encode_uuid(f.schema_id),
      f.name,
      f.display,
      f.field_type.as_str(),
      f.required,
      f.multi,
      f.unique,
      default,
      f.deleted,
    ],
  )?;
  Ok(())
}

pub fn update_field(conn: &Connection, f: &Field) -> Result<()> {
  let default = f.default.as_ref().map(encode_datum).transpose()?;
  conn.execute(
    "UPDATE fields SET
       name = ?2, display = ?3, field_type = ?4, required = ?5,
       multi = ?6, is_unique = ?7, default_value = ?8, deleted = ?9
     WHERE field_id = ?1",
    params![
      encode_uuid(f.field_id),
      f.name,
      f.display,
      f.field_type.as_str(),
      f.required,
      f.multi,
      f.unique,
      default,
      f.deleted,
    ],
  )?;
  Ok(())
}

pub fn insert_field_history(conn: &Connection, h: &FieldHistory) -> Result<()> {
  let default = h.default.as_ref().map(encode_datum).transpose()?;
  conn.execute(
    "INSERT INTO field_history (
       history_id, field_id, schema_id, name, display, field_type,
       required, multi, is_unique, default_value, deleted, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      encode_uuid(h.history_id),
      encode_uuid(h.field_id),
      encode_uuid(h.schema_id),
      h.name,
      h.display,
      h.field_type.as_str(),
      h.required,
      h.multi,
      h.unique,
      default,
      h.deleted,
      encode_dt(h.recorded_at),
    ],
  )?;
  Ok(())
}

pub fn field_history(conn: &Connection, field_id: Uuid) -> Result<Vec<FieldHistory>> {
  let sql = format!(
    "SELECT {} FROM field_history WHERE field_id = ?1 ORDER BY recorded_at, rowid",
    RawFieldHistory::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(field_id)], RawFieldHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawFieldHistory::into_history).collect()
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// Returns `false` if the edge already existed.
pub fn insert_relationship(conn: &Connection, r: Relationship) -> Result<bool> {
  let changed = conn.execute(
    "INSERT OR IGNORE INTO relationships (source_id, target_id) VALUES (?1, ?2)",
    params![encode_uuid(r.source_id), encode_uuid(r.target_id)],
  )?;
  Ok(changed > 0)
}

pub fn delete_relationship(conn: &Connection, r: Relationship) -> Result<bool> {
  let changed = conn.execute(
    "DELETE FROM relationships WHERE source_id = ?1 AND target_id = ?2",
    params![encode_uuid(r.source_id), encode_uuid(r.target_id)],
  )?;
  Ok(changed > 0)
}

pub fn relationships(conn: &Connection) -> Result<Vec<Relationship>> {
  let mut stmt = conn.prepare("SELECT source_id, target_id FROM relationships")?;
  let raws = stmt
    .query_map([], RawRelationship::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRelationship::into_relationship).collect()
}

// ─── Entities ────────────────────────────────────────────────────────────────

pub fn entity(conn: &Connection, id: Uuid) -> Result<Option<Entity>> {
  let sql = format!("SELECT {} FROM entities WHERE entity_id = ?1", RawEntity::COLUMNS);
  conn
    .query_row(&sql, params![encode_uuid(id)], RawEntity::from_row)
    .optional()?
    .map(RawEntity::into_entity)
    .transpose()
}

pub fn entities(conn: &Connection, schema_id: Uuid) -> Result<Vec<Entity>> {
  let sql = format!(
    "SELECT {} FROM entities WHERE schema_id = ?1 ORDER BY created_at, rowid",
    RawEntity::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(schema_id)], RawEntity::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawEntity::into_entity).collect()
}

pub fn insert_entity(conn: &Connection, e: &Entity) -> Result<()> {
  conn.execute(
    "INSERT INTO entities (entity_id, schema_id, created_at) VALUES (?1, ?2, ?3)",
    params![
      encode_uuid(e.entity_id),
      encode_uuid(e.schema_id),
      encode_dt(e.created_at),
    ],
  )?;
  Ok(())
}

// ─── Values ──────────────────────────────────────────────────────────────────

fn values_where(conn: &Connection, filter: &str, args: &[&str]) -> Result<Vec<Value>> {
  let sql = format!(
    "SELECT {} FROM attribute_values WHERE {filter} ORDER BY rowid",
    RawValue::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params_from_iter(args), RawValue::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawValue::into_value).collect()
}

pub fn value(conn: &Connection, id: Uuid) -> Result<Option<Value>> {
  Ok(values_where(conn, "value_id = ?1", &[&encode_uuid(id)])?.pop())
}

pub fn entity_values(conn: &Connection, entity_id: Uuid) -> Result<Vec<Value>> {
  values_where(conn, "entity_id = ?1", &[&encode_uuid(entity_id)])
}

pub fn field_values(conn: &Connection, field_id: Uuid) -> Result<Vec<Value>> {
  values_where(conn, "field_id = ?1", &[&encode_uuid(field_id)])
}

pub fn entity_field_values(
  conn: &Connection,
  entity_id: Uuid,
  field_id: Uuid,
) -> Result<Vec<Value>> {
  values_where(
    conn,
    "entity_id = ?1 AND field_id = ?2",
    &[&encode_uuid(entity_id), &encode_uuid(field_id)],
  )
}

/// Whether some row other than `except` holds `encoded` for `field_id`.
pub fn value_taken(
  conn: &Connection,
  field_id: Uuid,
  encoded: &str,
  except: Option<Uuid>,
) -> Result<bool> {
  let taken = conn
    .query_row(
      "SELECT 1 FROM attribute_values
       WHERE field_id = ?1 AND value = ?2 AND (?3 IS NULL OR value_id != ?3)
       LIMIT 1",
      params![encode_uuid(field_id), encoded, except.map(encode_uuid)],
      |_| Ok(()),
    )
    .optional()?;
  Ok(taken.is_some())
}

pub fn insert_value(conn: &Connection, v: &Value) -> Result<()> {
  conn.execute(
    "INSERT INTO attribute_values (value_id, entity_id, field_id, value)
     VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(v.value_id),
      encode_uuid(v.entity_id),
      encode_uuid(v.field_id),
      encode_datum(&v.value)?,
    ],
  )?;
  Ok(())
}

pub fn update_value(conn: &Connection, v: &Value) -> Result<()> {
  conn.execute(
    "UPDATE attribute_values SET value = ?2 WHERE value_id = ?1",
    params![encode_uuid(v.value_id), encode_datum(&v.value)?],
  )?;
  Ok(())
}

pub fn delete_value(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute(
    "DELETE FROM attribute_values WHERE value_id = ?1",
    params![encode_uuid(id)],
  )?;
  Ok(())
}

pub fn insert_value_history(conn: &Connection, h: &ValueHistory) -> Result<()> {
  conn.execute(
    "INSERT INTO value_history (
       history_id, value_id, entity_id, field_id, value, deleted, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(h.history_id),
      encode_uuid(h.value_id),
      encode_uuid(h.entity_id),
      encode_uuid(h.field_id),
      encode_datum(&h.value)?,
      h.deleted,
      encode_dt(h.recorded_at),
    ],
  )?;
  Ok(())
}

pub fn value_history(
  conn: &Connection,
  entity_id: Uuid,
  field_id: Option<Uuid>,
) -> Result<Vec<ValueHistory>> {
  let sql = format!(
    "SELECT {} FROM value_history
     WHERE entity_id = ?1 AND (?2 IS NULL OR field_id = ?2)
     ORDER BY recorded_at, rowid",
    RawValueHistory::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(
      params![encode_uuid(entity_id), field_id.map(encode_uuid)],
      RawValueHistory::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawValueHistory::into_history).collect()
}
