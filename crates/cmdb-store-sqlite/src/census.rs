//! [`Census`]: the SQL side of [`Population`].

use cmdb_core::{constraint::Population, entity::Value};
use rusqlite::{Connection, Params};
use uuid::Uuid;

use crate::{Error, Result, encode::encode_uuid, rows};

/// Aggregate queries over the connection (usually an open transaction) that
/// a constraint check reads from.
pub struct Census<'c> {
  conn: &'c Connection,
}

impl<'c> Census<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn count(&self, sql: &str, params: impl Params) -> Result<u64> {
    let n: i64 = self.conn.query_row(sql, params, |r| r.get(0))?;
    Ok(n.max(0) as u64)
  }
}

impl Population for Census<'_> {
  type Error = Error;

  fn entity_count(&self, schema_id: Uuid) -> Result<u64> {
    self.count(
      "SELECT COUNT(*) FROM entities WHERE schema_id = ?1",
      [encode_uuid(schema_id)],
    )
  }

  fn value_count(&self, field_id: Uuid) -> Result<u64> {
    self.count(
      "SELECT COUNT(*) FROM attribute_values WHERE field_id = ?1",
      [encode_uuid(field_id)],
    )
  }

  fn distinct_value_count(&self, field_id: Uuid) -> Result<u64> {
    self.count(
      "SELECT COUNT(DISTINCT value) FROM attribute_values WHERE field_id = ?1",
      [encode_uuid(field_id)],
    )
  }

  fn covered_entity_count(&self, schema_id: Uuid, field_id: Uuid) -> Result<u64> {
    self.count(
      "SELECT COUNT(DISTINCT v.entity_id)
       FROM attribute_values v
       JOIN entities e ON e.entity_id = v.entity_id
       WHERE e.schema_id = ?1 AND v.field_id = ?2",
      [encode_uuid(schema_id), encode_uuid(field_id)],
    )
  }

  fn overfull_entity_count(&self, field_id: Uuid) -> Result<u64> {
    self.count(
      "SELECT COUNT(*) FROM (
         SELECT entity_id FROM attribute_values
         WHERE field_id = ?1
         GROUP BY entity_id
         HAVING COUNT(*) > 1
       )",
      [encode_uuid(field_id)],
    )
  }

  fn field_values(&self, field_id: Uuid) -> Result<Vec<Value>> {
    rows::field_values(self.conn, field_id)
  }

  fn is_referenced(&self, field_id: Uuid) -> Result<bool> {
    let n = self.count(
      "SELECT EXISTS (
         SELECT 1 FROM relationships WHERE source_id = ?1 OR target_id = ?1
       )",
      [encode_uuid(field_id)],
    )?;
    Ok(n > 0)
  }
}
