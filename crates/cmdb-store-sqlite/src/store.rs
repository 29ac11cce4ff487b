//! [`SqliteStore`] is the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use cmdb_core::{
  Classify as _, ErrorKind,
  datum::Datum,
  entity::{Entity, Value, ValueHistory},
  field::{Field, FieldHistory, FieldSpec},
  relationship::{Relationship, RelationshipRegistry},
  schema::{NewSchema, Schema},
  store::CatalogStore,
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Error, Result, evolve, rows, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A cmdb store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `op` inside a `BEGIN IMMEDIATE` transaction.
  ///
  /// The write lock is taken before the first read, so a check and the writes
  /// it guards cannot interleave with another writer. The transaction
  /// commits only when `op` succeeds; otherwise dropping it rolls back.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }
}

/// The current time at the precision timestamps are stored with, so records
/// returned from a mutation compare equal to the same records read back.
fn stamp() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// Log a rejected mutation. Caller mistakes are `warn`, everything else
/// `error`.
fn rejected(op: &'static str, err: &Error) {
  match err.kind() {
    ErrorKind::Transient | ErrorKind::Internal => {
      tracing::error!(op, kind = %err.kind(), error = %err, "mutation failed");
    }
    kind => warn!(op, %kind, error = %err, "mutation rejected"),
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Schemas ───────────────────────────────────────────────────────────────

  async fn create_schema(&self, input: NewSchema) -> Result<Schema> {
    let now = stamp();
    let schema = self
      .write(move |tx| evolve::create_schema(tx, input, now))
      .await
      .inspect_err(|e| rejected("create_schema", e))?;
    info!(schema_id = %schema.schema_id, name = %schema.name, "schema created");
    Ok(schema)
  }

  async fn get_schema(&self, id: Uuid) -> Result<Option<Schema>> {
    self.read(move |conn| rows::schema(conn, id)).await
  }

  async fn list_schemas(&self) -> Result<Vec<Schema>> {
    self.read(rows::live_schemas).await
  }

  async fn remove_schema(&self, id: Uuid) -> Result<Schema> {
    let schema = self
      .write(move |tx| evolve::remove_schema(tx, id))
      .await
      .inspect_err(|e| rejected("remove_schema", e))?;
    info!(schema_id = %id, "schema removed");
    Ok(schema)
  }

  // ── Fields ────────────────────────────────────────────────────────────────

  async fn add_field(&self, schema_id: Uuid, spec: FieldSpec) -> Result<Field> {
    let now = stamp();
    let field = self
      .write(move |tx| evolve::add_field(tx, schema_id, spec, now))
      .await
      .inspect_err(|e| rejected("add_field", e))?;
    info!(
      %schema_id,
      field_id = %field.field_id,
      name = %field.name,
      field_type = %field.field_type,
      required = field.required,
      "field added"
    );
    Ok(field)
  }

  async fn get_field(&self, id: Uuid) -> Result<Option<Field>> {
    self.read(move |conn| rows::field(conn, id)).await
  }

  async fn list_fields(&self, schema_id: Uuid) -> Result<Vec<Field>> {
    self
      .read(move |conn| {
        rows::live_schema(conn, schema_id)?;
        rows::live_fields(conn, schema_id)
      })
      .await
  }

  async fn change_field(&self, id: Uuid, spec: FieldSpec) -> Result<Field> {
    let now = stamp();
    let field = self
      .write(move |tx| evolve::change_field(tx, id, spec, now))
      .await
      .inspect_err(|e| rejected("change_field", e))?;
    info!(field_id = %id, name = %field.name, "field changed");
    Ok(field)
  }

  async fn remove_field(&self, id: Uuid) -> Result<Field> {
    let now = stamp();
    let field = self
      .write(move |tx| evolve::remove_field(tx, id, now))
      .await
      .inspect_err(|e| rejected("remove_field", e))?;
    info!(field_id = %id, "field removed");
    Ok(field)
  }

  async fn field_history(&self, id: Uuid) -> Result<Vec<FieldHistory>> {
    self.read(move |conn| rows::field_history(conn, id)).await
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  async fn relate(&self, source_id: Uuid, target_id: Uuid) -> Result<Relationship> {
    let edge = self
      .write(move |tx| evolve::relate(tx, source_id, target_id))
      .await
      .inspect_err(|e| rejected("relate", e))?;
    info!(%source_id, %target_id, "relationship recorded");
    Ok(edge)
  }

  async fn unrelate(&self, source_id: Uuid, target_id: Uuid) -> Result<bool> {
    let edge = Relationship::new(source_id, target_id);
    let removed = self
      .write(move |tx| rows::delete_relationship(tx, edge))
      .await
      .inspect_err(|e| rejected("unrelate", e))?;
    if removed {
      info!(%source_id, %target_id, "relationship removed");
    }
    Ok(removed)
  }

  async fn relationships(&self) -> Result<RelationshipRegistry> {
    let edges = self.read(rows::relationships).await?;
    Ok(edges.into_iter().collect())
  }

  // ── Entities and values ───────────────────────────────────────────────────

  async fn add_entity(&self, schema_id: Uuid) -> Result<Entity> {
    let now = stamp();
    let entity = self
      .write(move |tx| evolve::add_entity(tx, schema_id, now))
      .await
      .inspect_err(|e| rejected("add_entity", e))?;
    info!(%schema_id, entity_id = %entity.entity_id, "entity added");
    Ok(entity)
  }

  async fn list_entities(&self, schema_id: Uuid) -> Result<Vec<Entity>> {
    self
      .read(move |conn| {
        rows::live_schema(conn, schema_id)?;
        rows::entities(conn, schema_id)
      })
      .await
  }

  async fn set_value(&self, entity_id: Uuid, field_id: Uuid, raw: Datum) -> Result<Value> {
    let now = stamp();
    let value = self
      .write(move |tx| evolve::set_value(tx, entity_id, field_id, raw, now))
      .await
      .inspect_err(|e| rejected("set_value", e))?;
    info!(%entity_id, %field_id, value_id = %value.value_id, "value written");
    Ok(value)
  }

  async fn remove_value(&self, value_id: Uuid) -> Result<Value> {
    let now = stamp();
    let value = self
      .write(move |tx| evolve::remove_value(tx, value_id, now))
      .await
      .inspect_err(|e| rejected("remove_value", e))?;
    info!(%value_id, entity_id = %value.entity_id, "value removed");
    Ok(value)
  }

  async fn get_values(&self, entity_id: Uuid) -> Result<Vec<Value>> {
    self
      .read(move |conn| {
        rows::entity(conn, entity_id)?.ok_or_else(|| {
          cmdb_core::Error::not_found(cmdb_core::Resource::Entity, entity_id)
        })?;
        rows::entity_values(conn, entity_id)
      })
      .await
  }

  async fn value_history(
    &self,
    entity_id: Uuid,
    field_id: Option<Uuid>,
  ) -> Result<Vec<ValueHistory>> {
    self.read(move |conn| rows::value_history(conn, entity_id, field_id)).await
  }
}
