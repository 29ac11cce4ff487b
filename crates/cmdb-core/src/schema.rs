//! Schema: a named record type that owns a set of fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A record type. Schemas are soft-deleted, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
  pub schema_id:  Uuid,
  pub name:       String,
  pub display:    String,
  pub deleted:    bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_schema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchema {
  pub name:    String,
  /// Defaults to `name` when absent.
  #[serde(default)]
  pub display: Option<String>,
}

impl NewSchema {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), display: None }
  }

  pub fn display(mut self, display: impl Into<String>) -> Self {
    self.display = Some(display.into());
    self
  }

  /// Build the schema row, trimming names and filling in the display label.
  pub fn into_schema(self, created_at: DateTime<Utc>) -> Result<Schema> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::Invalid("schema name must not be empty".into()));
    }
    let display = match self.display {
      Some(d) if !d.trim().is_empty() => d.trim().to_owned(),
      Some(_) => {
        return Err(Error::Invalid("schema display must not be empty".into()));
      }
      None => name.clone(),
    };

    Ok(Schema {
      schema_id: Uuid::new_v4(),
      name,
      display,
      deleted: false,
      created_at,
    })
  }
}
