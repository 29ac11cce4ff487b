//! Field definitions: the typed attributes of a schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, coerce, datum::Datum};

// ─── Field type ──────────────────────────────────────────────────────────────

/// The closed set of attribute types. Parsing is case-insensitive; unknown
/// names are rejected rather than mapped to `String`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FieldType {
  Int,
  Float,
  String,
  Datetime,
  Ip,
}

impl FieldType {
  pub fn parse(name: &str) -> Result<Self> {
    name
      .trim()
      .parse()
      .map_err(|_| Error::UnknownFieldType(name.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Requested definition ────────────────────────────────────────────────────

/// Input to [`crate::store::CatalogStore::add_field`] and
/// [`crate::store::CatalogStore::change_field`], as supplied by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
  pub name:       String,
  /// Defaults to `name` when absent.
  #[serde(default)]
  pub display:    Option<String>,
  /// Type name, e.g. `"ip"`. Case-insensitive.
  #[serde(rename = "type")]
  pub field_type: String,
  #[serde(default)]
  pub required:   bool,
  #[serde(default)]
  pub multi:      bool,
  #[serde(default)]
  pub unique:     bool,
  #[serde(default)]
  pub default:    Option<Datum>,
}

impl FieldSpec {
  pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
    Self {
      name:       name.into(),
      display:    None,
      field_type: field_type.into(),
      required:   false,
      multi:      false,
      unique:     false,
      default:    None,
    }
  }

  pub fn display(mut self, display: impl Into<String>) -> Self {
    self.display = Some(display.into());
    self
  }

  pub fn required(mut self, required: bool) -> Self {
    self.required = required;
    self
  }

  pub fn multi(mut self, multi: bool) -> Self {
    self.multi = multi;
    self
  }

  pub fn unique(mut self, unique: bool) -> Self {
    self.unique = unique;
    self
  }

  pub fn default_value(mut self, default: impl Into<Datum>) -> Self {
    self.default = Some(default.into());
    self
  }

  /// Resolve the type name and coerce the default, producing a definition
  /// that is internally valid. Population checks happen later.
  pub fn resolve(&self) -> Result<FieldDraft> {
    let name = self.name.trim();
    if name.is_empty() {
      return Err(Error::Invalid("field name must not be empty".into()));
    }
    let display = self.display.as_deref().map(str::trim).unwrap_or(name);
    if display.is_empty() {
      return Err(Error::Invalid("field display must not be empty".into()));
    }

    let field_type = FieldType::parse(&self.field_type)?;
    let default = self
      .default
      .as_ref()
      .map(|raw| coerce::coerce(field_type, raw))
      .transpose()?;

    Ok(FieldDraft {
      name: name.to_owned(),
      display: display.to_owned(),
      field_type,
      required: self.required,
      multi: self.multi,
      unique: self.unique,
      default,
    })
  }
}

/// A [`FieldSpec`] whose type is resolved and whose default is normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDraft {
  pub name:       String,
  pub display:    String,
  pub field_type: FieldType,
  pub required:   bool,
  pub multi:      bool,
  pub unique:     bool,
  pub default:    Option<Datum>,
}

// ─── Field ───────────────────────────────────────────────────────────────────

/// A persisted attribute definition belonging to exactly one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
  pub field_id:   Uuid,
  pub schema_id:  Uuid,
  pub name:       String,
  pub display:    String,
  #[serde(rename = "type")]
  pub field_type: FieldType,
  pub required:   bool,
  pub multi:      bool,
  pub unique:     bool,
  pub default:    Option<Datum>,
  pub deleted:    bool,
}

impl Field {
  pub fn from_draft(schema_id: Uuid, draft: FieldDraft) -> Self {
    Self {
      field_id: Uuid::new_v4(),
      schema_id,
      name: draft.name,
      display: draft.display,
      field_type: draft.field_type,
      required: draft.required,
      multi: draft.multi,
      unique: draft.unique,
      default: draft.default,
      deleted: false,
    }
  }

  /// Overwrite every mutable attribute with those of `draft`.
  pub fn apply(&mut self, draft: FieldDraft) {
    self.name = draft.name;
    self.display = draft.display;
    self.field_type = draft.field_type;
    self.required = draft.required;
    self.multi = draft.multi;
    self.unique = draft.unique;
    self.default = draft.default;
  }

  /// Capture the current attribute set as an audit record.
  pub fn snapshot(&self, recorded_at: DateTime<Utc>) -> FieldHistory {
    FieldHistory {
      history_id: Uuid::new_v4(),
      field_id: self.field_id,
      schema_id: self.schema_id,
      name: self.name.clone(),
      display: self.display.clone(),
      field_type: self.field_type,
      required: self.required,
      multi: self.multi,
      unique: self.unique,
      default: self.default.clone(),
      deleted: self.deleted,
      recorded_at,
    }
  }
}

/// An immutable snapshot of a [`Field`] at a point in time. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldHistory {
  pub history_id:  Uuid,
  pub field_id:    Uuid,
  pub schema_id:   Uuid,
  pub name:        String,
  pub display:     String,
  #[serde(rename = "type")]
  pub field_type:  FieldType,
  pub required:    bool,
  pub multi:       bool,
  pub unique:      bool,
  pub default:     Option<Datum>,
  pub deleted:     bool,
  pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn type_names_are_case_insensitive() {
    assert_eq!(FieldType::parse("IP").unwrap(), FieldType::Ip);
    assert_eq!(FieldType::parse("DateTime").unwrap(), FieldType::Datetime);
    assert_eq!(FieldType::Datetime.as_str(), "datetime");
  }

  #[test]
  fn unknown_type_name_is_rejected() {
    let err = FieldType::parse("bool").unwrap_err();
    assert!(matches!(err, Error::UnknownFieldType(ref n) if n == "bool"));
  }

  #[test]
  fn display_defaults_to_name() {
    let draft = FieldSpec::new("owner", "string").resolve().unwrap();
    assert_eq!(draft.display, "owner");
  }

  #[test]
  fn default_is_normalised_on_resolve() {
    let draft = FieldSpec::new("ip", "ip")
      .default_value("10.0.0.1")
      .resolve()
      .unwrap();
    assert_eq!(draft.default, Some(Datum::Int(0x0A00_0001)));
  }

  #[test]
  fn invalid_default_is_a_type_mismatch() {
    let err = FieldSpec::new("port", "int")
      .default_value("eighty")
      .resolve()
      .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { field_type: FieldType::Int, .. }));
  }

  #[test]
  fn blank_name_is_invalid() {
    assert!(matches!(
      FieldSpec::new("  ", "int").resolve(),
      Err(Error::Invalid(_))
    ));
  }
}
