//! Admissibility checks for field mutations.
//!
//! Every check reads aggregates through [`Population`] and never writes. A
//! failed check is reported as [`Error::ConstraintViolation`] converted into
//! the population's own error type, so a backend can run the checks inside
//! the same transaction that will apply the mutation.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
  Error, Violation, coerce,
  entity::Value,
  field::{Field, FieldDraft, FieldSpec},
};

/// Read-only aggregate view of the current entities, values and
/// relationships, as seen from inside the transaction that will apply the
/// mutation.
pub trait Population {
  type Error: From<Error>;

  /// Entities belonging to `schema_id`.
  fn entity_count(&self, schema_id: Uuid) -> Result<u64, Self::Error>;

  /// Value rows for `field_id`.
  fn value_count(&self, field_id: Uuid) -> Result<u64, Self::Error>;

  /// Distinct values among the rows for `field_id`.
  fn distinct_value_count(&self, field_id: Uuid) -> Result<u64, Self::Error>;

  /// Entities of `schema_id` holding at least one value for `field_id`.
  fn covered_entity_count(
    &self,
    schema_id: Uuid,
    field_id: Uuid,
  ) -> Result<u64, Self::Error>;

  /// Entities holding more than one value for `field_id`.
  fn overfull_entity_count(&self, field_id: Uuid) -> Result<u64, Self::Error>;

  /// Every current value row for `field_id`.
  fn field_values(&self, field_id: Uuid) -> Result<Vec<Value>, Self::Error>;

  /// Whether `field_id` is either end of a relationship.
  fn is_referenced(&self, field_id: Uuid) -> Result<bool, Self::Error>;
}

fn violation<E: From<Error>>(v: Violation) -> E { Error::ConstraintViolation(v).into() }

/// A field may be deleted only while no relationship references it.
pub fn field_deletable<P: Population + ?Sized>(
  pop: &P,
  field_id: Uuid,
) -> Result<(), P::Error> {
  if pop.is_referenced(field_id)? {
    return Err(violation(Violation::FieldReferenced(field_id)));
  }
  Ok(())
}

/// Decide whether `spec` may be added to `schema_id`.
///
/// Runs on the raw spec, before its default is coerced: a required unique
/// field on a populated schema is refused whatever default it carries.
pub fn check_add_field<P: Population + ?Sized>(
  pop: &P,
  schema_id: Uuid,
  spec: &FieldSpec,
) -> Result<(), P::Error> {
  if !spec.required || pop.entity_count(schema_id)? == 0 {
    return Ok(());
  }
  if spec.unique {
    return Err(violation(Violation::RequiredUniqueBackfill));
  }
  if spec.default.is_none() {
    return Err(violation(Violation::RequiredWithoutDefault));
  }
  Ok(())
}

/// Decide whether `current` may become `proposed`.
///
/// On success, returns the values that must be rewritten because the field's
/// type changes; values already in normal form for the new type are omitted.
pub fn check_change_field<P: Population + ?Sized>(
  pop: &P,
  current: &Field,
  proposed: &FieldDraft,
) -> Result<Vec<Value>, P::Error> {
  let field_id = current.field_id;

  if proposed.unique && !current.unique {
    let total = pop.value_count(field_id)?;
    let distinct = pop.distinct_value_count(field_id)?;
    if total != distinct {
      return Err(violation(Violation::DuplicateValues { field_id, total, distinct }));
    }
  }

  // Coverage is judged against the multiplicity the field will have.
  if proposed.required && !current.required {
    let entities = pop.entity_count(current.schema_id)?;
    let covered = if proposed.multi {
      pop.covered_entity_count(current.schema_id, field_id)?
    } else {
      pop.value_count(field_id)?
    };
    if covered != entities {
      return Err(violation(Violation::IncompleteCoverage {
        field_id,
        entities,
        covered,
      }));
    }
  }

  if current.multi && !proposed.multi {
    let entities = pop.overfull_entity_count(field_id)?;
    if entities > 0 {
      return Err(violation(Violation::MultipleValues { field_id, entities }));
    }
  }

  if proposed.field_type == current.field_type {
    return Ok(Vec::new());
  }
  retype(pop, field_id, proposed)
}

fn retype<P: Population + ?Sized>(
  pop: &P,
  field_id: Uuid,
  proposed: &FieldDraft,
) -> Result<Vec<Value>, P::Error> {
  let values = pop.field_values(field_id)?;
  let total = values.len() as u64;

  let mut rejected = 0u64;
  let mut seen = HashSet::with_capacity(values.len());
  let mut rewrites = Vec::new();

  for mut value in values {
    let Some(normalised) = coerce::validate(proposed.field_type, &value.value) else {
      rejected += 1;
      continue;
    };
    seen.insert(normalised.encode()?);
    if normalised != value.value {
      value.value = normalised;
      rewrites.push(value);
    }
  }

  if rejected > 0 {
    return Err(violation(Violation::IncompatibleValues {
      field_id,
      field_type: proposed.field_type,
      count: rejected,
    }));
  }

  let distinct = seen.len() as u64;
  if proposed.unique && distinct != total {
    return Err(violation(Violation::DuplicateValues { field_id, total, distinct }));
  }

  Ok(rewrites)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;
  use crate::{
    datum::Datum,
    field::FieldType,
    relationship::RelationshipRegistry,
  };

  /// In-memory population keyed the same way the database is.
  #[derive(Default)]
  struct Fake {
    entities:      HashMap<Uuid, Vec<Uuid>>,
    values:        Vec<Value>,
    relationships: RelationshipRegistry,
  }

  impl Fake {
    fn with_entities(schema_id: Uuid, n: usize) -> Self {
      let ids = (0..n).map(|_| Uuid::new_v4()).collect();
      Self { entities: HashMap::from([(schema_id, ids)]), ..Self::default() }
    }

    fn entity(&self, schema_id: Uuid, i: usize) -> Uuid { self.entities[&schema_id][i] }

    fn put(&mut self, entity_id: Uuid, field_id: Uuid, value: impl Into<Datum>) {
      self.values.push(Value::new(entity_id, field_id, value.into()));
    }

    fn of(&self, field_id: Uuid) -> impl Iterator<Item = &Value> {
      self.values.iter().filter(move |v| v.field_id == field_id)
    }
  }

  impl Population for Fake {
    type Error = Error;

    fn entity_count(&self, schema_id: Uuid) -> Result<u64, Error> {
      Ok(self.entities.get(&schema_id).map_or(0, Vec::len) as u64)
    }

    fn value_count(&self, field_id: Uuid) -> Result<u64, Error> {
      Ok(self.of(field_id).count() as u64)
    }

    fn distinct_value_count(&self, field_id: Uuid) -> Result<u64, Error> {
      let set: HashSet<String> =
        self.of(field_id).map(|v| v.value.encode()).collect::<Result<_, _>>()?;
      Ok(set.len() as u64)
    }

    fn covered_entity_count(&self, schema_id: Uuid, field_id: Uuid) -> Result<u64, Error> {
      let owned = self.entities.get(&schema_id).cloned().unwrap_or_default();
      let set: HashSet<Uuid> = self
        .of(field_id)
        .map(|v| v.entity_id)
        .filter(|id| owned.contains(id))
        .collect();
      Ok(set.len() as u64)
    }

    fn overfull_entity_count(&self, field_id: Uuid) -> Result<u64, Error> {
      let mut counts: HashMap<Uuid, u64> = HashMap::new();
      for v in self.of(field_id) {
        *counts.entry(v.entity_id).or_default() += 1;
      }
      Ok(counts.values().filter(|n| **n > 1).count() as u64)
    }

    fn field_values(&self, field_id: Uuid) -> Result<Vec<Value>, Error> {
      Ok(self.of(field_id).cloned().collect())
    }

    fn is_referenced(&self, field_id: Uuid) -> Result<bool, Error> {
      Ok(self.relationships.is_referenced(field_id))
    }
  }

  fn field(schema_id: Uuid, field_type: FieldType) -> Field {
    Field::from_draft(
      schema_id,
      FieldSpec::new("f", field_type.as_str()).resolve().unwrap(),
    )
  }

  fn draft(f: &Field) -> FieldDraft {
    FieldDraft {
      name:       f.name.clone(),
      display:    f.display.clone(),
      field_type: f.field_type,
      required:   f.required,
      multi:      f.multi,
      unique:     f.unique,
      default:    f.default.clone(),
    }
  }

  fn rule(err: Error) -> Violation {
    match err {
      Error::ConstraintViolation(v) => v,
      other => panic!("expected a constraint violation, got {other:?}"),
    }
  }

  // ── Deletability ──────────────────────────────────────────────────────────

  #[test]
  fn referenced_field_is_not_deletable() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut pop = Fake::default();
    pop.relationships.link(a, b);

    assert_eq!(rule(field_deletable(&pop, a).unwrap_err()), Violation::FieldReferenced(a));
    assert_eq!(rule(field_deletable(&pop, b).unwrap_err()), Violation::FieldReferenced(b));
    field_deletable(&pop, c).unwrap();
  }

  // ── Adding fields ─────────────────────────────────────────────────────────

  #[test]
  fn required_unique_on_populated_schema_is_refused() {
    let schema = Uuid::new_v4();
    let pop = Fake::with_entities(schema, 2);
    let spec = FieldSpec::new("owner", "string")
      .required(true)
      .unique(true)
      .default_value("ops");

    assert_eq!(
      rule(check_add_field(&pop, schema, &spec).unwrap_err()),
      Violation::RequiredUniqueBackfill
    );

    // The default is not even looked at.
    let spec = spec.default_value(42i64);
    assert_eq!(
      rule(check_add_field(&pop, schema, &spec).unwrap_err()),
      Violation::RequiredUniqueBackfill
    );
  }

  #[test]
  fn required_without_default_on_populated_schema_is_refused() {
    let schema = Uuid::new_v4();
    let pop = Fake::with_entities(schema, 1);
    let spec = FieldSpec::new("owner", "string").required(true);

    assert_eq!(
      rule(check_add_field(&pop, schema, &spec).unwrap_err()),
      Violation::RequiredWithoutDefault
    );
  }

  #[test]
  fn empty_schema_accepts_any_required_field() {
    let schema = Uuid::new_v4();
    let pop = Fake::default();
    let spec = FieldSpec::new("serial", "string").required(true).unique(true);
    check_add_field(&pop, schema, &spec).unwrap();
  }

  // ── Changing fields ───────────────────────────────────────────────────────

  #[test]
  fn unique_needs_distinct_values() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let f = field(schema, FieldType::String);
    let (e0, e1) = (pop.entity(schema, 0), pop.entity(schema, 1));
    pop.put(e0, f.field_id, "a");
    pop.put(e1, f.field_id, "a");

    let mut want = draft(&f);
    want.unique = true;
    assert!(matches!(
      rule(check_change_field(&pop, &f, &want).unwrap_err()),
      Violation::DuplicateValues { total: 2, distinct: 1, .. }
    ));

    pop.values[1].value = "b".into();
    check_change_field(&pop, &f, &want).unwrap();
  }

  #[test]
  fn required_single_valued_needs_one_value_per_entity() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let f = field(schema, FieldType::Int);
    pop.put(pop.entity(schema, 0), f.field_id, 1i64);

    let mut want = draft(&f);
    want.required = true;
    assert!(matches!(
      rule(check_change_field(&pop, &f, &want).unwrap_err()),
      Violation::IncompleteCoverage { entities: 2, covered: 1, .. }
    ));

    pop.put(pop.entity(schema, 1), f.field_id, 2i64);
    check_change_field(&pop, &f, &want).unwrap();
  }

  #[test]
  fn required_multi_valued_needs_every_entity_covered() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let mut f = field(schema, FieldType::Int);
    f.multi = true;
    let e0 = pop.entity(schema, 0);
    pop.put(e0, f.field_id, 1i64);
    pop.put(e0, f.field_id, 2i64);

    let mut want = draft(&f);
    want.required = true;
    // Two values for two entities, but one entity holds both.
    assert!(matches!(
      rule(check_change_field(&pop, &f, &want).unwrap_err()),
      Violation::IncompleteCoverage { entities: 2, covered: 1, .. }
    ));

    pop.put(pop.entity(schema, 1), f.field_id, 3i64);
    check_change_field(&pop, &f, &want).unwrap();
  }

  #[test]
  fn collapsing_multi_needs_at_most_one_value_each() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let mut f = field(schema, FieldType::String);
    f.multi = true;
    let (e0, e1) = (pop.entity(schema, 0), pop.entity(schema, 1));
    pop.put(e0, f.field_id, "x");
    pop.put(e0, f.field_id, "y");
    pop.put(e1, f.field_id, "z");

    let mut want = draft(&f);
    want.multi = false;
    assert!(matches!(
      rule(check_change_field(&pop, &f, &want).unwrap_err()),
      Violation::MultipleValues { entities: 1, .. }
    ));

    pop.values.remove(1);
    check_change_field(&pop, &f, &want).unwrap();
  }

  #[test]
  fn turning_off_constraints_is_always_safe() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 1);
    let mut f = field(schema, FieldType::String);
    f.required = true;
    f.unique = true;
    pop.put(pop.entity(schema, 0), f.field_id, "x");

    let mut want = draft(&f);
    want.required = false;
    want.unique = false;
    want.multi = true;
    assert!(check_change_field(&pop, &f, &want).unwrap().is_empty());
  }

  // ── Retyping ──────────────────────────────────────────────────────────────

  #[test]
  fn retype_rewrites_convertible_values() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let f = field(schema, FieldType::String);
    pop.put(pop.entity(schema, 0), f.field_id, "10.0.0.1");
    pop.put(pop.entity(schema, 1), f.field_id, "10.0.0.2");

    let mut want = draft(&f);
    want.field_type = FieldType::Ip;
    let rewrites = check_change_field(&pop, &f, &want).unwrap();
    assert_eq!(rewrites.len(), 2);
    assert_eq!(rewrites[0].value, Datum::Int(0x0A00_0001));
    assert_eq!(rewrites[0].value_id, pop.values[0].value_id);
  }

  #[test]
  fn retype_refuses_unconvertible_values() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let f = field(schema, FieldType::String);
    pop.put(pop.entity(schema, 0), f.field_id, "10.0.0.1");
    pop.put(pop.entity(schema, 1), f.field_id, "gateway");

    let mut want = draft(&f);
    want.field_type = FieldType::Ip;
    assert!(matches!(
      rule(check_change_field(&pop, &f, &want).unwrap_err()),
      Violation::IncompatibleValues { field_type: FieldType::Ip, count: 1, .. }
    ));
  }

  #[test]
  fn retype_of_unique_field_refuses_collisions() {
    let schema = Uuid::new_v4();
    let mut pop = Fake::with_entities(schema, 2);
    let mut f = field(schema, FieldType::Float);
    f.unique = true;
    pop.put(pop.entity(schema, 0), f.field_id, 1_700_000_000.25);
    pop.put(pop.entity(schema, 1), f.field_id, 1_700_000_001.5);

    let mut want = draft(&f);
    want.field_type = FieldType::Datetime;
    let rewrites = check_change_field(&pop, &f, &want).unwrap();
    assert_eq!(rewrites[1].value, Datum::Int(1_700_000_001));

    // Distinct as floats, but the same second once read as dates.
    pop.values[1].value = Datum::Float(1_700_000_000.75);
    assert!(matches!(
      rule(check_change_field(&pop, &f, &want).unwrap_err()),
      Violation::DuplicateValues { total: 2, distinct: 1, .. }
    ));
  }
}
