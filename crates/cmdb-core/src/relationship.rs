//! Directed reference edges between fields.
//!
//! A field that appears on either end of an edge cannot be deleted. The
//! registry keeps outbound and inbound adjacency sets so membership checks
//! are constant-time.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An edge `source_id -> target_id`. The pair is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
  pub source_id: Uuid,
  pub target_id: Uuid,
}

impl Relationship {
  pub fn new(source_id: Uuid, target_id: Uuid) -> Self {
    Self { source_id, target_id }
  }
}

/// Adjacency view over a set of [`Relationship`] edges.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
  outbound: HashMap<Uuid, HashSet<Uuid>>,
  inbound:  HashMap<Uuid, HashSet<Uuid>>,
}

impl RelationshipRegistry {
  pub fn new() -> Self { Self::default() }

  /// Add an edge. Returns `false` if it was already present.
  pub fn link(&mut self, source_id: Uuid, target_id: Uuid) -> bool {
    let added = self.outbound.entry(source_id).or_default().insert(target_id);
    self.inbound.entry(target_id).or_default().insert(source_id);
    added
  }

  /// Remove an edge. Returns `false` if it was not present.
  pub fn unlink(&mut self, source_id: Uuid, target_id: Uuid) -> bool {
    let removed = remove_edge(&mut self.outbound, source_id, target_id);
    remove_edge(&mut self.inbound, target_id, source_id);
    removed
  }

  pub fn contains(&self, source_id: Uuid, target_id: Uuid) -> bool {
    self
      .outbound
      .get(&source_id)
      .is_some_and(|targets| targets.contains(&target_id))
  }

  /// Whether `field_id` is the source or target of any edge.
  pub fn is_referenced(&self, field_id: Uuid) -> bool {
    self.outbound.contains_key(&field_id) || self.inbound.contains_key(&field_id)
  }

  /// Fields that `field_id` points at.
  pub fn targets_of(&self, field_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
    self.outbound.get(&field_id).into_iter().flatten().copied()
  }

  /// Fields that point at `field_id`.
  pub fn sources_of(&self, field_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
    self.inbound.get(&field_id).into_iter().flatten().copied()
  }

  pub fn edges(&self) -> Vec<Relationship> {
    let mut edges: Vec<Relationship> = self
      .outbound
      .iter()
      .flat_map(|(source, targets)| {
        targets.iter().map(|target| Relationship::new(*source, *target))
      })
      .collect();
    edges.sort_by_key(|r| (r.source_id, r.target_id));
    edges
  }

  pub fn len(&self) -> usize { self.outbound.values().map(HashSet::len).sum() }

  pub fn is_empty(&self) -> bool { self.outbound.is_empty() }
}

impl FromIterator<Relationship> for RelationshipRegistry {
  fn from_iter<I: IntoIterator<Item = Relationship>>(iter: I) -> Self {
    let mut registry = Self::new();
    for edge in iter {
      registry.link(edge.source_id, edge.target_id);
    }
    registry
  }
}

// Drop the key entirely once its set empties so `is_referenced` stays a
// plain key lookup.
fn remove_edge(
  map: &mut HashMap<Uuid, HashSet<Uuid>>,
  from: Uuid,
  to: Uuid,
) -> bool {
  let Some(set) = map.get_mut(&from) else {
    return false;
  };
  let removed = set.remove(&to);
  if set.is_empty() {
    map.remove(&from);
  }
  removed
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn both_ends_are_referenced() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut reg = RelationshipRegistry::new();
    assert!(reg.link(a, b));
    assert!(!reg.link(a, b));

    assert!(reg.is_referenced(a));
    assert!(reg.is_referenced(b));
    assert!(!reg.is_referenced(c));
    assert_eq!(reg.targets_of(a).collect::<Vec<_>>(), vec![b]);
    assert_eq!(reg.sources_of(b).collect::<Vec<_>>(), vec![a]);
    assert_eq!(reg.len(), 1);
  }

  #[test]
  fn unlink_releases_both_ends() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut reg: RelationshipRegistry =
      [Relationship::new(a, b)].into_iter().collect();

    assert!(reg.unlink(a, b));
    assert!(!reg.unlink(a, b));
    assert!(!reg.is_referenced(a));
    assert!(!reg.is_referenced(b));
    assert!(reg.is_empty());
  }

  #[test]
  fn self_edge_and_cycles_are_representable() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let reg: RelationshipRegistry = [
      Relationship::new(a, b),
      Relationship::new(b, a),
      Relationship::new(a, a),
    ]
    .into_iter()
    .collect();

    assert_eq!(reg.len(), 3);
    assert!(reg.contains(b, a));
    assert_eq!(reg.edges().len(), 3);
  }
}
