//! Families: canonical identifiers for sets of entities.
//!
//! A family is the set of components (or, more generally, entities) that an
//! entity carries. Two families with the same members always share one
//! [`FamilyId`], regardless of the order in which the members were added.
//! Families are immutable; adding a member to a family yields another
//! (possibly newly interned) family.
//!
//! Ids are dense and never retired, so the number of interned families doubles
//! as a watermark: everything at or above a previously observed length was
//! created since that observation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Canonical identifier for a set of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(pub u32);

impl FamilyId {
    /// The family without members.
    pub const EMPTY: FamilyId = FamilyId(0);

    /// Returns the id as an index into the registry.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for [`FamilyId::EMPTY`].
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Family({})", self.0)
    }
}

/// How [`FamilyRegistry::contains`] compares the two families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Every member of the sub-family must be present.
    All,
    /// At least one member of the sub-family must be present.
    Any,
}

/// Interning table for families.
///
/// Member lists are kept sorted and de-duplicated; `lookup` maps a member list
/// back to its id.
#[derive(Debug)]
pub struct FamilyRegistry {
    members: Vec<Vec<Entity>>,
    lookup: HashMap<Vec<Entity>, FamilyId>,
}

impl FamilyRegistry {
    /// Create a registry holding only the empty family.
    #[must_use]
    pub fn new() -> Self {
        let mut lookup = HashMap::new();
        lookup.insert(Vec::new(), FamilyId::EMPTY);
        Self {
            members: vec![Vec::new()],
            lookup,
        }
    }

    /// Number of families interned so far, including the empty family.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`: the empty family is interned on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over every interned family in creation order.
    pub fn iter(&self) -> impl Iterator<Item = FamilyId> + '_ {
        (0..self.members.len()).map(|i| FamilyId(i as u32))
    }

    /// Sorted members of `family`. Unknown ids have no members.
    #[must_use]
    pub fn members(&self, family: FamilyId) -> &[Entity] {
        self.members
            .get(family.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns `true` if `entity` is a member of `family`.
    #[must_use]
    pub fn has(&self, family: FamilyId, entity: Entity) -> bool {
        self.members(family).binary_search(&entity).is_ok()
    }

    /// Intern an arbitrary member list.
    pub fn intern(&mut self, members: &[Entity]) -> FamilyId {
        let mut sorted = members.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        self.intern_sorted(sorted)
    }

    fn intern_sorted(&mut self, sorted: Vec<Entity>) -> FamilyId {
        if let Some(&id) = self.lookup.get(&sorted) {
            return id;
        }
        let id = FamilyId(self.members.len() as u32);
        self.members.push(sorted.clone());
        self.lookup.insert(sorted, id);
        id
    }

    /// The family of `base` plus `entity`.
    pub fn union(&mut self, base: FamilyId, entity: Entity) -> FamilyId {
        let current = self.members(base);
        match current.binary_search(&entity) {
            Ok(_) => base,
            Err(pos) => {
                let mut next = current.to_vec();
                next.insert(pos, entity);
                self.intern_sorted(next)
            }
        }
    }

    /// The family holding the members of both `a` and `b`.
    pub fn merge(&mut self, a: FamilyId, b: FamilyId) -> FamilyId {
        if b.is_empty() || a == b {
            return a;
        }
        if a.is_empty() {
            return b;
        }
        let mut next = self.members(a).to_vec();
        next.extend_from_slice(self.members(b));
        next.sort_unstable();
        next.dedup();
        self.intern_sorted(next)
    }

    /// The members of `a` that are not in `b`.
    pub fn difference(&mut self, a: FamilyId, b: FamilyId) -> FamilyId {
        if b.is_empty() {
            return a;
        }
        let next: Vec<Entity> = self
            .members(a)
            .iter()
            .copied()
            .filter(|e| !self.has(b, *e))
            .collect();
        self.intern_sorted(next)
    }

    /// Test whether `container` holds the members of `sub`.
    ///
    /// With [`Containment::All`] an empty `sub` is always contained; with
    /// [`Containment::Any`] it never is.
    #[must_use]
    pub fn contains(&self, container: FamilyId, sub: FamilyId, mode: Containment) -> bool {
        if container == sub {
            return mode == Containment::All || !sub.is_empty();
        }
        let members = self.members(sub);
        match mode {
            Containment::All => members.iter().all(|e| self.has(container, *e)),
            Containment::Any => members.iter().any(|e| self.has(container, *e)),
        }
    }
}

impl Default for FamilyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The slice of the storage engine the signature compiler depends on.
///
/// Name resolution and family construction both live with storage; the
/// compiler only ever asks for them through this trait.
pub trait FamilyAlgebra {
    /// Resolve a component (or any named entity) by name.
    fn lookup(&self, name: &str) -> Option<Entity>;

    /// The family of `base` plus `component`.
    fn family_union(&mut self, base: FamilyId, component: Entity) -> FamilyId;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn test_union_is_order_independent() {
        let mut families = FamilyRegistry::new();
        let ab = families.union(FamilyId::EMPTY, e(1));
        let ab = families.union(ab, e(2));
        let ba = families.union(FamilyId::EMPTY, e(2));
        let ba = families.union(ba, e(1));
        assert_eq!(ab, ba);
        assert_eq!(families.members(ab), &[e(1), e(2)]);
    }

    #[test]
    fn test_union_with_existing_member_keeps_family() {
        let mut families = FamilyRegistry::new();
        let a = families.union(FamilyId::EMPTY, e(1));
        let len = families.len();
        assert_eq!(families.union(a, e(1)), a);
        assert_eq!(families.len(), len);
    }

    #[test]
    fn test_intern_dedups() {
        let mut families = FamilyRegistry::new();
        let id = families.intern(&[e(3), e(1), e(3)]);
        assert_eq!(families.members(id), &[e(1), e(3)]);
        assert_eq!(families.intern(&[]), FamilyId::EMPTY);
    }

    #[test]
    fn test_contains_all() {
        let mut families = FamilyRegistry::new();
        let required = families.intern(&[e(1), e(2)]);
        let exact = families.intern(&[e(2), e(1)]);
        let wider = families.intern(&[e(1), e(2), e(3)]);
        let missing = families.intern(&[e(1), e(3)]);

        assert!(families.contains(exact, required, Containment::All));
        assert!(families.contains(wider, required, Containment::All));
        assert!(!families.contains(missing, required, Containment::All));
        assert!(families.contains(missing, FamilyId::EMPTY, Containment::All));
    }

    #[test]
    fn test_contains_any() {
        let mut families = FamilyRegistry::new();
        let alternatives = families.intern(&[e(4), e(5)]);
        let with_one = families.intern(&[e(1), e(5)]);
        let with_none = families.intern(&[e(1), e(2)]);

        assert!(families.contains(with_one, alternatives, Containment::Any));
        assert!(!families.contains(with_none, alternatives, Containment::Any));
        assert!(!families.contains(with_one, FamilyId::EMPTY, Containment::Any));
    }

    #[test]
    fn test_merge_and_difference() {
        let mut families = FamilyRegistry::new();
        let a = families.intern(&[e(1), e(2)]);
        let b = families.intern(&[e(2), e(3)]);
        let merged = families.merge(a, b);
        assert_eq!(families.members(merged), &[e(1), e(2), e(3)]);
        let diff = families.difference(merged, b);
        assert_eq!(diff, families.intern(&[e(1)]));
        assert_eq!(families.difference(a, a), FamilyId::EMPTY);
    }

    #[test]
    fn test_ids_are_dense() {
        let mut families = FamilyRegistry::new();
        let a = families.intern(&[e(9)]);
        let b = families.intern(&[e(8)]);
        assert_eq!(a, FamilyId(1));
        assert_eq!(b, FamilyId(2));
        assert_eq!(families.iter().collect::<Vec<_>>(), vec![FamilyId::EMPTY, a, b]);
    }
}
