//! Family to row-system index.
//!
//! One map per lifecycle kind, from a family to the triggers whose required
//! components that family satisfies. Row events are dispatched by looking up
//! the family of the components that changed. Buckets only ever grow, and
//! keep registration order.

use std::collections::HashMap;

use engine_component::{Containment, Entity, FamilyId, FamilyRegistry};
use engine_signature::Signature;
use tracing::debug;

use crate::kind::SystemKind;

/// Per-kind buckets of triggers.
#[derive(Debug, Default)]
pub struct FamilySystemIndex {
    on_add: HashMap<FamilyId, Vec<Entity>>,
    on_remove: HashMap<FamilyId, Vec<Entity>>,
    on_set: HashMap<FamilyId, Vec<Entity>>,
}

impl FamilySystemIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index_for(&self, kind: SystemKind) -> Option<&HashMap<FamilyId, Vec<Entity>>> {
        match kind {
            SystemKind::OnAdd => Some(&self.on_add),
            SystemKind::OnRemove => Some(&self.on_remove),
            SystemKind::OnSet => Some(&self.on_set),
            _ => None,
        }
    }

    fn index_for_mut(&mut self, kind: SystemKind) -> Option<&mut HashMap<FamilyId, Vec<Entity>>> {
        match kind {
            SystemKind::OnAdd => Some(&mut self.on_add),
            SystemKind::OnRemove => Some(&mut self.on_remove),
            SystemKind::OnSet => Some(&mut self.on_set),
            _ => None,
        }
    }

    /// The triggers registered for `(kind, family)`, in registration order.
    #[must_use]
    pub fn bucket(&self, kind: SystemKind, family: FamilyId) -> &[Entity] {
        self.index_for(kind)
            .and_then(|index| index.get(&family))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Test one trigger against one family and append it to the family's
    /// bucket on a match. Returns `true` on a match.
    pub fn match_family(
        &mut self,
        system: Entity,
        kind: SystemKind,
        signature: &Signature,
        family: FamilyId,
        families: &FamilyRegistry,
    ) -> bool {
        if family.is_empty() || !matches(signature, family, families) {
            return false;
        }
        let Some(index) = self.index_for_mut(kind) else {
            return false;
        };
        index.entry(family).or_default().push(system);
        debug!(%system, %family, kind = ?kind, "indexed trigger");
        true
    }

    /// Match a newly observed family against every trigger, in registration
    /// order.
    pub fn notify_new_family<'a>(
        &mut self,
        family: FamilyId,
        triggers: impl IntoIterator<Item = (Entity, SystemKind, &'a Signature)>,
        families: &FamilyRegistry,
    ) {
        for (system, kind, signature) in triggers {
            self.match_family(system, kind, signature, family, families);
        }
    }

    /// Match a newly registered trigger against every known family.
    pub fn backfill(
        &mut self,
        system: Entity,
        kind: SystemKind,
        signature: &Signature,
        families: &FamilyRegistry,
    ) -> usize {
        families
            .iter()
            .filter(|family| self.match_family(system, kind, signature, *family, families))
            .count()
    }
}

/// A family satisfies a trigger when it holds every `and_from_entity`
/// component. OR and NOT columns are checked against the live entity when the
/// trigger is dispatched.
fn matches(signature: &Signature, family: FamilyId, families: &FamilyRegistry) -> bool {
    families.contains(family, signature.and_from_entity, Containment::All)
}
