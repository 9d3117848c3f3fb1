//! System registry: classification and storage of registered systems.

use std::collections::HashMap;

use engine_component::Entity;
use engine_signature::Signature;

use crate::error::SystemError;
use crate::kind::SystemKind;
use crate::system::{RowRole, System};

/// The shape a new system takes, decided from its kind and signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Table,
    Row(RowRole),
}

/// Decide what a `(kind, signature)` pair registers as.
///
/// Signatures that read from the matched entity need tables: they become
/// table systems under a frame kind and triggers under a lifecycle kind.
/// Signatures that do not become tasks under `OnFrame`, finalizers under
/// `OnRemove` and manual systems under `Manual`. Anything else is rejected.
pub fn classify(kind: SystemKind, signature: &Signature) -> Result<Classification, SystemError> {
    let class = match (signature.needs_tables(), kind) {
        (true, k) if k.is_frame_kind() => Classification::Table,
        (true, k) if k.is_lifecycle() => Classification::Row(RowRole::Trigger),
        (false, SystemKind::OnFrame) => Classification::Row(RowRole::Task),
        (false, SystemKind::OnRemove) => Classification::Row(RowRole::Finalizer),
        (false, SystemKind::Manual) => Classification::Row(RowRole::Manual),
        _ => {
            return Err(SystemError::InvalidParameters {
                kind,
                signature: signature.expr.clone(),
            });
        }
    };
    if signature.has_system_columns() && class != Classification::Table {
        return Err(SystemError::InvalidComponentExpression(format!(
            "SYSTEM columns are only supported by table systems ('{}')",
            signature.expr
        )));
    }
    Ok(class)
}

/// Every registered system, keyed by its entity.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    systems: HashMap<Entity, System>,
    order: Vec<Entity>,
    table_systems: Vec<Entity>,
    triggers: Vec<Entity>,
    tasks: Vec<Entity>,
    finalizers: Vec<Entity>,
}

impl SystemRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, system: System) {
        let id = system.id();
        if self.systems.contains_key(&id) {
            return;
        }
        match &system {
            System::Col(_) => self.table_systems.push(id),
            System::Row(row) => match row.role {
                RowRole::Trigger => self.triggers.push(id),
                RowRole::Task => self.tasks.push(id),
                RowRole::Finalizer => self.finalizers.push(id),
                RowRole::Manual => {}
            },
        }
        self.order.push(id);
        self.systems.insert(id, system);
    }

    #[must_use]
    pub fn get(&self, id: Entity) -> Option<&System> {
        self.systems.get(&id)
    }

    pub fn get_mut(&mut self, id: Entity) -> Option<&mut System> {
        self.systems.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: Entity) -> bool {
        self.systems.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All systems in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &System> + '_ {
        self.order.iter().filter_map(|id| self.systems.get(id))
    }

    #[must_use]
    pub fn table_systems(&self) -> &[Entity] {
        &self.table_systems
    }

    #[must_use]
    pub fn triggers(&self) -> &[Entity] {
        &self.triggers
    }

    #[must_use]
    pub fn tasks(&self) -> &[Entity] {
        &self.tasks
    }

    #[must_use]
    pub fn finalizers(&self) -> &[Entity] {
        &self.finalizers
    }

    /// Triggers with their kind and signature, in registration order.
    pub fn trigger_signatures(&self) -> impl Iterator<Item = (Entity, SystemKind, &Signature)> + '_ {
        self.triggers.iter().filter_map(|id| {
            let system = self.systems.get(id)?;
            Some((*id, system.kind(), system.signature()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_component::Store;
    use engine_signature::compile;

    fn store() -> Store {
        let mut store = Store::new();
        store.register_component::<u32>("Position").unwrap();
        store.register_component::<u32>("Config").unwrap();
        store
    }

    fn class(kind: SystemKind, expr: &str) -> Result<Classification, SystemError> {
        let mut store = store();
        let sig = compile(expr, &mut store).unwrap();
        classify(kind, &sig)
    }

    #[test]
    fn test_table_systems() {
        for kind in [SystemKind::OnLoad, SystemKind::OnFrame, SystemKind::OnStore, SystemKind::OnDemand] {
            assert_eq!(class(kind, "Position"), Ok(Classification::Table));
        }
        assert_eq!(
            class(SystemKind::OnFrame, "Position, SYSTEM.Config"),
            Ok(Classification::Table)
        );
    }

    #[test]
    fn test_row_systems() {
        assert_eq!(
            class(SystemKind::OnAdd, "Position"),
            Ok(Classification::Row(RowRole::Trigger))
        );
        assert_eq!(class(SystemKind::OnFrame, "0"), Ok(Classification::Row(RowRole::Task)));
        assert_eq!(
            class(SystemKind::OnRemove, "0"),
            Ok(Classification::Row(RowRole::Finalizer))
        );
        assert_eq!(class(SystemKind::Manual, "0"), Ok(Classification::Row(RowRole::Manual)));
    }

    #[test]
    fn test_invalid_combinations() {
        assert!(matches!(
            class(SystemKind::OnAdd, "0"),
            Err(SystemError::InvalidParameters { kind: SystemKind::OnAdd, .. })
        ));
        assert!(matches!(
            class(SystemKind::OnSet, "0"),
            Err(SystemError::InvalidParameters { .. })
        ));
        assert!(matches!(
            class(SystemKind::PreFrame, "0"),
            Err(SystemError::InvalidParameters { .. })
        ));
        assert!(matches!(
            class(SystemKind::PostLoad, "Position"),
            Err(SystemError::InvalidParameters { kind: SystemKind::PostLoad, .. })
        ));
        assert!(matches!(
            class(SystemKind::PostLoad, "0"),
            Err(SystemError::InvalidParameters { .. })
        ));
        assert!(matches!(
            class(SystemKind::Manual, "Position"),
            Err(SystemError::InvalidParameters { .. })
        ));
        assert!(matches!(
            class(SystemKind::OnAdd, "Position, SYSTEM.Config"),
            Err(SystemError::InvalidComponentExpression(_))
        ));
    }
}
