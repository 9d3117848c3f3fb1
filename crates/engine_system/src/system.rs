//! System records.
//!
//! A system is an entity paired with a compiled signature and an action.
//! Table systems ([`ColSystem`]) run over whole tables once per frame or on
//! demand; row systems ([`RowSystem`]) run for one entity at a time in
//! response to lifecycle events, or without any entity as tasks.

use std::sync::Arc;
use std::time::Duration;

use engine_component::{Containment, Entity, FamilyId, Store, Table};
use engine_signature::{ColumnOp, Signature, SourceKind};

use crate::kind::SystemKind;
use crate::rows::Rows;

/// The behavior a system runs.
pub type Action = Arc<dyn Fn(&mut Rows<'_>) + Send + Sync>;

/// Fields shared by every system.
pub struct SystemBase {
    pub id: Entity,
    pub name: String,
    pub kind: SystemKind,
    pub signature: Signature,
    pub action: Action,
    pub enabled: bool,
    /// Component holding the user context, once set.
    pub ctx: Option<Entity>,
    pub time_spent: Duration,
    pub invocations: u64,
}

impl std::fmt::Debug for SystemBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("signature", &self.signature.expr)
            .field("enabled", &self.enabled)
            .field("invocations", &self.invocations)
            .finish_non_exhaustive()
    }
}

/// Where a table-system column reads its data from, for one matched table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// A physical column of the matched table.
    Table { column: usize, component: Entity },
    /// The single value stored on the system entity.
    System(Entity),
    /// A component that binds no data: tags, `ID.` and `!` columns.
    Id(Entity),
    /// An optional column whose component the table lacks.
    Absent,
}

impl ColumnSource {
    /// The component bound by this column, if any.
    #[must_use]
    pub fn component(self) -> Option<Entity> {
        match self {
            ColumnSource::Table { component, .. }
            | ColumnSource::System(component)
            | ColumnSource::Id(component) => Some(component),
            ColumnSource::Absent => None,
        }
    }
}

/// A table a [`ColSystem`] runs over, with its resolved column plan.
#[derive(Debug, Clone)]
pub struct MatchedTable {
    pub table: usize,
    pub columns: Arc<[ColumnSource]>,
}

/// A system that runs over tables.
#[derive(Debug)]
pub struct ColSystem {
    pub base: SystemBase,
    /// Matching tables, in the order they were discovered.
    pub tables: Vec<MatchedTable>,
    /// Seconds between runs. `0.0` runs every frame.
    pub period: f32,
    pub time_passed: f32,
}

/// What a [`RowSystem`] responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    /// Lifecycle trigger, dispatched through the family index.
    Trigger,
    /// Runs once per frame after the `OnFrame` phase.
    Task,
    /// Runs once when the world is torn down.
    Finalizer,
    /// Runs only on demand.
    Manual,
}

/// A system that runs for a single row, or for none.
#[derive(Debug)]
pub struct RowSystem {
    pub base: SystemBase,
    pub role: RowRole,
    /// The component of each column; [`Entity::INVALID`] for OR columns.
    pub components: Vec<Entity>,
}

#[derive(Debug)]
pub enum System {
    Col(ColSystem),
    Row(RowSystem),
}

impl System {
    #[must_use]
    pub fn base(&self) -> &SystemBase {
        match self {
            System::Col(s) => &s.base,
            System::Row(s) => &s.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut SystemBase {
        match self {
            System::Col(s) => &mut s.base,
            System::Row(s) => &mut s.base,
        }
    }

    #[must_use]
    pub fn id(&self) -> Entity {
        self.base().id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.base().name
    }

    #[must_use]
    pub fn kind(&self) -> SystemKind {
        self.base().kind
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.base().signature
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.base().enabled
    }

    /// Cumulative time spent in the action.
    #[must_use]
    pub fn time_spent(&self) -> Duration {
        self.base().time_spent
    }

    /// Number of times the action was invoked.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.base().invocations
    }

    /// Tables matched so far. Row systems have none.
    #[must_use]
    pub fn tables(&self) -> &[MatchedTable] {
        match self {
            System::Col(s) => &s.tables,
            System::Row(_) => &[],
        }
    }

    #[must_use]
    pub fn row_role(&self) -> Option<RowRole> {
        match self {
            System::Col(_) => None,
            System::Row(s) => Some(s.role),
        }
    }
}

/// Test `table` against a table system's signature and, if it matches, build
/// the column plan used to run over it.
///
/// A table matches when its family holds every `and_from_entity` component,
/// none of the `not_from_entity` components, at least one alternative of each
/// entity OR column, and none of its members carries a `not_from_component`
/// component.
#[must_use]
pub fn match_table(signature: &Signature, table: &Table, store: &Store) -> Option<Vec<ColumnSource>> {
    let families = store.families();
    let family = table.family();

    if !families.contains(family, signature.and_from_entity, Containment::All) {
        return None;
    }
    if families.contains(family, signature.not_from_entity, Containment::Any) {
        return None;
    }
    if excluded_by_component(store, family, signature.not_from_component) {
        return None;
    }

    let mut sources = Vec::with_capacity(signature.columns.len());
    for column in &signature.columns {
        let source = match (column.source, column.op) {
            (SourceKind::FromEntity, ColumnOp::And(c) | ColumnOp::Optional(c)) => {
                entity_source(table, c, families.has(family, c))
            }
            (SourceKind::FromEntity, ColumnOp::Or(alternatives)) => {
                let bound = families
                    .members(alternatives)
                    .iter()
                    .copied()
                    .find(|m| families.has(family, *m))?;
                entity_source(table, bound, true)
            }
            (SourceKind::FromSystem, ColumnOp::And(c)) => ColumnSource::System(c),
            (_, ColumnOp::Or(_)) => ColumnSource::Absent,
            (_, ColumnOp::And(c) | ColumnOp::Optional(c) | ColumnOp::Not(c)) => ColumnSource::Id(c),
        };
        sources.push(source);
    }
    Some(sources)
}

fn entity_source(table: &Table, component: Entity, present: bool) -> ColumnSource {
    match table.column_index(component) {
        Some(column) => ColumnSource::Table { column, component },
        None if present => ColumnSource::Id(component),
        None => ColumnSource::Absent,
    }
}

/// Returns `true` if any member of `family` itself carries a component of
/// `excluded`.
#[must_use]
pub fn excluded_by_component(store: &Store, family: FamilyId, excluded: FamilyId) -> bool {
    if excluded.is_empty() {
        return false;
    }
    let families = store.families();
    families.members(family).iter().any(|member| {
        families.contains(store.family_of(*member), excluded, Containment::Any)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_signature::compile;

    #[derive(Debug, Default)]
    struct Position;

    #[derive(Debug, Default)]
    struct Velocity;

    fn setup() -> (Store, Entity, Entity, Entity) {
        let mut store = Store::new();
        let p = store.register_component::<Position>("Position").unwrap();
        let v = store.register_component::<Velocity>("Velocity").unwrap();
        let frozen = store.register_tag("Frozen").unwrap();
        (store, p, v, frozen)
    }

    fn table_with(store: &mut Store, members: &[Entity]) -> usize {
        let family = store.families_mut().intern(members);
        let e = store.new_entity();
        store.add_family(e, family).unwrap();
        store.location(e).unwrap().table
    }

    #[test]
    fn test_match_requires_and_family() {
        let (mut store, p, v, _) = setup();
        let sig = compile("Position, Velocity", &mut store).unwrap();
        let both = table_with(&mut store, &[p, v]);
        let only_p = table_with(&mut store, &[p]);

        let plan = match_table(&sig, store.table(both).unwrap(), &store).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].component(), Some(p));
        assert_eq!(plan[1].component(), Some(v));
        assert!(match_table(&sig, store.table(only_p).unwrap(), &store).is_none());
    }

    #[test]
    fn test_match_excludes_not_family() {
        let (mut store, p, v, _) = setup();
        let sig = compile("Position, !Velocity", &mut store).unwrap();
        let both = table_with(&mut store, &[p, v]);
        let only_p = table_with(&mut store, &[p]);
        assert!(match_table(&sig, store.table(both).unwrap(), &store).is_none());
        let plan = match_table(&sig, store.table(only_p).unwrap(), &store).unwrap();
        assert_eq!(plan[1], ColumnSource::Id(v));
    }

    #[test]
    fn test_optional_and_tag_sources() {
        let (mut store, p, _, frozen) = setup();
        let sig = compile("Position, ?Velocity, Frozen", &mut store).unwrap();
        let table = table_with(&mut store, &[p, frozen]);
        let plan = match_table(&sig, store.table(table).unwrap(), &store).unwrap();
        assert!(matches!(plan[0], ColumnSource::Table { component, .. } if component == p));
        assert_eq!(plan[1], ColumnSource::Absent);
        assert_eq!(plan[2], ColumnSource::Id(frozen));
    }

    #[test]
    fn test_or_binds_first_present_member() {
        let (mut store, _, v, frozen) = setup();
        let sig = compile("Position || Velocity", &mut store).unwrap();
        let only_v = table_with(&mut store, &[v]);
        let neither = table_with(&mut store, &[frozen]);
        let plan = match_table(&sig, store.table(only_v).unwrap(), &store).unwrap();
        assert_eq!(plan[0].component(), Some(v));
        assert!(match_table(&sig, store.table(neither).unwrap(), &store).is_none());
    }

    #[test]
    fn test_not_from_component_checks_members() {
        let (mut store, p, v, frozen) = setup();
        let sig = compile("Position, !ID.Frozen", &mut store).unwrap();
        let table = table_with(&mut store, &[p, v]);
        assert!(match_table(&sig, store.table(table).unwrap(), &store).is_some());

        // Mark the Velocity component itself as frozen.
        let frozen_family = store.families_mut().intern(&[frozen]);
        store.add_family(v, frozen_family).unwrap();
        assert!(match_table(&sig, store.table(table).unwrap(), &store).is_none());
    }
}
