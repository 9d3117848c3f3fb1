//! Execution view handed to system actions.
//!
//! A [`Rows`] exists for exactly one invocation. Column `0` is the entity
//! column; columns `1..=column_count()` follow the signature. Columns are
//! resolved on access against the live store, so a view stays valid while
//! the action mutates the world through [`Rows::world`]: windows are clamped
//! to the current table length and a row binding whose entity moved follows
//! it. Any column that cannot be resolved reads as `None`.

use std::any::Any;
use std::sync::Arc;

use engine_component::Entity;
use engine_signature::{ColumnDescriptor, ColumnOp, SourceKind};

use crate::system::{ColumnSource, System};
use crate::world::World;

/// What an invocation is bound to.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    /// A window of rows in one matched table.
    Table {
        table: usize,
        offset: usize,
        limit: usize,
        columns: Arc<[ColumnSource]>,
    },
    /// A single entity. Holds exactly one element.
    Row { entities: Vec<Entity> },
    /// No rows at all.
    Task,
}

/// A resolved column range.
#[derive(Debug, Clone, Copy)]
struct Slot {
    table: usize,
    column: usize,
    start: usize,
    end: usize,
}

/// The column view one action invocation reads and writes through.
pub struct Rows<'w> {
    world: &'w mut World,
    system: Entity,
    delta_time: f32,
    binding: Binding,
}

impl<'w> Rows<'w> {
    pub(crate) fn new(world: &'w mut World, system: Entity, delta_time: f32, binding: Binding) -> Self {
        Self {
            world,
            system,
            delta_time,
            binding,
        }
    }

    /// The running system.
    #[must_use]
    pub fn system(&self) -> Entity {
        self.system
    }

    /// Seconds since the previous frame.
    #[must_use]
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// The world, for reads and reentrant mutations.
    pub fn world(&mut self) -> &mut World {
        self.world
    }

    /// Number of columns the signature declares, not counting the entity
    /// column.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.descriptors().len()
    }

    /// Number of rows in view.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities().len()
    }

    /// The entities in view, one per row.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.entity_column()
            .map(|(entities, start, end)| &entities[start..end])
            .unwrap_or(&[])
    }

    /// The bound entity of a row invocation.
    #[must_use]
    pub fn entity(&self) -> Option<Entity> {
        match &self.binding {
            Binding::Row { entities } => entities.first().copied(),
            _ => None,
        }
    }

    /// Typed view of column `index`. Index `0` is the entity column.
    ///
    /// Columns read from the system entity (`SYSTEM.`) hold a single value
    /// shared by every row.
    #[must_use]
    pub fn column<T: 'static>(&self, index: usize) -> Option<&[T]> {
        if index == 0 {
            let (entities, start, end) = self.entity_column()?;
            let entities: &dyn Any = entities;
            return entities.downcast_ref::<Vec<T>>()?.get(start..end);
        }
        let slot = self.resolve(index)?;
        self.world
            .store
            .table(slot.table)?
            .column(slot.column)?
            .as_slice::<T>()?
            .get(slot.start..slot.end)
    }

    /// Mutable typed view of column `index`. The entity column is read-only.
    pub fn column_mut<T: 'static>(&mut self, index: usize) -> Option<&mut [T]> {
        let slot = self.resolve(index)?;
        self.world
            .store
            .table_mut(slot.table)?
            .column_mut(slot.column)?
            .as_mut_slice::<T>()?
            .get_mut(slot.start..slot.end)
    }

    /// Write column `write` while reading column `read`. Both must live in
    /// the same table.
    pub fn column_pair_mut<A: 'static, B: 'static>(
        &mut self,
        write: usize,
        read: usize,
    ) -> Option<(&mut [A], &[B])> {
        let w = self.resolve(write)?;
        let r = self.resolve(read)?;
        if w.table != r.table {
            return None;
        }
        let (wc, rc) = self
            .world
            .store
            .table_mut(w.table)?
            .column_pair_mut(w.column, r.column)?;
        let written = wc.as_mut_slice::<A>()?.get_mut(w.start..w.end)?;
        let values = rc.as_slice::<B>()?.get(r.start..r.end)?;
        Some((written, values))
    }

    /// The component column `index` refers to: the bound alternative for OR
    /// columns, `None` for optional columns that did not bind.
    #[must_use]
    pub fn component(&self, index: usize) -> Option<Entity> {
        let position = index.checked_sub(1)?;
        let descriptor = *self.descriptors().get(position)?;
        match &self.binding {
            Binding::Table { columns, .. } => columns.get(position)?.component(),
            Binding::Row { entities } => match descriptor.op {
                ColumnOp::Not(c) => Some(c),
                _ => self.row_component(*entities.first()?, position, descriptor),
            },
            Binding::Task => descriptor.component(),
        }
    }

    /// Returns `true` if column `index` reads from the system entity.
    #[must_use]
    pub fn is_shared(&self, index: usize) -> bool {
        index
            .checked_sub(1)
            .and_then(|position| self.descriptors().get(position))
            .is_some_and(|d| d.source == SourceKind::FromSystem)
    }

    fn descriptors(&self) -> &[ColumnDescriptor] {
        self.world
            .registry
            .get(self.system)
            .map(|s| s.signature().columns.as_slice())
            .unwrap_or(&[])
    }

    fn entity_column(&self) -> Option<(&Vec<Entity>, usize, usize)> {
        match &self.binding {
            Binding::Table {
                table,
                offset,
                limit,
                ..
            } => {
                let entities = self.world.store.table(*table)?.entities();
                let (start, end) = window(*offset, *limit, entities.len());
                Some((entities, start, end))
            }
            Binding::Row { entities } => Some((entities, 0, entities.len())),
            Binding::Task => None,
        }
    }

    /// The component a row invocation binds for column `position`.
    fn row_component(
        &self,
        entity: Entity,
        position: usize,
        descriptor: ColumnDescriptor,
    ) -> Option<Entity> {
        let store = &self.world.store;
        let component = match self.world.registry.get(self.system)? {
            System::Row(row) => row.components.get(position).copied()?,
            System::Col(_) => return None,
        };
        if component.is_valid() {
            return store.has(entity, component).then_some(component);
        }
        match descriptor.op {
            ColumnOp::Or(alternatives) => store
                .families()
                .members(alternatives)
                .iter()
                .copied()
                .find(|m| store.has(entity, *m)),
            _ => None,
        }
    }

    fn resolve(&self, index: usize) -> Option<Slot> {
        let position = index.checked_sub(1)?;
        let descriptor = *self.descriptors().get(position)?;
        let store = &self.world.store;
        match &self.binding {
            Binding::Table {
                table,
                offset,
                limit,
                columns,
            } => match *columns.get(position)? {
                ColumnSource::Table { column, .. } => {
                    let (start, end) = window(*offset, *limit, store.table(*table)?.len());
                    Some(Slot {
                        table: *table,
                        column,
                        start,
                        end,
                    })
                }
                ColumnSource::System(component) => {
                    let loc = store.location(self.system)?;
                    let column = store.table(loc.table)?.column_index(component)?;
                    Some(Slot {
                        table: loc.table,
                        column,
                        start: loc.row,
                        end: loc.row + 1,
                    })
                }
                ColumnSource::Id(_) | ColumnSource::Absent => None,
            },
            Binding::Row { entities } => {
                if descriptor.source != SourceKind::FromEntity {
                    return None;
                }
                let entity = *entities.first()?;
                let component = self.row_component(entity, position, descriptor)?;
                let loc = store.location(entity)?;
                let column = store.table(loc.table)?.column_index(component)?;
                Some(Slot {
                    table: loc.table,
                    column,
                    start: loc.row,
                    end: loc.row + 1,
                })
            }
            Binding::Task => None,
        }
    }
}

fn window(offset: usize, limit: usize, len: usize) -> (usize, usize) {
    let start = offset.min(len);
    let end = offset.saturating_add(limit).min(len);
    (start, end)
}
