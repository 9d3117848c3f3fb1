//! In-memory table store.
//!
//! The [`Store`] owns entity allocation, the name index, component metadata,
//! the family registry and one [`Table`] per populated family. It knows
//! nothing about systems: whoever drives it observes new families and new
//! tables through their dense ids ([`Store::family_count`],
//! [`Store::table_count`]) and reacts to them.

use std::collections::HashMap;

use tracing::debug;

use crate::component::ComponentInfo;
use crate::entity::{Entity, EntityAllocator};
use crate::error::StoreError;
use crate::family::{FamilyAlgebra, FamilyId, FamilyRegistry};
use crate::table::{Column, Table};

/// Where an entity's row lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Index of the table.
    pub table: usize,
    /// Row within the table.
    pub row: usize,
}

/// Entity, component and table storage.
#[derive(Debug)]
pub struct Store {
    allocator: EntityAllocator,
    /// Live entities. `None` until the entity carries at least one member.
    records: HashMap<Entity, Option<Location>>,
    names: HashMap<String, Entity>,
    entity_names: HashMap<Entity, String>,
    components: HashMap<Entity, ComponentInfo>,
    aliases: HashMap<Entity, FamilyId>,
    families: FamilyRegistry,
    tables: Vec<Table>,
    table_by_family: HashMap<FamilyId, usize>,
}

impl Store {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            records: HashMap::new(),
            names: HashMap::new(),
            entity_names: HashMap::new(),
            components: HashMap::new(),
            aliases: HashMap::new(),
            families: FamilyRegistry::new(),
            tables: Vec::new(),
            table_by_family: HashMap::new(),
        }
    }

    // -- Entities --

    /// Allocate an anonymous entity without members.
    pub fn new_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.records.insert(entity, None);
        entity
    }

    /// Allocate an entity bound to `name`.
    pub fn new_named(&mut self, name: &str) -> Result<Entity, StoreError> {
        if self.names.contains_key(name) {
            return Err(StoreError::NameTaken(name.to_string()));
        }
        let entity = self.new_entity();
        self.names.insert(name.to_string(), entity);
        self.entity_names.insert(entity, name.to_string());
        Ok(entity)
    }

    /// Resolve a name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.names.get(name).copied()
    }

    /// The name bound to `entity`, if any.
    #[must_use]
    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.entity_names.get(&entity).map(String::as_str)
    }

    /// Returns `true` if `entity` was allocated and not deleted.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.records.len()
    }

    /// Delete an entity and its row. Returns `true` if it existed.
    pub fn delete(&mut self, entity: Entity) -> bool {
        let Some(location) = self.records.remove(&entity) else {
            return false;
        };
        if let Some(loc) = location {
            let moved = self.tables[loc.table].swap_remove(loc.row);
            self.relocate(moved, loc);
        }
        if let Some(name) = self.entity_names.remove(&entity) {
            self.names.remove(&name);
        }
        self.aliases.remove(&entity);
        true
    }

    // -- Components --

    /// Register a data-carrying component under `name`.
    ///
    /// Registering the same name with the same type again returns the
    /// existing component.
    pub fn register_component<T: Default + Send + Sync + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Entity, StoreError> {
        if let Some(existing) = self.lookup(name) {
            return match self.components.get(&existing) {
                Some(info) if info.is::<T>() => Ok(existing),
                _ => Err(StoreError::NameTaken(name.to_string())),
            };
        }
        let entity = self.new_named(name)?;
        self.components
            .insert(entity, ComponentInfo::of::<T>(entity, name));
        Ok(entity)
    }

    /// Register a component without storage under `name`.
    pub fn register_tag(&mut self, name: &str) -> Result<Entity, StoreError> {
        if let Some(existing) = self.lookup(name) {
            return match self.components.get(&existing) {
                Some(info) if !info.has_storage() => Ok(existing),
                _ => Err(StoreError::NameTaken(name.to_string())),
            };
        }
        let entity = self.new_named(name)?;
        self.components.insert(entity, ComponentInfo::tag(entity, name));
        Ok(entity)
    }

    /// Metadata for a registered component.
    #[must_use]
    pub fn component_info(&self, component: Entity) -> Option<&ComponentInfo> {
        self.components.get(&component)
    }

    // -- Family aliases --

    /// Bind `name` to a new entity standing for `family`.
    pub fn new_alias(&mut self, name: &str, family: FamilyId) -> Result<Entity, StoreError> {
        let entity = self.new_named(name)?;
        self.aliases.insert(entity, family);
        Ok(entity)
    }

    /// The family an alias entity stands for.
    #[must_use]
    pub fn alias_family(&self, entity: Entity) -> Option<FamilyId> {
        self.aliases.get(&entity).copied()
    }

    // -- Families --

    /// The family registry.
    #[must_use]
    pub fn families(&self) -> &FamilyRegistry {
        &self.families
    }

    /// The family registry, for interning.
    pub fn families_mut(&mut self) -> &mut FamilyRegistry {
        &mut self.families
    }

    /// Number of families interned so far.
    #[must_use]
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// The family `entity` currently carries. Unknown entities have none.
    #[must_use]
    pub fn family_of(&self, entity: Entity) -> FamilyId {
        self.location(entity)
            .map(|loc| self.tables[loc.table].family())
            .unwrap_or(FamilyId::EMPTY)
    }

    /// Returns `true` if `entity` carries `member`.
    #[must_use]
    pub fn has(&self, entity: Entity, member: Entity) -> bool {
        self.families.has(self.family_of(entity), member)
    }

    // -- Tables --

    /// Where `entity` is stored.
    #[must_use]
    pub fn location(&self, entity: Entity) -> Option<Location> {
        self.records.get(&entity).copied().flatten()
    }

    /// Number of tables created so far.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// The table at `index`.
    #[must_use]
    pub fn table(&self, index: usize) -> Option<&Table> {
        self.tables.get(index)
    }

    /// The table at `index`, mutably.
    #[must_use]
    pub fn table_mut(&mut self, index: usize) -> Option<&mut Table> {
        self.tables.get_mut(index)
    }

    /// Add every member of `family` to `entity`. Returns `true` if the
    /// entity's family changed.
    pub fn add_family(&mut self, entity: Entity, family: FamilyId) -> Result<bool, StoreError> {
        let current = self.live_family(entity)?;
        let next = self.families.merge(current, family);
        if next == current {
            return Ok(false);
        }
        self.move_to(entity, next)?;
        Ok(true)
    }

    /// Remove every member of `family` from `entity`. Returns `true` if the
    /// entity's family changed.
    pub fn remove_family(&mut self, entity: Entity, family: FamilyId) -> Result<bool, StoreError> {
        let current = self.live_family(entity)?;
        let next = self.families.difference(current, family);
        if next == current {
            return Ok(false);
        }
        self.move_to(entity, next)?;
        Ok(true)
    }

    /// Overwrite the value of `component` on `entity`.
    pub fn set<T: 'static>(
        &mut self,
        entity: Entity,
        component: Entity,
        value: T,
    ) -> Result<(), StoreError> {
        *self.get_mut::<T>(entity, component)? = value;
        Ok(())
    }

    /// Typed reference to the value of `component` on `entity`.
    pub fn get<T: 'static>(&self, entity: Entity, component: Entity) -> Result<&T, StoreError> {
        let loc = self.storage_location(entity, component)?;
        self.tables[loc.table]
            .get::<T>(loc.row, component)?
            .ok_or(StoreError::ComponentNotFound { entity, component })
    }

    /// Typed mutable reference to the value of `component` on `entity`.
    pub fn get_mut<T: 'static>(
        &mut self,
        entity: Entity,
        component: Entity,
    ) -> Result<&mut T, StoreError> {
        let loc = self.storage_location(entity, component)?;
        self.tables[loc.table]
            .get_mut::<T>(loc.row, component)?
            .ok_or(StoreError::ComponentNotFound { entity, component })
    }

    fn storage_location(&self, entity: Entity, component: Entity) -> Result<Location, StoreError> {
        let info = self
            .components
            .get(&component)
            .ok_or(StoreError::UnknownComponent(component))?;
        if !info.has_storage() {
            return Err(StoreError::NoStorage(component));
        }
        if !self.is_alive(entity) {
            return Err(StoreError::EntityNotFound(entity));
        }
        self.location(entity)
            .ok_or(StoreError::ComponentNotFound { entity, component })
    }

    fn live_family(&self, entity: Entity) -> Result<FamilyId, StoreError> {
        if !self.is_alive(entity) {
            return Err(StoreError::EntityNotFound(entity));
        }
        Ok(self.family_of(entity))
    }

    fn move_to(&mut self, entity: Entity, next: FamilyId) -> Result<(), StoreError> {
        let dest = if next.is_empty() {
            None
        } else {
            Some(self.table_for(next))
        };
        let location = match (self.location(entity), dest) {
            (None, None) => None,
            (None, Some(table)) => {
                let row = self.tables[table].push(entity);
                Some(Location { table, row })
            }
            (Some(loc), None) => {
                let moved = self.tables[loc.table].swap_remove(loc.row);
                self.relocate(moved, loc);
                None
            }
            (Some(loc), Some(table)) => {
                let (src, dst) = pair_mut(&mut self.tables, loc.table, table);
                let (row, moved) = src.move_row(loc.row, dst)?;
                self.relocate(moved, loc);
                Some(Location { table, row })
            }
        };
        self.records.insert(entity, location);
        Ok(())
    }

    /// Point the entity that was swapped into `loc` at its new row.
    fn relocate(&mut self, moved: Option<Entity>, loc: Location) {
        if let Some(moved) = moved {
            self.records.insert(moved, Some(loc));
        }
    }

    fn table_for(&mut self, family: FamilyId) -> usize {
        if let Some(&index) = self.table_by_family.get(&family) {
            return index;
        }
        let columns = self
            .families
            .members(family)
            .iter()
            .filter_map(|member| {
                let info = self.components.get(member)?;
                Some(Column::new(*member, info.new_column()?))
            })
            .collect();
        let index = self.tables.len();
        self.tables.push(Table::new(family, columns));
        self.table_by_family.insert(family, index);
        debug!(%family, table = index, "created table");
        index
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl FamilyAlgebra for Store {
    fn lookup(&self, name: &str) -> Option<Entity> {
        Store::lookup(self, name)
    }

    fn family_union(&mut self, base: FamilyId, component: Entity) -> FamilyId {
        self.families.union(base, component)
    }
}

fn pair_mut(tables: &mut [Table], a: usize, b: usize) -> (&mut Table, &mut Table) {
    if a < b {
        let (left, right) = tables.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = tables.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    fn setup() -> (Store, Entity, Entity) {
        let mut store = Store::new();
        let position = store.register_component::<Position>("Position").unwrap();
        let velocity = store.register_component::<Velocity>("Velocity").unwrap();
        (store, position, velocity)
    }

    fn single(store: &mut Store, member: Entity) -> FamilyId {
        store.family_union(FamilyId::EMPTY, member)
    }

    #[test]
    fn test_register_component_is_idempotent() {
        let (mut store, position, _) = setup();
        assert_eq!(store.register_component::<Position>("Position").unwrap(), position);
        assert_eq!(
            store.register_component::<Velocity>("Position"),
            Err(StoreError::NameTaken("Position".to_string()))
        );
        assert_eq!(store.lookup("Position"), Some(position));
        assert_eq!(store.name_of(position), Some("Position"));
    }

    #[test]
    fn test_add_moves_data_between_tables() {
        let (mut store, position, velocity) = setup();
        let e = store.new_entity();
        let p = single(&mut store, position);
        assert!(store.add_family(e, p).unwrap());
        store.set(e, position, Position { x: 1.0, y: 2.0 }).unwrap();

        let v = single(&mut store, velocity);
        assert!(store.add_family(e, v).unwrap());
        assert_eq!(store.get::<Position>(e, position).unwrap(), &Position { x: 1.0, y: 2.0 });
        assert_eq!(store.get::<Velocity>(e, velocity).unwrap(), &Velocity::default());
        assert_eq!(store.table_count(), 2);
        assert!(!store.add_family(e, v).unwrap());
    }

    #[test]
    fn test_remove_drops_member() {
        let (mut store, position, velocity) = setup();
        let e = store.new_entity();
        let both = store.families_mut().intern(&[position, velocity]);
        store.add_family(e, both).unwrap();
        let v = single(&mut store, velocity);
        assert!(store.remove_family(e, v).unwrap());
        assert!(store.has(e, position));
        assert!(!store.has(e, velocity));
        assert!(matches!(
            store.get::<Velocity>(e, velocity),
            Err(StoreError::ComponentNotFound { .. })
        ));

        let p = single(&mut store, position);
        store.remove_family(e, p).unwrap();
        assert_eq!(store.family_of(e), FamilyId::EMPTY);
        assert_eq!(store.location(e), None);
    }

    #[test]
    fn test_swap_remove_relocates_neighbour() {
        let (mut store, position, _) = setup();
        let p = single(&mut store, position);
        let a = store.new_entity();
        let b = store.new_entity();
        store.add_family(a, p).unwrap();
        store.add_family(b, p).unwrap();
        store.set(b, position, Position { x: 9.0, y: 9.0 }).unwrap();

        assert!(store.delete(a));
        assert_eq!(store.location(b), Some(Location { table: 0, row: 0 }));
        assert_eq!(store.get::<Position>(b, position).unwrap().x, 9.0);
        assert!(!store.delete(a));
    }

    #[test]
    fn test_tag_has_no_storage() {
        let (mut store, _, _) = setup();
        let frozen = store.register_tag("Frozen").unwrap();
        let e = store.new_entity();
        let f = single(&mut store, frozen);
        store.add_family(e, f).unwrap();
        assert!(store.has(e, frozen));
        assert!(store.table(0).unwrap().columns().is_empty());
        assert_eq!(store.set(e, frozen, ()), Err(StoreError::NoStorage(frozen)));
    }

    #[test]
    fn test_unknown_entity() {
        let (mut store, position, _) = setup();
        let ghost = Entity::from_raw(999);
        let p = single(&mut store, position);
        assert_eq!(store.add_family(ghost, p), Err(StoreError::EntityNotFound(ghost)));
    }

    #[test]
    fn test_alias_resolves_family() {
        let (mut store, position, velocity) = setup();
        let family = store.families_mut().intern(&[position, velocity]);
        let alias = store.new_alias("Motion", family).unwrap();
        assert_eq!(store.alias_family(alias), Some(family));
        assert_eq!(store.alias_family(position), None);
        assert!(store.new_alias("Motion", family).is_err());
    }
}
