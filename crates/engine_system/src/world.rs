//! The world: storage plus the systems that react to it.
//!
//! [`World`] owns the [`Store`], the [`SystemRegistry`], the
//! [`FamilySystemIndex`] and the [`FrameSchedule`]. Every entity mutation
//! goes through it so lifecycle triggers run synchronously, and every frame
//! goes through [`World::progress`].
//!
//! New families and tables are picked up lazily: the world remembers how many
//! of each it has seen and matches the rest against the registered systems
//! before dispatching or running anything.

use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_component::{Containment, Entity, FamilyId, Store, Table};
use engine_signature::{ColumnOp, SourceKind, compile};
use tracing::{debug, info, trace, warn};

use crate::config::WorldConfig;
use crate::error::SystemError;
use crate::index::FamilySystemIndex;
use crate::kind::SystemKind;
use crate::registry::{Classification, SystemRegistry, classify};
use crate::rows::{Binding, Rows};
use crate::schedule::FrameSchedule;
use crate::system::{
    Action, ColSystem, MatchedTable, RowRole, RowSystem, System, SystemBase,
    excluded_by_component, match_table,
};

/// Entity storage together with its systems.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    pub(crate) store: Store,
    pub(crate) registry: SystemRegistry,
    index: FamilySystemIndex,
    schedule: FrameSchedule,
    families_seen: usize,
    tables_seen: usize,
    frame: u64,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            store: Store::new(),
            registry: SystemRegistry::new(),
            index: FamilySystemIndex::new(),
            schedule: FrameSchedule::new(),
            families_seen: 0,
            tables_seen: 0,
            frame: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Read access to storage.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Number of completed [`World::progress`] calls.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    // -- Entities and components --

    /// Register a component type under `name`.
    pub fn component<T: Default + Send + Sync + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Entity, SystemError> {
        Ok(self.store.register_component::<T>(name)?)
    }

    /// Register a component without data under `name`.
    pub fn tag(&mut self, name: &str) -> Result<Entity, SystemError> {
        Ok(self.store.register_tag(name)?)
    }

    pub fn new_entity(&mut self) -> Entity {
        self.store.new_entity()
    }

    pub fn new_named(&mut self, name: &str) -> Result<Entity, SystemError> {
        Ok(self.store.new_named(name)?)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.store.lookup(name)
    }

    #[must_use]
    pub fn has(&self, entity: Entity, component: Entity) -> bool {
        self.store.has(entity, component)
    }

    /// Add `component` to `entity`, then run the `OnAdd` triggers.
    pub fn add(&mut self, entity: Entity, component: Entity) -> Result<(), SystemError> {
        let family = self.store.families_mut().union(FamilyId::EMPTY, component);
        self.add_family(entity, family)
    }

    /// Add every member of `family` to `entity`, then run the `OnAdd`
    /// triggers for the members that were not present yet.
    pub fn add_family(&mut self, entity: Entity, family: FamilyId) -> Result<(), SystemError> {
        let before = self.store.family_of(entity);
        if !self.store.add_family(entity, family)? {
            return Ok(());
        }
        let after = self.store.family_of(entity);
        let added = self.store.families_mut().difference(after, before);
        self.sync();
        self.dispatch(SystemKind::OnAdd, added, entity);
        Ok(())
    }

    /// Run the `OnRemove` triggers, then remove `component` from `entity`.
    pub fn remove(&mut self, entity: Entity, component: Entity) -> Result<(), SystemError> {
        let family = self.store.families_mut().union(FamilyId::EMPTY, component);
        self.remove_family(entity, family)
    }

    /// Run the `OnRemove` triggers for the members of `family` the entity
    /// carries, then remove them.
    pub fn remove_family(&mut self, entity: Entity, family: FamilyId) -> Result<(), SystemError> {
        if !self.store.is_alive(entity) {
            return Err(engine_component::StoreError::EntityNotFound(entity).into());
        }
        let before = self.store.family_of(entity);
        let kept = self.store.families_mut().difference(before, family);
        let removed = self.store.families_mut().difference(before, kept);
        if removed.is_empty() {
            return Ok(());
        }
        self.sync();
        self.dispatch(SystemKind::OnRemove, removed, entity);
        if self.store.is_alive(entity) {
            self.store.remove_family(entity, removed)?;
            self.sync();
        }
        Ok(())
    }

    /// Write a component value, adding the component first if needed, then
    /// run the `OnSet` triggers.
    pub fn set<T: 'static>(
        &mut self,
        entity: Entity,
        component: Entity,
        value: T,
    ) -> Result<(), SystemError> {
        if !self.store.has(entity, component) {
            self.add(entity, component)?;
        }
        self.store.set(entity, component, value)?;
        let family = self.store.families_mut().union(FamilyId::EMPTY, component);
        self.sync();
        self.dispatch(SystemKind::OnSet, family, entity);
        Ok(())
    }

    pub fn get<T: 'static>(&self, entity: Entity, component: Entity) -> Result<&T, SystemError> {
        Ok(self.store.get::<T>(entity, component)?)
    }

    /// Mutable access that bypasses `OnSet` triggers.
    pub fn get_mut<T: 'static>(
        &mut self,
        entity: Entity,
        component: Entity,
    ) -> Result<&mut T, SystemError> {
        Ok(self.store.get_mut::<T>(entity, component)?)
    }

    /// Run the `OnRemove` triggers for the entity's whole family, then delete
    /// it. Returns `false` if the entity did not exist.
    pub fn delete(&mut self, entity: Entity) -> bool {
        if !self.store.is_alive(entity) {
            return false;
        }
        let family = self.store.family_of(entity);
        if !family.is_empty() {
            self.dispatch(SystemKind::OnRemove, family, entity);
        }
        self.store.delete(entity)
    }

    // -- Systems --

    /// Register a system. Registering a name that already names a system
    /// returns that system unchanged.
    pub fn register_system<F>(
        &mut self,
        name: &str,
        kind: SystemKind,
        signature: &str,
        action: F,
    ) -> Result<Entity, SystemError>
    where
        F: Fn(&mut Rows<'_>) + Send + Sync + 'static,
    {
        if let Some(existing) = self.store.lookup(name) {
            if self.registry.contains(existing) {
                return Ok(existing);
            }
            return Err(SystemError::NameTaken(name.to_string()));
        }

        let signature = compile(signature, &mut self.store)?;
        let class = classify(kind, &signature)?;
        let id = self.store.new_named(name)?;
        let expr = signature.expr.clone();

        match class {
            Classification::Table => {
                if !signature.and_from_system.is_empty() {
                    self.add_family(id, signature.and_from_system)?;
                }
                let base = system_base(id, name, kind, signature, Arc::new(action));
                self.sync();
                self.schedule.insert(id, kind);
                self.registry.insert(System::Col(ColSystem {
                    base,
                    tables: Vec::new(),
                    period: 0.0,
                    time_passed: 0.0,
                }));
                for table in 0..self.store.table_count() {
                    self.match_table_system(id, table);
                }
            }
            Classification::Row(role) => {
                let components = signature
                    .columns
                    .iter()
                    .map(|c| c.component().unwrap_or(Entity::INVALID))
                    .collect();
                let base = system_base(id, name, kind, signature, Arc::new(action));
                self.sync();
                self.registry.insert(System::Row(RowSystem {
                    base,
                    role,
                    components,
                }));
                if role == RowRole::Trigger
                    && let Some(system) = self.registry.get(id)
                {
                    let matched = self
                        .index
                        .backfill(id, kind, system.signature(), self.store.families());
                    debug!(system = %id, families = matched, "back-filled trigger");
                }
            }
        }

        info!(system = %id, name, kind = ?kind, signature = %expr, "registered system");
        Ok(id)
    }

    /// Create a named alias for a set of systems, accepted by
    /// [`World::enable`].
    pub fn new_system_family(&mut self, name: &str, members: &[Entity]) -> Result<Entity, SystemError> {
        let family = self.store.families_mut().intern(members);
        let alias = self.store.new_alias(name, family)?;
        self.sync();
        info!(alias = %alias, name, members = members.len(), "created system family");
        Ok(alias)
    }

    #[must_use]
    pub fn system(&self, id: Entity) -> Option<&System> {
        self.registry.get(id)
    }

    /// All systems in registration order.
    pub fn systems(&self) -> impl Iterator<Item = &System> + '_ {
        self.registry.iter()
    }

    #[must_use]
    pub fn index(&self) -> &FamilySystemIndex {
        &self.index
    }

    /// Returns `true` if a table system occupies an active frame slot.
    #[must_use]
    pub fn is_active(&self, system: Entity) -> bool {
        self.schedule.is_active(system)
    }

    /// Enable or disable a system, or every direct member of a system family.
    pub fn enable(&mut self, target: Entity, enabled: bool) -> Result<(), SystemError> {
        if self.registry.contains(target) {
            self.enable_system(target, enabled);
            return Ok(());
        }
        let Some(family) = self.store.alias_family(target) else {
            return Err(SystemError::NotASystem(target));
        };
        let members = self.store.families().members(family).to_vec();
        for member in members {
            if self.registry.contains(member) {
                self.enable_system(member, enabled);
            } else {
                warn!(alias = %target, %member, "system family member is not a system");
            }
        }
        Ok(())
    }

    fn enable_system(&mut self, id: Entity, enabled: bool) {
        let Some(system) = self.registry.get_mut(id) else {
            return;
        };
        let base = system.base_mut();
        let changed = base.enabled != enabled;
        base.enabled = enabled;
        if changed && !system.tables().is_empty() {
            self.schedule.activate(id, enabled);
        }
        debug!(system = %id, enabled, "set system enabled");
    }

    /// Entities that are not systems count as enabled.
    #[must_use]
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.registry.get(entity).is_none_or(System::is_enabled)
    }

    /// Run a table system at most once every `seconds`. Row systems have no
    /// period.
    pub fn set_period(&mut self, system: Entity, seconds: f32) -> Result<(), SystemError> {
        match self.registry.get_mut(system) {
            Some(System::Col(col)) => {
                col.period = seconds.max(0.0);
                Ok(())
            }
            Some(System::Row(_)) => {
                warn!(%system, "period ignored for row system");
                Ok(())
            }
            None => Err(SystemError::NotASystem(system)),
        }
    }

    #[must_use]
    pub fn period(&self, system: Entity) -> Option<f32> {
        match self.registry.get(system)? {
            System::Col(col) => Some(col.period),
            System::Row(_) => None,
        }
    }

    /// Attach `value` as the system's context, stored as `component` on the
    /// system entity. Replaces any previous context.
    pub fn set_context<T: 'static>(
        &mut self,
        system: Entity,
        component: Entity,
        value: T,
    ) -> Result<&mut T, SystemError> {
        if !self.registry.contains(system) {
            return Err(SystemError::NotASystem(system));
        }
        self.set(system, component, value)?;
        if let Some(s) = self.registry.get_mut(system) {
            s.base_mut().ctx = Some(component);
        }
        Ok(self.store.get_mut::<T>(system, component)?)
    }

    /// The system's context value.
    pub fn get_context<T: 'static>(&mut self, system: Entity) -> Result<&mut T, SystemError> {
        let ctx = self
            .registry
            .get(system)
            .ok_or(SystemError::NotASystem(system))?
            .base()
            .ctx
            .ok_or(SystemError::MissingSystemContext(system))?;
        Ok(self.store.get_mut::<T>(system, ctx)?)
    }

    // -- Execution --

    /// Run one frame: every active table system phase by phase, with the
    /// tasks after `OnFrame`.
    pub fn progress(&mut self, delta_time: f32) {
        self.sync();
        for phase in SystemKind::FRAME_PHASES {
            for system in self.schedule.active_in(phase) {
                if self.schedule.is_active(system) {
                    self.run_table_system(system, delta_time, false);
                }
            }
            if phase == SystemKind::OnFrame {
                let mut i = 0;
                while let Some(&task) = self.registry.tasks().get(i) {
                    i += 1;
                    self.run_row_system(task, delta_time);
                }
            }
        }
        self.frame += 1;
        trace!(frame = self.frame, delta_time, "frame complete");
    }

    /// Run a system once outside the frame schedule, ignoring its period.
    pub fn run_system(&mut self, system: Entity, delta_time: f32) -> Result<(), SystemError> {
        let role = self
            .registry
            .get(system)
            .ok_or(SystemError::NotASystem(system))?
            .row_role();
        match role {
            None => {
                self.sync();
                self.run_table_system(system, delta_time, true);
            }
            Some(RowRole::Trigger) => return Err(SystemError::NotRunnable(system)),
            Some(_) => self.run_row_system(system, delta_time),
        }
        Ok(())
    }

    fn run_table_system(&mut self, system: Entity, delta_time: f32, on_demand: bool) {
        let Some(System::Col(col)) = self.registry.get_mut(system) else {
            return;
        };
        if !col.base.enabled {
            return;
        }
        if !on_demand && col.period > 0.0 {
            col.time_passed += delta_time;
            if col.time_passed < col.period {
                return;
            }
            col.time_passed -= col.period;
        }
        let action = Arc::clone(&col.base.action);
        let tables = col.tables.clone();
        for matched in tables {
            let len = self.store.table(matched.table).map_or(0, Table::len);
            if len == 0 {
                continue;
            }
            let binding = Binding::Table {
                table: matched.table,
                offset: 0,
                limit: len,
                columns: matched.columns,
            };
            self.invoke(system, &action, delta_time, binding);
        }
    }

    fn run_row_system(&mut self, system: Entity, delta_time: f32) {
        let Some(System::Row(row)) = self.registry.get(system) else {
            return;
        };
        if !row.base.enabled {
            return;
        }
        let action = Arc::clone(&row.base.action);
        self.invoke(system, &action, delta_time, Binding::Task);
    }

    /// Run the triggers of `(kind, family)` for `entity`. The bucket is
    /// walked by index, so triggers registered during the walk still run.
    fn dispatch(&mut self, kind: SystemKind, family: FamilyId, entity: Entity) {
        let mut i = 0;
        while let Some(&system) = self.index.bucket(kind, family).get(i) {
            i += 1;
            self.run_trigger(system, entity);
        }
    }

    fn run_trigger(&mut self, system: Entity, entity: Entity) {
        let Some(System::Row(row)) = self.registry.get(system) else {
            return;
        };
        if !row.base.enabled || !self.store.is_alive(entity) {
            return;
        }
        let signature = &row.base.signature;
        let families = self.store.families();
        let live = self.store.family_of(entity);
        let excluded = families.contains(live, signature.not_from_entity, Containment::Any)
            || excluded_by_component(&self.store, live, signature.not_from_component);
        let unbound = signature.columns.iter().any(|column| {
            matches!(column.op, ColumnOp::Or(alternatives)
                if column.source == SourceKind::FromEntity
                    && !families.contains(live, alternatives, Containment::Any))
        });
        if excluded || unbound {
            trace!(%system, %entity, excluded, unbound, "trigger skipped");
            return;
        }
        let action = Arc::clone(&row.base.action);
        trace!(%system, %entity, "dispatching trigger");
        self.invoke(
            system,
            &action,
            0.0,
            Binding::Row {
                entities: vec![entity],
            },
        );
    }

    fn invoke(&mut self, system: Entity, action: &Action, delta_time: f32, binding: Binding) {
        let start = self.config.measure_system_time.then(Instant::now);
        action(&mut Rows::new(self, system, delta_time, binding));
        if let Some(s) = self.registry.get_mut(system) {
            let base = s.base_mut();
            base.invocations += 1;
            if let Some(start) = start {
                base.time_spent += start.elapsed();
            }
        }
    }

    // -- Matching --

    /// Match every family and table created since the last call.
    fn sync(&mut self) {
        while self.families_seen < self.store.family_count() {
            let family = FamilyId(self.families_seen as u32);
            self.families_seen += 1;
            self.index.notify_new_family(
                family,
                self.registry.trigger_signatures(),
                self.store.families(),
            );
        }
        while self.tables_seen < self.store.table_count() {
            let table = self.tables_seen;
            self.tables_seen += 1;
            let mut i = 0;
            while let Some(&system) = self.registry.table_systems().get(i) {
                i += 1;
                self.match_table_system(system, table);
            }
        }
    }

    fn match_table_system(&mut self, system: Entity, table_index: usize) {
        let Some(table) = self.store.table(table_index) else {
            return;
        };
        let Some(System::Col(col)) = self.registry.get_mut(system) else {
            return;
        };
        let Some(columns) = match_table(&col.base.signature, table, &self.store) else {
            return;
        };
        col.tables.push(MatchedTable {
            table: table_index,
            columns: columns.into(),
        });
        debug!(%system, table = table_index, "matched table");
        if col.base.enabled && col.tables.len() == 1 {
            self.schedule.activate(system, true);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl Drop for World {
    fn drop(&mut self) {
        let finalizers = self.registry.finalizers().to_vec();
        for system in finalizers {
            self.run_row_system(system, 0.0);
        }
    }
}

fn system_base(
    id: Entity,
    name: &str,
    kind: SystemKind,
    signature: engine_signature::Signature,
    action: Action,
) -> SystemBase {
    SystemBase {
        id,
        name: name.to_string(),
        kind,
        signature,
        action,
        enabled: true,
        ctx: None,
        time_spent: Duration::ZERO,
        invocations: 0,
    }
}
