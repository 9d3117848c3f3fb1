//! Frame schedule for table systems.
//!
//! Each frame phase owns a slot list holding its table systems in
//! registration order. A system occupies its slot only while it is active,
//! i.e. enabled with at least one matching table; the frame driver skips
//! inactive slots.

use std::collections::{HashMap, HashSet};

use engine_component::Entity;
use tracing::debug;

use crate::kind::SystemKind;

#[derive(Debug, Default)]
pub struct FrameSchedule {
    slots: HashMap<SystemKind, Vec<Entity>>,
    active: HashSet<Entity>,
    transitions: u64,
}

impl FrameSchedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `system` an inactive slot in `kind`'s phase.
    pub fn insert(&mut self, system: Entity, kind: SystemKind) {
        let slots = self.slots.entry(kind).or_default();
        if !slots.contains(&system) {
            slots.push(system);
        }
    }

    /// Activate or deactivate a slot. Returns `true` if the state changed.
    pub fn activate(&mut self, system: Entity, active: bool) -> bool {
        let changed = if active {
            self.active.insert(system)
        } else {
            self.active.remove(&system)
        };
        if changed {
            self.transitions += 1;
            debug!(%system, active, "system activation changed");
        }
        changed
    }

    /// Number of activation changes so far.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    #[must_use]
    pub fn is_active(&self, system: Entity) -> bool {
        self.active.contains(&system)
    }

    /// Active systems of one phase, in registration order.
    #[must_use]
    pub fn active_in(&self, kind: SystemKind) -> Vec<Entity> {
        self.slots
            .get(&kind)
            .map(|slots| {
                slots
                    .iter()
                    .copied()
                    .filter(|s| self.active.contains(s))
                    .collect()
            })
            .unwrap_or_default()
    }
}
