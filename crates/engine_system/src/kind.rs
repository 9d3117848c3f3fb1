//! Lifecycle phases a system can be registered under.

use serde::{Deserialize, Serialize};

/// When a system runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemKind {
    /// Fired when components are added to an entity.
    OnAdd,
    /// Fired before components are removed from an entity.
    OnRemove,
    /// Fired after a component value is written.
    OnSet,
    OnLoad,
    /// Accepted as a kind, but nothing can be registered under it.
    PostLoad,
    PreFrame,
    OnFrame,
    PostFrame,
    OnStore,
    /// Runs only through an explicit request.
    OnDemand,
    /// A row system without columns that runs only through an explicit request.
    Manual,
}

impl SystemKind {
    /// Phases [`World::progress`](crate::World::progress) walks, in order.
    pub const FRAME_PHASES: [SystemKind; 5] = [
        SystemKind::OnLoad,
        SystemKind::PreFrame,
        SystemKind::OnFrame,
        SystemKind::PostFrame,
        SystemKind::OnStore,
    ];

    /// Returns `true` for kinds a table system may be registered under.
    #[must_use]
    pub fn is_frame_kind(self) -> bool {
        Self::FRAME_PHASES.contains(&self) || self == SystemKind::OnDemand
    }

    /// Returns `true` for the entity lifecycle events.
    #[must_use]
    pub fn is_lifecycle(self) -> bool {
        matches!(self, SystemKind::OnAdd | SystemKind::OnRemove | SystemKind::OnSet)
    }
}
