//! Storage-layer error types.

use crate::entity::Entity;

/// Errors raised by the table store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The entity was never allocated or has been deleted.
    #[error("entity {0} not found")]
    EntityNotFound(Entity),

    /// The entity does not name a registered component.
    #[error("{0} is not a registered component")]
    UnknownComponent(Entity),

    /// The entity does not carry the component.
    #[error("component {component} not present on entity {entity}")]
    ComponentNotFound {
        /// The entity that was accessed.
        entity: Entity,
        /// The missing component.
        component: Entity,
    },

    /// The component is a tag and has no value to read or write.
    #[error("component {0} has no storage")]
    NoStorage(Entity),

    /// A typed access used the wrong Rust type for the column.
    #[error("column type mismatch: expected {expected}")]
    TypeMismatch {
        /// Type name of the value the caller supplied or requested.
        expected: &'static str,
    },

    /// The name is already bound to another entity or component type.
    #[error("name '{0}' is already taken")]
    NameTaken(String),
}
