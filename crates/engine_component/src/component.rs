//! Component metadata and type-erased column storage.
//!
//! A component is an entity with a registered [`ComponentInfo`]. Components
//! that carry data install a column factory; tags have none and never occupy
//! a column in a table.

use std::any::{Any, TypeId, type_name};

use crate::entity::Entity;
use crate::error::StoreError;

/// Storage for one component type inside a table.
///
/// Every table column is a `Vec<T>` behind this trait. Row operations keep
/// all columns of a table aligned with its entity list.
pub trait ColumnStorage: Any + Send + Sync {
    /// Upcast for typed reads.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed writes.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of rows.
    fn len(&self) -> usize;

    /// Returns `true` if the column has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a default-initialised row.
    fn push_default(&mut self);

    /// Remove `row`, moving the last row into its place.
    fn swap_remove(&mut self, row: usize);

    /// Swap-remove `row` and append its value to `dest`, which must store the
    /// same type.
    fn move_row(&mut self, row: usize, dest: &mut dyn ColumnStorage) -> Result<(), StoreError>;
}

impl<T: Default + Send + Sync + 'static> ColumnStorage for Vec<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn push_default(&mut self) {
        self.push(T::default());
    }

    fn swap_remove(&mut self, row: usize) {
        if row < Vec::len(self) {
            Vec::swap_remove(self, row);
        }
    }

    fn move_row(&mut self, row: usize, dest: &mut dyn ColumnStorage) -> Result<(), StoreError> {
        let dest = dest
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .ok_or(StoreError::TypeMismatch {
                expected: type_name::<T>(),
            })?;
        if row < Vec::len(self) {
            dest.push(Vec::swap_remove(self, row));
        }
        Ok(())
    }
}

/// Constructs an empty column for one component type.
pub type ColumnFactory = fn() -> Box<dyn ColumnStorage>;

fn new_column<T: Default + Send + Sync + 'static>() -> Box<dyn ColumnStorage> {
    Box::new(Vec::<T>::new())
}

/// Metadata about a registered component.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// The entity naming this component.
    pub entity: Entity,
    /// The name the component was registered under.
    pub name: String,
    /// Rust type backing the column, `None` for tags.
    pub type_id: Option<TypeId>,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
    factory: Option<ColumnFactory>,
}

impl ComponentInfo {
    /// Metadata for a data-carrying component of type `T`.
    #[must_use]
    pub fn of<T: Default + Send + Sync + 'static>(entity: Entity, name: impl Into<String>) -> Self {
        Self {
            entity,
            name: name.into(),
            type_id: Some(TypeId::of::<T>()),
            type_name: type_name::<T>(),
            factory: Some(new_column::<T>),
        }
    }

    /// Metadata for a tag: a component without storage.
    #[must_use]
    pub fn tag(entity: Entity, name: impl Into<String>) -> Self {
        Self {
            entity,
            name: name.into(),
            type_id: None,
            type_name: "()",
            factory: None,
        }
    }

    /// Returns `true` if this component occupies a table column.
    #[must_use]
    pub fn has_storage(&self) -> bool {
        self.factory.is_some()
    }

    /// Returns `true` if the column stores values of type `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == Some(TypeId::of::<T>())
    }

    /// Build an empty column, if this component has storage.
    #[must_use]
    pub fn new_column(&self) -> Option<Box<dyn ColumnStorage>> {
        self.factory.map(|factory| factory())
    }
}
