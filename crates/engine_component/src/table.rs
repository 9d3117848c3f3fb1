//! Tables: contiguous storage for every entity sharing one family.
//!
//! Data is stored in struct-of-arrays layout: one [`Column`] per member of the
//! family that has storage, with entity IDs stored in a parallel vector. A
//! table's family, and therefore its column layout, never changes.

use std::any::type_name;

use crate::component::ColumnStorage;
use crate::entity::Entity;
use crate::error::StoreError;
use crate::family::FamilyId;

/// A column in a table, storing the values of a single component.
pub struct Column {
    /// The component stored in this column.
    pub component: Entity,
    data: Box<dyn ColumnStorage>,
}

impl Column {
    /// Wrap an empty column for `component`.
    #[must_use]
    pub fn new(component: Entity, data: Box<dyn ColumnStorage>) -> Self {
        Self { component, data }
    }

    /// Number of rows stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the column holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Typed view of the column, `None` if `T` is not the stored type.
    #[must_use]
    pub fn as_slice<T: 'static>(&self) -> Option<&[T]> {
        self.data
            .as_any()
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
    }

    /// Mutable typed view of the column.
    #[must_use]
    pub fn as_mut_slice<T: 'static>(&mut self) -> Option<&mut [T]> {
        self.data
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .map(Vec::as_mut_slice)
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("component", &self.component)
            .field("len", &self.len())
            .finish()
    }
}

/// A table of entities sharing the same family.
#[derive(Debug)]
pub struct Table {
    family: FamilyId,
    entities: Vec<Entity>,
    columns: Vec<Column>,
}

impl Table {
    /// Create a new, empty table. `columns` must follow the family's member order.
    #[must_use]
    pub fn new(family: FamilyId, columns: Vec<Column>) -> Self {
        Self {
            family,
            entities: Vec::new(),
            columns,
        }
    }

    /// The family every row of this table carries.
    #[must_use]
    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// Returns the number of entities in this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if this table has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entity column. `entities()[i]` owns row `i` of every column.
    #[must_use]
    pub fn entities(&self) -> &Vec<Entity> {
        &self.entities
    }

    /// All data columns, in family order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column index for the given component, if it has a column here.
    #[must_use]
    pub fn column_index(&self, component: Entity) -> Option<usize> {
        self.columns.iter().position(|c| c.component == component)
    }

    /// The column at `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// The column at `index`, mutably.
    #[must_use]
    pub fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Borrow column `write` mutably and column `read` immutably. `None` if
    /// either index is out of range or both are the same.
    pub fn column_pair_mut(&mut self, write: usize, read: usize) -> Option<(&mut Column, &Column)> {
        if write == read || write >= self.columns.len() || read >= self.columns.len() {
            return None;
        }
        if write < read {
            let (left, right) = self.columns.split_at_mut(read);
            Some((&mut left[write], &right[0]))
        } else {
            let (left, right) = self.columns.split_at_mut(write);
            Some((&mut right[0], &left[read]))
        }
    }

    /// Typed reference to one cell.
    pub fn get<T: 'static>(&self, row: usize, component: Entity) -> Result<Option<&T>, StoreError> {
        let Some(index) = self.column_index(component) else {
            return Ok(None);
        };
        let slice = self.columns[index]
            .as_slice::<T>()
            .ok_or(StoreError::TypeMismatch {
                expected: type_name::<T>(),
            })?;
        Ok(slice.get(row))
    }

    /// Typed mutable reference to one cell.
    pub fn get_mut<T: 'static>(
        &mut self,
        row: usize,
        component: Entity,
    ) -> Result<Option<&mut T>, StoreError> {
        let Some(index) = self.column_index(component) else {
            return Ok(None);
        };
        let slice = self.columns[index]
            .as_mut_slice::<T>()
            .ok_or(StoreError::TypeMismatch {
                expected: type_name::<T>(),
            })?;
        Ok(slice.get_mut(row))
    }

    /// Append `entity` with default-initialised values and return its row.
    pub fn push(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        for column in &mut self.columns {
            column.data.push_default();
        }
        self.entities.len() - 1
    }

    /// Remove `row`. Returns the entity that was moved into `row`, if any.
    pub fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        if row >= self.entities.len() {
            return None;
        }
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.data.swap_remove(row);
        }
        self.entities.get(row).copied()
    }

    /// Move `row` of `self` into `dest`, carrying over the values of shared
    /// components and default-initialising the rest.
    ///
    /// Returns the new row in `dest` and the entity that took over `row` in
    /// `self`, if any.
    pub fn move_row(
        &mut self,
        row: usize,
        dest: &mut Table,
    ) -> Result<(usize, Option<Entity>), StoreError> {
        let entity = self.entities[row];
        dest.entities.push(entity);
        for column in &mut dest.columns {
            match self.columns.iter_mut().find(|c| c.component == column.component) {
                Some(source) => source.data.move_row(row, column.data.as_mut())?,
                None => column.data.push_default(),
            }
        }
        for column in &mut self.columns {
            if dest.column_index(column.component).is_none() {
                column.data.swap_remove(row);
            }
        }
        self.entities.swap_remove(row);
        Ok((dest.entities.len() - 1, self.entities.get(row).copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentInfo;

    fn column<T: Default + Send + Sync + 'static>(id: u64) -> Column {
        let info = ComponentInfo::of::<T>(Entity::from_raw(id), "c");
        Column::new(info.entity, info.new_column().unwrap())
    }

    #[test]
    fn test_push_and_get() {
        let mut table = Table::new(FamilyId(1), vec![column::<f32>(10)]);
        let row = table.push(Entity::from_raw(1));
        *table.get_mut::<f32>(row, Entity::from_raw(10)).unwrap().unwrap() = 3.5;
        assert_eq!(table.get::<f32>(row, Entity::from_raw(10)).unwrap(), Some(&3.5));
        assert!(table.get::<u8>(row, Entity::from_raw(10)).is_err());
        assert_eq!(table.get::<f32>(row, Entity::from_raw(11)).unwrap(), None);
    }

    #[test]
    fn test_swap_remove_reports_moved_entity() {
        let mut table = Table::new(FamilyId(1), vec![column::<u32>(10)]);
        table.push(Entity::from_raw(1));
        table.push(Entity::from_raw(2));
        table.push(Entity::from_raw(3));
        assert_eq!(table.swap_remove(0), Some(Entity::from_raw(3)));
        assert_eq!(table.swap_remove(1), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns()[0].len(), 1);
    }

    #[test]
    fn test_column_pair_mut() {
        let mut table = Table::new(FamilyId(1), vec![column::<u32>(10), column::<u64>(11)]);
        table.push(Entity::from_raw(1));
        let (write, read) = table.column_pair_mut(1, 0).unwrap();
        write.as_mut_slice::<u64>().unwrap()[0] = 7;
        assert_eq!(read.as_slice::<u32>().unwrap(), &[0]);
        assert!(table.column_pair_mut(0, 0).is_none());
        assert!(table.column_pair_mut(0, 2).is_none());
    }

    #[test]
    fn test_move_row_keeps_shared_values() {
        let mut src = Table::new(FamilyId(1), vec![column::<u32>(10)]);
        let mut dest = Table::new(FamilyId(2), vec![column::<u32>(10), column::<f64>(11)]);
        let row = src.push(Entity::from_raw(1));
        *src.get_mut::<u32>(row, Entity::from_raw(10)).unwrap().unwrap() = 42;

        let (new_row, moved) = src.move_row(row, &mut dest).unwrap();
        assert_eq!(moved, None);
        assert!(src.is_empty());
        assert_eq!(dest.get::<u32>(new_row, Entity::from_raw(10)).unwrap(), Some(&42));
        assert_eq!(dest.get::<f64>(new_row, Entity::from_raw(11)).unwrap(), Some(&0.0));
    }
}
