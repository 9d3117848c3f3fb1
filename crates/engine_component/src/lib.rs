//! # engine_component
//!
//! The storage half of the engine: what an entity is, how sets of components
//! are named, and where component values live.
//!
//! This crate provides:
//!
//! - [`Entity`] and [`EntityAllocator`] for identifiers.
//! - [`FamilyId`] and [`FamilyRegistry`] for interned component sets, plus the
//!   [`FamilyAlgebra`] seam used by the signature compiler.
//! - [`ComponentInfo`] and [`ColumnStorage`] for type-erased columns.
//! - [`Table`], one struct-of-arrays block per family.
//! - [`Store`], which ties the above together.

pub mod component;
pub mod entity;
pub mod error;
pub mod family;
pub mod store;
pub mod table;

pub use component::{ColumnFactory, ColumnStorage, ComponentInfo};
pub use entity::{Entity, EntityAllocator};
pub use error::StoreError;
pub use family::{Containment, FamilyAlgebra, FamilyId, FamilyRegistry};
pub use store::{Location, Store};
pub use table::{Column, Table};
