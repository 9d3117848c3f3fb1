//! # engine_system
//!
//! Reactive systems for the ECS engine.
//!
//! A system is a named entity with a signature (which components it reads,
//! and from where) and an action. Depending on its kind and signature it
//! becomes:
//!
//! 1. A **table system**, run over every matching table once per frame phase
//!    or on demand.
//! 2. A **trigger**, run for one entity when its components are added,
//!    removed or set.
//! 3. A **task**, run once per frame without entities.
//! 4. A **finalizer**, run once when the world is dropped.
//!
//! ## Usage
//!
//! ```rust
//! use engine_system::{SystemKind, World};
//!
//! #[derive(Debug, Default, Clone, Copy)]
//! struct Position(f32);
//!
//! #[derive(Debug, Default, Clone, Copy)]
//! struct Velocity(f32);
//!
//! let mut world = World::default();
//! let position = world.component::<Position>("Position").unwrap();
//! let velocity = world.component::<Velocity>("Velocity").unwrap();
//!
//! world
//!     .register_system("Move", SystemKind::OnFrame, "Position, Velocity", |rows| {
//!         let dt = rows.delta_time();
//!         if let Some((p, v)) = rows.column_pair_mut::<Position, Velocity>(1, 2) {
//!             for (p, v) in p.iter_mut().zip(v) {
//!                 p.0 += v.0 * dt;
//!             }
//!         }
//!     })
//!     .unwrap();
//!
//! let e = world.new_entity();
//! world.set(e, position, Position(0.0)).unwrap();
//! world.set(e, velocity, Velocity(2.0)).unwrap();
//! world.progress(0.5);
//! assert_eq!(world.get::<Position>(e, position).unwrap().0, 1.0);
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod kind;
pub mod registry;
pub mod rows;
pub mod schedule;
pub mod system;
pub mod world;

pub use config::WorldConfig;
pub use error::SystemError;
pub use index::FamilySystemIndex;
pub use kind::SystemKind;
pub use registry::{Classification, SystemRegistry};
pub use rows::Rows;
pub use schedule::FrameSchedule;
pub use system::{ColSystem, ColumnSource, MatchedTable, RowRole, RowSystem, System, SystemBase};
pub use world::World;
