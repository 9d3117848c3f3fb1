//! # engine_app
//!
//! A small host for the reactive ECS engine. It builds a world, registers a
//! handful of systems and drives frames with a fixed-rate tick loop.
//!
//! ## Startup Sequence
//!
//! 1. Load [`AppConfig`] (`ENGINE_APP_CONFIG` names an optional JSON file).
//! 2. Register components and systems.
//! 3. Spawn entities and run the tick loop.
//! 4. Drop the world, which runs its finalizers.

mod config;
mod tick;

use anyhow::Result;
use engine_system::{SystemKind, World};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use tick::TickLoop;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let config = AppConfig::load()?;
    info!(?config, "engine starting");

    let mut world = World::new(config.world.clone());
    let position = world.component::<Position>("Position")?;
    let velocity = world.component::<Velocity>("Velocity")?;

    world.register_system("Move", SystemKind::OnFrame, "Position, Velocity", |rows| {
        let dt = rows.delta_time();
        if let Some((positions, velocities)) = rows.column_pair_mut::<Position, Velocity>(1, 2) {
            for (p, v) in positions.iter_mut().zip(velocities) {
                p.x += v.x * dt;
                p.y += v.y * dt;
            }
        }
    })?;

    world.register_system("Spawned", SystemKind::OnAdd, "Position", |rows| {
        if let Some(entity) = rows.entity() {
            info!(%entity, "entity spawned");
        }
    })?;

    world.register_system("Report", SystemKind::OnStore, "Position", |rows| {
        let entities = rows.entities().to_vec();
        if let Some(positions) = rows.column::<Position>(1) {
            for (entity, p) in entities.iter().zip(positions) {
                tracing::debug!(%entity, x = p.x, y = p.y, "position");
            }
        }
    })?;

    world.register_system("Shutdown", SystemKind::OnRemove, "0", |_| {
        info!("world shutting down");
    })?;

    for i in 0..4u8 {
        let entity = world.new_entity();
        world.set(entity, position, Position::default())?;
        world.set(
            entity,
            velocity,
            Velocity {
                x: f32::from(i),
                y: 1.0,
            },
        )?;
    }

    let mut tick_loop = TickLoop::new(config.tick, world);
    tick_loop.run();
    info!(frames = tick_loop.world().frame_count(), "tick loop stopped");

    let world = tick_loop.into_world();
    for system in world.systems() {
        info!(
            system = system.name(),
            invocations = system.invocations(),
            time_us = system.time_spent().as_micros() as u64,
            "system stats"
        );
    }

    info!("engine shut down");
    Ok(())
}
