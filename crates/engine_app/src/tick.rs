//! Fixed-rate tick loop.
//!
//! Each tick advances the world by one frame with a constant delta time,
//! then sleeps for whatever is left of the tick budget.

use std::time::{Duration, Instant};

use engine_system::World;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Seconds per tick. Non-positive rates fall back to the default.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        let rate = if self.tick_rate > 0.0 {
            self.tick_rate
        } else {
            Self::default().tick_rate
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

/// Drives a [`World`] one frame per tick.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    world: World,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Consume the loop, handing back the world.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Run one frame.
    pub fn tick(&mut self, dt: f32) {
        self.tick_id += 1;
        debug!(tick_id = self.tick_id, dt, "tick start");
        self.world.progress(dt);
    }

    /// Run for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) {
        let tick_duration = self.config.tick_duration();
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick(tick_duration.as_secs_f32());

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
