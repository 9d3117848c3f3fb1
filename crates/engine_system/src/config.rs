//! World configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Accumulate the wall-clock time each system spends in its action.
    pub measure_system_time: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            measure_system_time: true,
        }
    }
}

impl WorldConfig {
    /// Toggle time measurement.
    #[must_use]
    pub fn with_time_measurement(mut self, enabled: bool) -> Self {
        self.measure_system_time = enabled;
        self
    }
}
