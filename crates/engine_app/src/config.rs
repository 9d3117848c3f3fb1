//! Application configuration.
//!
//! Defaults apply unless `ENGINE_APP_CONFIG` names a JSON file, in which
//! case missing fields still fall back to their defaults.

use std::path::Path;

use anyhow::{Context, Result};
use engine_system::WorldConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::tick::TickConfig;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV: &str = "ENGINE_APP_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tick: TickConfig,
    pub world: WorldConfig,
}

impl AppConfig {
    /// Load from the file named by [`CONFIG_ENV`], or use the defaults.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.world.measure_system_time);
    }

    #[test]
    fn test_partial_override() {
        let config =
            AppConfig::from_json(r#"{ "tick": { "max_ticks": 10 }, "world": { "measure_system_time": false } }"#)
                .unwrap();
        assert_eq!(config.tick.max_ticks, 10);
        assert_eq!(config.tick.tick_rate, 60.0);
        assert!(!config.world.measure_system_time);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(AppConfig::from_json("{ tick: }").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/engine_app.json")).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
