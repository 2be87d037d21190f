//! Simulation configuration with documented constants
//!
//! The clock rate and the motion slack live here; everything else about an
//! entity comes from the entity-type catalog.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{GridError, Result};

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed number of ticks per simulated second
    ///
    /// Movement speeds are in cells per second, so one move at speed 1.0
    /// takes exactly this many ticks.
    pub ticks_per_second: u32,

    /// Unclamped move fraction at which the source cell is released
    ///
    /// At 3.0 an entity keeps claiming its source for two full move
    /// durations after arriving. Slower or equal neighbors moving in
    /// lock-step behind it still see the claim during their own checks.
    pub retire_source_after: f64,

    /// Movement speed (cells/second) for entities whose type sets none
    pub default_movement_speed: f64,

    /// Seed for the random-walk RNG; `None` draws one from the OS
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            retire_source_after: 3.0,
            default_movement_speed: 1.0,
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_ticks_per_second(mut self, ticks_per_second: u32) -> Self {
        self.ticks_per_second = ticks_per_second;
        self
    }

    /// Parse a config from TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_second == 0 {
            return Err(GridError::InvalidConfig(
                "ticks_per_second must be at least 1".into(),
            ));
        }

        // Anything below one full move would free the source before arrival
        if !(self.retire_source_after >= 1.0) || !self.retire_source_after.is_finite() {
            return Err(GridError::InvalidConfig(format!(
                "retire_source_after ({}) must be a finite value >= 1.0",
                self.retire_source_after
            )));
        }

        if !(self.default_movement_speed > 0.0) || !self.default_movement_speed.is_finite() {
            return Err(GridError::InvalidConfig(format!(
                "default_movement_speed ({}) must be positive",
                self.default_movement_speed
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str("ticks_per_second = 30\nrng_seed = 7").unwrap();
        assert_eq!(config.ticks_per_second, 30);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.retire_source_after, 3.0);
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let err = SimulationConfig::from_toml_str("ticks_per_second = 0").unwrap_err();
        assert!(matches!(err, GridError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_early_source_retirement() {
        let config = SimulationConfig {
            retire_source_after: 0.5,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
