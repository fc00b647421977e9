//! Configuration types for the ambience engine

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors raised while validating configuration and definitions at load time
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("range `{field}` contains a non-finite bound")]
    NonFiniteRange { field: &'static str },

    #[error("`{field}` must be finite, got {value}")]
    NonFiniteValue { field: &'static str, value: f32 },

    #[error("`{field}` must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("layer `{0}` has no elements")]
    EmptyLayer(String),

    #[error("element `{0}` has an empty sound set")]
    EmptySoundSet(String),

    #[error("parameter name must not be empty")]
    UnnamedParameter,
}

/// Runtime settings for an [`AmbienceSystem`](crate::audio::AmbienceSystem)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbienceConfig {
    /// Seed for placement and interval sampling; `None` seeds from entropy
    pub rng_seed: Option<u64>,
    /// Initial state of the emitter debug visualization
    pub debug_draw: bool,
    /// Pool size above which growth is reported as a warning
    pub pool_warning_threshold: usize,
    /// Longest frame step a single tick will simulate
    pub max_delta_time: f32,
}

impl AmbienceConfig {
    /// Config with a fixed seed, for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Check the config for values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_delta_time.is_finite() {
            return Err(ConfigError::NonFiniteValue {
                field: "max_delta_time",
                value: self.max_delta_time,
            });
        }
        if self.max_delta_time <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "max_delta_time",
                value: self.max_delta_time,
            });
        }
        debug!(
            rng_seed = ?self.rng_seed,
            debug_draw = self.debug_draw,
            pool_warning_threshold = self.pool_warning_threshold,
            max_delta_time = self.max_delta_time,
            "Validated AmbienceConfig"
        );
        Ok(())
    }
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            debug_draw: false,
            pool_warning_threshold: 64,
            max_delta_time: 1.0,
        }
    }
}
