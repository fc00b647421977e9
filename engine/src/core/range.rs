//! Closed float ranges used for intervals, radii and scale mappings

use crate::config::ConfigError;
use crate::AmbienceRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A closed `[min, max]` interval.
///
/// Constructed through [`FloatRange::new`] the bounds are always ordered and
/// finite, so sampling and remapping never have to re-check them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    /// Create a range, swapping the bounds if they were given in reverse order
    pub fn new(min: f32, max: f32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A degenerate range containing a single value
    pub const fn splat(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// The `[0, 1]` range
    pub const UNIT: Self = Self { min: 0.0, max: 1.0 };

    /// Validate a deserialized range and put its bounds in order
    pub fn sanitized(self, field: &'static str) -> Result<Self, ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NonFiniteRange { field });
        }
        Ok(Self::new(self.min, self.max))
    }

    /// Like [`FloatRange::sanitized`], additionally clamping both bounds to be non-negative
    pub fn sanitized_non_negative(self, field: &'static str) -> Result<Self, ConfigError> {
        let range = self.sanitized(field)?;
        Ok(Self::new(range.min.max(0.0), range.max.max(0.0)))
    }

    /// Width of the range
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Whether `value` lies inside the closed range
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Linear interpolation from `min` (alpha 0) to `max` (alpha 1)
    pub fn lerp(&self, alpha: f32) -> f32 {
        self.min + (self.max - self.min) * alpha
    }

    /// Map `value` onto `[0, 1]`, clamped.
    ///
    /// A degenerate range maps everything at or above its value to 1.
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.span();
        if span <= f32::EPSILON {
            return if value >= self.max { 1.0 } else { 0.0 };
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Uniformly sample a value inside the range
    pub fn sample(&self, rng: &mut AmbienceRng) -> f32 {
        if self.span() <= 0.0 {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

impl Default for FloatRange {
    fn default() -> Self {
        Self::UNIT
    }
}

impl From<[f32; 2]> for FloatRange {
    fn from(bounds: [f32; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}
