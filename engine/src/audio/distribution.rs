//! Spatial placement of firing elements around the listener
//!
//! Placements are composed on the horizontal X/Y plane with Z as up:
//! `listener + (r·cos θ, r·sin θ, z)`.
//!
//! Three built-in modes are provided:
//! - **Random**: uniform angle, uniform radius inside the horizontal range
//! - **Uniform**: steers new emitters into the least crowded degree of the
//!   circle, based on a histogram of currently active emitters
//! - **Static**: keeps re-using the previous location while the listener
//!   stays close to it
//!
//! Elements may also carry their own [`Distributor`], which replaces the
//! built-in modes for that element.

use crate::config::ConfigError;
use crate::core::FloatRange;
use crate::AmbienceRng;
use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use tracing::trace;

/// Number of angular buckets used by the uniform mode, one per degree
pub const HISTOGRAM_BUCKETS: usize = 360;

/// Placement algorithm for an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    #[default]
    Random,
    Uniform,
    Static,
}

/// How an element is placed around the listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub mode: DistributionMode,
    /// Distance from the listener on the horizontal plane
    pub horizontal_range: FloatRange,
    /// Total height of the vertical band, centred on `vertical_offset`
    pub vertical_range: f32,
    /// Height bias added to every placement
    pub vertical_offset: f32,
    /// Horizontal jitter, `±drift_amount / 2` per axis
    pub drift_amount: f32,
    /// Static mode relocates once the listener is this far from the anchor
    pub static_relocation_threshold: f32,
}

impl DistributionConfig {
    /// Clamp negative extents to zero and order the horizontal range
    pub fn sanitized(self) -> Result<Self, ConfigError> {
        let finite = |field: &'static str, value: f32| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ConfigError::NonFiniteValue { field, value })
            }
        };
        Ok(Self {
            mode: self.mode,
            horizontal_range: self
                .horizontal_range
                .sanitized_non_negative("horizontal_range")?,
            vertical_range: finite("vertical_range", self.vertical_range)?.max(0.0),
            vertical_offset: finite("vertical_offset", self.vertical_offset)?,
            drift_amount: finite("drift_amount", self.drift_amount)?.max(0.0),
            static_relocation_threshold: finite(
                "static_relocation_threshold",
                self.static_relocation_threshold,
            )?
            .max(0.0),
        })
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            mode: DistributionMode::Random,
            horizontal_range: FloatRange::new(5.0, 20.0),
            vertical_range: 2.0,
            vertical_offset: 0.0,
            drift_amount: 1.0,
            static_relocation_threshold: 15.0,
        }
    }
}

/// Everything a distributor may look at when placing one element
#[derive(Debug, Clone, Copy)]
pub struct DistributionRequest<'a> {
    pub config: &'a DistributionConfig,
    pub listener: Vec3,
    /// Where this element last played, if it has played before
    pub last_play_location: Option<Vec3>,
    /// Locations of every emitter currently playing
    pub active_emitters: &'a [Vec3],
}

/// Placement capability. Returning `None` defers to the built-in modes.
pub trait Distributor: Send + Sync + fmt::Debug {
    fn try_distribute(
        &self,
        request: &DistributionRequest<'_>,
        rng: &mut AmbienceRng,
    ) -> Option<Vec3>;
}

/// The built-in Random / Uniform / Static placement modes
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialDistributor;

impl SpatialDistributor {
    pub fn new() -> Self {
        Self
    }

    /// Place an element, giving a per-element override the first chance
    pub fn distribute_with(
        &self,
        custom: Option<&dyn Distributor>,
        request: &DistributionRequest<'_>,
        rng: &mut AmbienceRng,
    ) -> Vec3 {
        if let Some(custom) = custom {
            if let Some(location) = custom.try_distribute(request, rng) {
                return location;
            }
            trace!(?custom, "Custom distributor declined, using built-in mode");
        }
        self.distribute(request, rng)
    }

    /// Place an element with its configured built-in mode
    pub fn distribute(&self, request: &DistributionRequest<'_>, rng: &mut AmbienceRng) -> Vec3 {
        match request.config.mode {
            DistributionMode::Random => random_placement(request.config, request.listener, rng),
            DistributionMode::Uniform => uniform_placement(request, rng),
            DistributionMode::Static => static_placement(request, rng),
        }
    }
}

impl Distributor for SpatialDistributor {
    fn try_distribute(
        &self,
        request: &DistributionRequest<'_>,
        rng: &mut AmbienceRng,
    ) -> Option<Vec3> {
        Some(self.distribute(request, rng))
    }
}

fn random_placement(config: &DistributionConfig, listener: Vec3, rng: &mut AmbienceRng) -> Vec3 {
    let angle = rng.gen_range(0.0..TAU);
    place_at_angle(config, listener, angle, rng)
}

fn uniform_placement(request: &DistributionRequest<'_>, rng: &mut AmbienceRng) -> Vec3 {
    let histogram = angular_histogram(request.listener, request.active_emitters);
    let bucket = least_crowded_bucket(&histogram);
    trace!(
        bucket,
        emitters = request.active_emitters.len(),
        "Uniform placement picked bucket"
    );

    let angle = (bucket as f32).to_radians();
    let location = place_at_angle(request.config, request.listener, angle, rng);
    location + horizontal_drift(request.config.drift_amount, rng).extend(0.0)
}

fn static_placement(request: &DistributionRequest<'_>, rng: &mut AmbienceRng) -> Vec3 {
    let config = request.config;
    match request.last_play_location {
        Some(anchor) if request.listener.distance(anchor) < config.static_relocation_threshold => {
            anchor + horizontal_drift(config.drift_amount, rng).extend(0.0)
        }
        _ => random_placement(config, request.listener, rng),
    }
}

fn place_at_angle(config: &DistributionConfig, listener: Vec3, angle: f32, rng: &mut AmbienceRng) -> Vec3 {
    let radius = config.horizontal_range.sample(rng);
    let half_height = config.vertical_range * 0.5;
    let height = FloatRange::new(-half_height, half_height).sample(rng) + config.vertical_offset;
    let (sin, cos) = angle.sin_cos();
    listener + Vec3::new(radius * cos, radius * sin, height)
}

/// Independent jitter in `[-amount/2, amount/2]` on each horizontal axis
fn horizontal_drift(amount: f32, rng: &mut AmbienceRng) -> Vec2 {
    if amount <= 0.0 {
        return Vec2::ZERO;
    }
    let half = amount * 0.5;
    Vec2::new(rng.gen_range(-half..=half), rng.gen_range(-half..=half))
}

/// Degree bucket of `emitter` as seen from `listener` on the horizontal plane
pub fn angle_bucket(listener: Vec3, emitter: Vec3) -> Option<usize> {
    let direction = (emitter - listener).truncate().try_normalize()?;
    let degrees = direction.y.atan2(direction.x).to_degrees().round() as i32;
    Some(degrees.rem_euclid(HISTOGRAM_BUCKETS as i32) as usize)
}

/// Count active emitters per degree around the listener.
///
/// Emitters directly above or below the listener have no bearing and are
/// left out.
pub fn angular_histogram(listener: Vec3, emitters: &[Vec3]) -> [u32; HISTOGRAM_BUCKETS] {
    let mut histogram = [0u32; HISTOGRAM_BUCKETS];
    for bucket in emitters
        .iter()
        .filter_map(|emitter| angle_bucket(listener, *emitter))
    {
        histogram[bucket] += 1;
    }
    histogram
}

/// Index of the lowest count; ties resolve to the lowest index
pub fn least_crowded_bucket(histogram: &[u32; HISTOGRAM_BUCKETS]) -> usize {
    let mut best = 0;
    for (bucket, count) in histogram.iter().enumerate().skip(1) {
        if *count < histogram[best] {
            best = bucket;
        }
    }
    best
}
