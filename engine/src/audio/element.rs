//! Element definitions: what plays, where it is placed and how often

use crate::audio::distribution::{DistributionConfig, Distributor};
use crate::audio::parameter::ParameterModifier;
use crate::config::ConfigError;
use crate::core::FloatRange;
use crate::AmbienceRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies a runtime element instance inside the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementInstanceId(pub(crate) u64);

impl fmt::Display for ElementInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// When the next countdown of an element starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMode {
    /// Re-arm immediately when the element fires
    OnSpawn,
    /// Re-arm once the playback started by the last fire has completed
    #[default]
    OnFinished,
}

/// Kind of playback handle an element needs; handles are pooled per class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceClass(String);

impl SourceClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceClass {
    fn default() -> Self {
        Self::new("ambient_emitter")
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn unit_scale() -> FloatRange {
    FloatRange::splat(1.0)
}

/// Pool of interchangeable sounds an element picks from on every fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSet {
    /// Asset paths, resolved lazily on first use
    pub sounds: Vec<String>,
    #[serde(default = "unit_scale")]
    pub volume: FloatRange,
    #[serde(default = "unit_scale")]
    pub pitch: FloatRange,
}

impl SoundSet {
    pub fn new(sounds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            sounds: sounds.into_iter().map(Into::into).collect(),
            volume: unit_scale(),
            pitch: unit_scale(),
        }
    }

    pub fn with_volume(mut self, volume: FloatRange) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pitch(mut self, pitch: FloatRange) -> Self {
        self.pitch = pitch;
        self
    }

    /// Pick one sound uniformly
    pub fn pick(&self, rng: &mut AmbienceRng) -> Option<&str> {
        match self.sounds.len() {
            0 => None,
            1 => Some(&self.sounds[0]),
            len => Some(&self.sounds[rng.gen_range(0..len)]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

/// Immutable, asset-like description of one procedural sound
#[derive(Debug)]
pub struct ElementDefinition {
    name: String,
    pub sound_set: SoundSet,
    pub distribution: DistributionConfig,
    pub interval_range: FloatRange,
    pub interval_mode: IntervalMode,
    pub source_class: SourceClass,
    pub distributor: Option<Arc<dyn Distributor>>,
    pub parameter_modifiers: Vec<ParameterModifier>,
}

/// Shared handle to an element definition
pub type ElementRef = Arc<ElementDefinition>;

impl ElementDefinition {
    pub fn builder(name: impl Into<String>, sound_set: SoundSet) -> ElementBuilder {
        ElementBuilder::new(name, sound_set)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The per-element placement override, if any
    pub fn distributor(&self) -> Option<&dyn Distributor> {
        self.distributor.as_deref()
    }
}

/// Builder validating an [`ElementDefinition`] once, at load time
pub struct ElementBuilder {
    name: String,
    sound_set: SoundSet,
    distribution: DistributionConfig,
    interval_range: FloatRange,
    interval_mode: IntervalMode,
    source_class: SourceClass,
    distributor: Option<Arc<dyn Distributor>>,
    parameter_modifiers: Vec<ParameterModifier>,
}

impl ElementBuilder {
    pub fn new(name: impl Into<String>, sound_set: SoundSet) -> Self {
        Self {
            name: name.into(),
            sound_set,
            distribution: DistributionConfig::default(),
            interval_range: FloatRange::new(5.0, 15.0),
            interval_mode: IntervalMode::default(),
            source_class: SourceClass::default(),
            distributor: None,
            parameter_modifiers: Vec::new(),
        }
    }

    pub fn distribution(mut self, distribution: DistributionConfig) -> Self {
        self.distribution = distribution;
        self
    }

    /// Seconds between fires, before density scaling
    pub fn interval(mut self, min: f32, max: f32) -> Self {
        self.interval_range = FloatRange { min, max };
        self
    }

    pub fn interval_mode(mut self, mode: IntervalMode) -> Self {
        self.interval_mode = mode;
        self
    }

    pub fn source_class(mut self, class: SourceClass) -> Self {
        self.source_class = class;
        self
    }

    /// Replace the built-in placement modes for this element
    pub fn distributor(mut self, distributor: Arc<dyn Distributor>) -> Self {
        self.distributor = Some(distributor);
        self
    }

    pub fn modifier(mut self, modifier: ParameterModifier) -> Self {
        self.parameter_modifiers.push(modifier);
        self
    }

    pub fn build(self) -> Result<ElementRef, ConfigError> {
        if self.sound_set.is_empty() {
            return Err(ConfigError::EmptySoundSet(self.name));
        }
        let sound_set = SoundSet {
            volume: self.sound_set.volume.sanitized_non_negative("volume")?,
            pitch: self.sound_set.pitch.sanitized_non_negative("pitch")?,
            sounds: self.sound_set.sounds,
        };
        Ok(Arc::new(ElementDefinition {
            name: self.name,
            sound_set,
            distribution: self.distribution.sanitized()?,
            interval_range: self.interval_range.sanitized_non_negative("interval_range")?,
            interval_mode: self.interval_mode,
            source_class: self.source_class,
            distributor: self.distributor,
            parameter_modifiers: self.parameter_modifiers,
        }))
    }
}
