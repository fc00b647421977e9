//! Soundscape manifests
//!
//! A manifest is a JSON document describing the runtime config, the game
//! parameters and the layers of one soundscape. Modifiers refer to parameters
//! by name; loading resolves those names into shared definitions and
//! validates every element and layer once.

use crate::audio::distribution::DistributionConfig;
use crate::audio::element::{ElementDefinition, ElementRef, IntervalMode, SoundSet, SourceClass};
use crate::audio::layer::{LayerDefinition, LayerRef};
use crate::audio::parameter::{ParameterDefinition, ParameterModifier, ParameterRef};
use crate::config::{AmbienceConfig, ConfigError};
use crate::core::FloatRange;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Errors that can occur while loading a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid definition `{name}`: {source}")]
    Invalid {
        name: String,
        #[source]
        source: ConfigError,
    },

    #[error("`{owner}` refers to unknown parameter `{parameter}`")]
    UnknownParameter { owner: String, parameter: String },

    #[error("parameter `{0}` is declared more than once")]
    DuplicateParameter(String),
}

/// Serialized form of a soundscape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundscapeManifest {
    #[serde(default)]
    pub config: AmbienceConfig,
    #[serde(default)]
    pub parameters: Vec<ParameterManifest>,
    #[serde(default)]
    pub layers: Vec<LayerManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterManifest {
    pub name: String,
    #[serde(default)]
    pub range: FloatRange,
    #[serde(default)]
    pub default: f32,
}

fn unit_scale() -> FloatRange {
    FloatRange::splat(1.0)
}

/// Modifier ranges are kept as written so `min > max` inverts the mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierManifest {
    pub parameter: String,
    #[serde(default = "unit_scale")]
    pub density_scale_range: FloatRange,
    #[serde(default = "unit_scale")]
    pub volume_scale_range: FloatRange,
}

fn default_interval() -> FloatRange {
    FloatRange::new(5.0, 15.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementManifest {
    pub name: String,
    #[serde(flatten)]
    pub sound_set: SoundSet,
    #[serde(default = "default_interval")]
    pub interval: FloatRange,
    #[serde(default)]
    pub interval_mode: IntervalMode,
    #[serde(default)]
    pub source_class: SourceClass,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub modifiers: Vec<ModifierManifest>,
}

fn default_multiplier() -> f32 {
    1.0
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerManifest {
    pub name: String,
    pub elements: Vec<ElementManifest>,
    #[serde(default)]
    pub modifiers: Vec<ModifierManifest>,
    #[serde(default = "default_multiplier")]
    pub density_multiplier: f32,
    #[serde(default = "default_multiplier")]
    pub volume_multiplier: f32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub lifetime: Option<f32>,
}

/// A loaded, validated soundscape.
///
/// Modifiers only hold weak references to their parameters, so the
/// soundscape must outlive any layer activated from it for the modifiers to
/// keep reading live values.
#[derive(Debug, Clone)]
pub struct Soundscape {
    pub config: AmbienceConfig,
    pub parameters: Vec<ParameterRef>,
    pub layers: Vec<LayerRef>,
}

impl Soundscape {
    /// Load a manifest from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        info!(?path, "Loading soundscape manifest");
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and resolve a manifest from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: SoundscapeManifest = serde_json::from_str(json)?;
        Self::from_manifest(manifest)
    }

    pub fn from_manifest(manifest: SoundscapeManifest) -> Result<Self, ManifestError> {
        manifest.config.validate().map_err(|source| ManifestError::Invalid {
            name: "config".to_string(),
            source,
        })?;

        let mut by_name: HashMap<String, ParameterRef> = HashMap::new();
        let mut parameters = Vec::with_capacity(manifest.parameters.len());
        for entry in manifest.parameters {
            if by_name.contains_key(&entry.name) {
                return Err(ManifestError::DuplicateParameter(entry.name));
            }
            let parameter = ParameterDefinition::new(entry.name.clone(), entry.range, entry.default)
                .map_err(|source| ManifestError::Invalid {
                    name: entry.name.clone(),
                    source,
                })?;
            by_name.insert(entry.name, ParameterRef::clone(&parameter));
            parameters.push(parameter);
        }

        let layers = manifest
            .layers
            .into_iter()
            .map(|layer| build_layer(layer, &by_name))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            parameters = parameters.len(),
            layers = layers.len(),
            "Resolved soundscape manifest"
        );
        Ok(Self {
            config: manifest.config,
            parameters,
            layers,
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterRef> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn layer(&self, name: &str) -> Option<&LayerRef> {
        self.layers.iter().find(|l| l.name() == name)
    }
}

fn build_modifier(
    owner: &str,
    entry: &ModifierManifest,
    parameters: &HashMap<String, ParameterRef>,
) -> Result<ParameterModifier, ManifestError> {
    let parameter = parameters
        .get(&entry.parameter)
        .ok_or_else(|| ManifestError::UnknownParameter {
            owner: owner.to_string(),
            parameter: entry.parameter.clone(),
        })?;

    let finite = |range: FloatRange, field: &'static str| {
        if range.min.is_finite() && range.max.is_finite() {
            Ok(range)
        } else {
            Err(ManifestError::Invalid {
                name: owner.to_string(),
                source: ConfigError::NonFiniteRange { field },
            })
        }
    };
    Ok(ParameterModifier::new(
        parameter,
        finite(entry.density_scale_range, "density_scale_range")?,
        finite(entry.volume_scale_range, "volume_scale_range")?,
    ))
}

fn build_element(
    entry: ElementManifest,
    parameters: &HashMap<String, ParameterRef>,
) -> Result<ElementRef, ManifestError> {
    let mut builder = ElementDefinition::builder(entry.name.clone(), entry.sound_set)
        .interval(entry.interval.min, entry.interval.max)
        .interval_mode(entry.interval_mode)
        .source_class(entry.source_class)
        .distribution(entry.distribution);
    for modifier in &entry.modifiers {
        builder = builder.modifier(build_modifier(&entry.name, modifier, parameters)?);
    }
    builder.build().map_err(|source| ManifestError::Invalid {
        name: entry.name,
        source,
    })
}

fn build_layer(
    entry: LayerManifest,
    parameters: &HashMap<String, ParameterRef>,
) -> Result<LayerRef, ManifestError> {
    let mut builder = LayerDefinition::builder(entry.name.clone())
        .density_multiplier(entry.density_multiplier)
        .volume_multiplier(entry.volume_multiplier)
        .enabled(entry.enabled);
    if let Some(lifetime) = entry.lifetime {
        builder = builder.lifetime(lifetime);
    }
    for modifier in &entry.modifiers {
        builder = builder.modifier(build_modifier(&entry.name, modifier, parameters)?);
    }
    for element in entry.elements {
        builder = builder.element(build_element(element, parameters)?);
    }
    builder.build().map_err(|source| ManifestError::Invalid {
        name: entry.name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::distribution::DistributionMode;

    const FOREST: &str = r#"{
        "config": { "rng_seed": 7 },
        "parameters": [
            { "name": "tension", "range": { "min": 0.0, "max": 10.0 }, "default": 0.0 }
        ],
        "layers": [{
            "name": "forest",
            "density_multiplier": 1.5,
            "modifiers": [
                { "parameter": "tension", "density_scale_range": { "min": 1.0, "max": 0.25 } }
            ],
            "elements": [{
                "name": "owl",
                "sounds": ["owl_01.ogg", "owl_02.ogg"],
                "volume": { "min": 0.6, "max": 0.9 },
                "interval": { "min": 4.0, "max": 12.0 },
                "interval_mode": "on_spawn",
                "source_class": "bird",
                "distribution": { "mode": "uniform", "horizontal_range": { "min": 8.0, "max": 25.0 } }
            }]
        }]
    }"#;

    #[test]
    fn test_forest_manifest() {
        let soundscape = Soundscape::from_json(FOREST).unwrap();
        assert_eq!(soundscape.config.rng_seed, Some(7));
        assert_eq!(soundscape.parameters.len(), 1);

        let layer = soundscape.layer("forest").unwrap();
        assert_eq!(layer.density_multiplier(), 1.5);
        assert!(layer.is_enabled());

        // Inverted modifier ranges are preserved
        let modifier = &layer.parameter_modifiers()[0];
        assert_eq!(modifier.density_scale_range, FloatRange { min: 1.0, max: 0.25 });
        let tension = soundscape.parameter("tension").unwrap();
        assert!(modifier.references(tension));

        let owl = &layer.elements()[0];
        assert_eq!(owl.name(), "owl");
        assert_eq!(owl.interval_mode, IntervalMode::OnSpawn);
        assert_eq!(owl.source_class.as_str(), "bird");
        assert_eq!(owl.sound_set.sounds.len(), 2);
        assert_eq!(owl.sound_set.pitch, FloatRange::splat(1.0));
        assert_eq!(owl.distribution.mode, DistributionMode::Uniform);
        assert_eq!(owl.distribution.vertical_range, 2.0);
    }

    #[test]
    fn test_unknown_parameter() {
        let json = r#"{
            "layers": [{
                "name": "wind",
                "modifiers": [{ "parameter": "storm" }],
                "elements": [{ "name": "gust", "sounds": ["gust.ogg"] }]
            }]
        }"#;
        match Soundscape::from_json(json) {
            Err(ManifestError::UnknownParameter { owner, parameter }) => {
                assert_eq!(owner, "wind");
                assert_eq!(parameter, "storm");
            }
            other => panic!("expected unknown parameter, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_parameter() {
        let json = r#"{
            "parameters": [{ "name": "rain" }, { "name": "rain" }]
        }"#;
        assert!(matches!(
            Soundscape::from_json(json),
            Err(ManifestError::DuplicateParameter(name)) if name == "rain"
        ));
    }

    #[test]
    fn test_empty_layer_is_rejected() {
        let json = r#"{ "layers": [{ "name": "silence", "elements": [] }] }"#;
        assert!(matches!(
            Soundscape::from_json(json),
            Err(ManifestError::Invalid { source: ConfigError::EmptyLayer(_), .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        fs::write(&path, FOREST).unwrap();

        let soundscape = Soundscape::load(&path).unwrap();
        assert_eq!(soundscape.layers.len(), 1);

        assert!(matches!(
            Soundscape::load(dir.path().join("missing.json")),
            Err(ManifestError::Io(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Soundscape::from_json("{ \"layers\": 3 }"),
            Err(ManifestError::Json(_))
        ));
    }
}
