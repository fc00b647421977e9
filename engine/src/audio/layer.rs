//! Layers group elements under shared density and volume controls

use crate::audio::element::ElementRef;
use crate::audio::parameter::ParameterModifier;
use crate::config::ConfigError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Upper bound for the layer density and volume multipliers
pub const MAX_LAYER_MULTIPLIER: f32 = 2.0;

/// Identifies an activated layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// A named group of elements
#[derive(Debug)]
pub struct LayerDefinition {
    name: String,
    elements: Vec<ElementRef>,
    parameter_modifiers: Vec<ParameterModifier>,
    density_multiplier: f32,
    volume_multiplier: f32,
    enabled: bool,
    lifetime: Option<f32>,
}

/// Shared handle to a layer definition
pub type LayerRef = Arc<LayerDefinition>;

impl LayerDefinition {
    pub fn builder(name: impl Into<String>) -> LayerBuilder {
        LayerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[ElementRef] {
        &self.elements
    }

    pub fn parameter_modifiers(&self) -> &[ParameterModifier] {
        &self.parameter_modifiers
    }

    /// Always in `(0, 2]`; higher values fire more often
    pub fn density_multiplier(&self) -> f32 {
        self.density_multiplier
    }

    /// Always in `(0, 2]`
    pub fn volume_multiplier(&self) -> f32 {
        self.volume_multiplier
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Seconds after activation at which the layer deactivates itself
    pub fn lifetime(&self) -> Option<f32> {
        self.lifetime
    }
}

/// Builder validating a [`LayerDefinition`]
pub struct LayerBuilder {
    name: String,
    elements: Vec<ElementRef>,
    parameter_modifiers: Vec<ParameterModifier>,
    density_multiplier: f32,
    volume_multiplier: f32,
    enabled: bool,
    lifetime: Option<f32>,
}

impl LayerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            parameter_modifiers: Vec::new(),
            density_multiplier: 1.0,
            volume_multiplier: 1.0,
            enabled: true,
            lifetime: None,
        }
    }

    pub fn element(mut self, element: ElementRef) -> Self {
        self.elements.push(element);
        self
    }

    pub fn elements(mut self, elements: impl IntoIterator<Item = ElementRef>) -> Self {
        self.elements.extend(elements);
        self
    }

    pub fn modifier(mut self, modifier: ParameterModifier) -> Self {
        self.parameter_modifiers.push(modifier);
        self
    }

    pub fn density_multiplier(mut self, multiplier: f32) -> Self {
        self.density_multiplier = multiplier;
        self
    }

    pub fn volume_multiplier(mut self, multiplier: f32) -> Self {
        self.volume_multiplier = multiplier;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    pub fn build(self) -> Result<LayerRef, ConfigError> {
        if self.elements.is_empty() {
            return Err(ConfigError::EmptyLayer(self.name));
        }
        let density_multiplier = validate_multiplier("density_multiplier", self.density_multiplier)?;
        let volume_multiplier = validate_multiplier("volume_multiplier", self.volume_multiplier)?;
        if let Some(lifetime) = self.lifetime {
            if !lifetime.is_finite() || lifetime <= 0.0 {
                return Err(ConfigError::NotPositive {
                    field: "lifetime",
                    value: lifetime,
                });
            }
        }

        Ok(Arc::new(LayerDefinition {
            name: self.name,
            elements: self.elements,
            parameter_modifiers: self.parameter_modifiers,
            density_multiplier,
            volume_multiplier,
            enabled: self.enabled,
            lifetime: self.lifetime,
        }))
    }
}

fn validate_multiplier(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFiniteValue { field, value });
    }
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    if value > MAX_LAYER_MULTIPLIER {
        debug!(field, value, "Clamping layer multiplier");
    }
    Ok(value.min(MAX_LAYER_MULTIPLIER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::element::{ElementDefinition, SoundSet};

    fn crickets() -> ElementRef {
        ElementDefinition::builder("crickets", SoundSet::new(["crickets.ogg"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_layer_cannot_be_built() {
        let result = LayerDefinition::builder("night").build();
        assert_eq!(result.unwrap_err(), ConfigError::EmptyLayer("night".into()));
    }

    #[test]
    fn test_multipliers_must_be_positive() {
        let result = LayerDefinition::builder("night")
            .element(crickets())
            .density_multiplier(0.0)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::NotPositive {
                field: "density_multiplier",
                ..
            })
        ));
    }

    #[test]
    fn test_multipliers_are_clamped() {
        let layer = LayerDefinition::builder("night")
            .element(crickets())
            .volume_multiplier(5.0)
            .build()
            .unwrap();
        assert_eq!(layer.volume_multiplier(), MAX_LAYER_MULTIPLIER);
        assert_eq!(layer.density_multiplier(), 1.0);
        assert!(layer.is_enabled());
    }

    #[test]
    fn test_lifetime_validation() {
        let result = LayerDefinition::builder("gust")
            .element(crickets())
            .lifetime(-1.0)
            .build();
        assert!(result.is_err());

        let layer = LayerDefinition::builder("gust")
            .element(crickets())
            .lifetime(30.0)
            .build()
            .unwrap();
        assert_eq!(layer.lifetime(), Some(30.0));
    }
}
