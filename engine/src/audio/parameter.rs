//! Named scalar parameters that reshape ambience density and volume
//!
//! Parameters are registered once and looked up by identity. Gameplay code
//! drives them through [`ParameterRegistry::set_value`]; layers and elements
//! read them back through [`ParameterModifier`]s.

use crate::config::ConfigError;
use crate::core::FloatRange;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Immutable description of a parameter
#[derive(Debug)]
pub struct ParameterDefinition {
    name: String,
    value_range: FloatRange,
    default_value: f32,
}

/// Shared handle to a parameter definition; identity is the allocation
pub type ParameterRef = Arc<ParameterDefinition>;

impl ParameterDefinition {
    /// Create a parameter mapping raw values in `value_range` onto `[0, 1]`
    pub fn new(
        name: impl Into<String>,
        value_range: FloatRange,
        default_value: f32,
    ) -> Result<ParameterRef, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::UnnamedParameter);
        }
        if !default_value.is_finite() {
            return Err(ConfigError::NonFiniteValue {
                field: "default_value",
                value: default_value,
            });
        }
        let value_range = value_range.sanitized("value_range")?;
        Ok(Arc::new(Self {
            name,
            value_range,
            default_value,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_range(&self) -> FloatRange {
        self.value_range
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Clamped linear remap of a raw value onto `[0, 1]`
    pub fn normalize(&self, raw_value: f32) -> f32 {
        self.value_range.normalize(raw_value)
    }

    /// The normalized value a parameter holds before anyone sets it
    pub fn default_normalized(&self) -> f32 {
        self.normalize(self.default_value)
    }
}

/// Notification raised whenever a parameter value is set
#[derive(Debug, Clone)]
pub struct ParameterChanged {
    pub parameter: ParameterRef,
    pub normalized: f32,
}

#[derive(Debug)]
struct RegisteredParameter {
    definition: ParameterRef,
    normalized: f32,
}

/// Single source of truth for parameter values
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    parameters: Vec<RegisteredParameter>,
    subscribers: Vec<Sender<ParameterChanged>>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter. Returns `false` if it was already registered.
    pub fn register_parameter(&mut self, parameter: &ParameterRef) -> bool {
        if self.index_of(parameter).is_some() {
            trace!(parameter = parameter.name(), "Parameter already registered");
            return false;
        }
        debug!(
            parameter = parameter.name(),
            default = parameter.default_value(),
            "Registered parameter"
        );
        self.parameters.push(RegisteredParameter {
            definition: Arc::clone(parameter),
            normalized: parameter.default_normalized(),
        });
        true
    }

    /// Map `raw_value` into the parameter's normalized range, store it and
    /// notify subscribers. Returns the stored normalized value.
    ///
    /// A parameter that has not been registered yet is registered first.
    pub fn set_value(&mut self, parameter: &ParameterRef, raw_value: f32) -> f32 {
        if !raw_value.is_finite() {
            debug!(
                parameter = parameter.name(),
                raw_value, "Ignoring non-finite parameter value"
            );
            return self.get_value(Some(parameter.as_ref()));
        }

        let index = match self.index_of(parameter) {
            Some(index) => index,
            None => {
                self.register_parameter(parameter);
                self.parameters.len() - 1
            }
        };

        let normalized = parameter.normalize(raw_value);
        self.parameters[index].normalized = normalized;
        trace!(
            parameter = parameter.name(),
            raw_value,
            normalized,
            "Parameter value set"
        );

        self.notify(ParameterChanged {
            parameter: Arc::clone(parameter),
            normalized,
        });
        normalized
    }

    /// Current normalized value of `parameter`, or `1.0` when there is none
    pub fn get_value(&self, parameter: Option<&ParameterDefinition>) -> f32 {
        let Some(parameter) = parameter else {
            return 1.0;
        };
        self.parameters
            .iter()
            .find(|entry| std::ptr::eq(Arc::as_ptr(&entry.definition), parameter))
            .map(|entry| entry.normalized)
            .unwrap_or_else(|| parameter.default_normalized())
    }

    /// Look up a registered parameter by name
    pub fn find(&self, name: &str) -> Option<&ParameterRef> {
        self.parameters
            .iter()
            .map(|entry| &entry.definition)
            .find(|definition| definition.name() == name)
    }

    /// Set a registered parameter by name. Unknown names are ignored.
    pub fn set_value_by_name(&mut self, name: &str, raw_value: f32) -> Option<f32> {
        match self.find(name).cloned() {
            Some(parameter) => Some(self.set_value(&parameter, raw_value)),
            None => {
                debug!(parameter = name, "Ignoring value for unknown parameter");
                None
            }
        }
    }

    /// Receive a [`ParameterChanged`] for every subsequent `set_value`
    pub fn subscribe(&mut self) -> Receiver<ParameterChanged> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Iterate registered parameters with their normalized values
    pub fn iter(&self) -> impl Iterator<Item = (&ParameterRef, f32)> {
        self.parameters
            .iter()
            .map(|entry| (&entry.definition, entry.normalized))
    }

    fn index_of(&self, parameter: &ParameterRef) -> Option<usize> {
        self.parameters
            .iter()
            .position(|entry| Arc::ptr_eq(&entry.definition, parameter))
    }

    fn notify(&mut self, change: ParameterChanged) {
        // Dropped receivers unsubscribe themselves
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}

/// Maps a parameter's normalized value onto density and volume scalars
#[derive(Debug, Clone)]
pub struct ParameterModifier {
    parameter: Weak<ParameterDefinition>,
    pub density_scale_range: FloatRange,
    pub volume_scale_range: FloatRange,
}

impl ParameterModifier {
    pub fn new(
        parameter: &ParameterRef,
        density_scale_range: FloatRange,
        volume_scale_range: FloatRange,
    ) -> Self {
        Self {
            parameter: Arc::downgrade(parameter),
            density_scale_range,
            volume_scale_range,
        }
    }

    /// The referenced parameter, if it is still alive
    pub fn parameter(&self) -> Option<ParameterRef> {
        self.parameter.upgrade()
    }

    /// Whether this modifier reads `parameter`
    pub fn references(&self, parameter: &ParameterRef) -> bool {
        std::ptr::eq(self.parameter.as_ptr(), Arc::as_ptr(parameter))
    }

    pub fn density_scalar(&self, registry: &ParameterRegistry) -> f32 {
        let parameter = self.parameter();
        self.density_scale_range
            .lerp(registry.get_value(parameter.as_deref()))
    }

    pub fn volume_scalar(&self, registry: &ParameterRegistry) -> f32 {
        let parameter = self.parameter();
        self.volume_scale_range
            .lerp(registry.get_value(parameter.as_deref()))
    }
}

/// Fold modifiers into a density scalar.
///
/// Each modifier overwrites the running value, so only the last one listed
/// takes effect. With no modifiers the scalar is `1.0`.
pub fn fold_density<'a>(
    modifiers: impl IntoIterator<Item = &'a ParameterModifier>,
    registry: &ParameterRegistry,
) -> f32 {
    let mut scalar = 1.0;
    let mut folded = 0usize;
    for modifier in modifiers {
        scalar = modifier.density_scalar(registry);
        folded += 1;
    }
    if folded > 1 {
        debug!(
            modifiers = folded,
            scalar, "Multiple density modifiers present, last one wins"
        );
    }
    scalar
}

/// Fold modifiers into a volume scalar with the same last-wins rule
pub fn fold_volume<'a>(
    modifiers: impl IntoIterator<Item = &'a ParameterModifier>,
    registry: &ParameterRegistry,
) -> f32 {
    modifiers
        .into_iter()
        .fold(1.0, |_, modifier| modifier.volume_scalar(registry))
}
