//! Ambience update system
//!
//! [`AmbienceSystem`] owns the parameter registry, distributor, handle pool
//! and scheduler, and is the single entry point a host talks to: activate
//! layers, set parameters, call [`AmbienceSystem::tick`] once per frame.

use crate::audio::backend::AudioBackend;
use crate::audio::commands::CompletionQueue;
use crate::audio::debug::{draw_emitter_debug, EmitterDebugSettings};
use crate::audio::distribution::SpatialDistributor;
use crate::audio::layer::{LayerId, LayerRef};
use crate::audio::parameter::{ParameterChanged, ParameterRef, ParameterRegistry};
use crate::audio::pool::{HandleId, HandlePool};
use crate::audio::resources::SoundLibrary;
use crate::audio::scheduler::{ElementScheduler, FireEvent};
use crate::config::{AmbienceConfig, ConfigError};
use crate::core::ListenerSource;
use crate::dev::debug_overlay::{AmbienceStats, DebugLineData};
use crate::AmbienceRng;
use glam::Vec3;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use tracing::{debug, info, trace};

/// Borrowed view of the collaborators the scheduler needs while firing
pub struct TickContext<'a> {
    pub registry: &'a ParameterRegistry,
    pub distributor: &'a SpatialDistributor,
    pub pool: &'a mut HandlePool,
    pub backend: &'a mut dyn AudioBackend,
    pub sounds: &'a mut SoundLibrary,
    pub rng: &'a mut AmbienceRng,
    pub listener: Option<Vec3>,
}

/// A layer that is currently active
#[derive(Debug)]
struct ActiveLayer {
    definition: LayerRef,
    age: f32,
}

/// Owning context of the ambience engine
pub struct AmbienceSystem {
    config: AmbienceConfig,
    registry: ParameterRegistry,
    parameter_changes: Receiver<ParameterChanged>,
    distributor: SpatialDistributor,
    pool: HandlePool,
    scheduler: ElementScheduler,
    backend: Box<dyn AudioBackend>,
    completions: CompletionQueue,
    sounds: SoundLibrary,
    listener: Box<dyn ListenerSource>,
    layers: BTreeMap<LayerId, ActiveLayer>,
    next_layer: u64,
    rng: AmbienceRng,
    debug_settings: EmitterDebugSettings,
    elapsed: f64,
}

impl AmbienceSystem {
    /// Create a system rendering through `backend`.
    ///
    /// `completions` must be the queue the backend reports finished
    /// playback on.
    pub fn new(
        config: AmbienceConfig,
        listener: impl ListenerSource + 'static,
        backend: impl AudioBackend + 'static,
        completions: CompletionQueue,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => AmbienceRng::seed_from_u64(seed),
            None => AmbienceRng::from_entropy(),
        };
        let mut registry = ParameterRegistry::new();
        let parameter_changes = registry.subscribe();
        let debug_settings = EmitterDebugSettings {
            enabled: config.debug_draw,
            ..Default::default()
        };

        info!(
            seed = ?config.rng_seed,
            pool_warning_threshold = config.pool_warning_threshold,
            "Initializing ambience system"
        );
        Ok(Self {
            pool: HandlePool::new(config.pool_warning_threshold),
            config,
            registry,
            parameter_changes,
            distributor: SpatialDistributor::new(),
            scheduler: ElementScheduler::new(),
            backend: Box::new(backend),
            completions,
            sounds: SoundLibrary::default(),
            listener: Box::new(listener),
            layers: BTreeMap::new(),
            next_layer: 0,
            rng,
            debug_settings,
            elapsed: 0.0,
        })
    }

    /// Replace the sound library used to resolve sound-set paths
    pub fn with_sound_library(mut self, sounds: SoundLibrary) -> Self {
        self.sounds = sounds;
        self
    }

    /// Register a parameter so it can be driven by name
    pub fn register_parameter(&mut self, parameter: &ParameterRef) -> bool {
        self.registry.register_parameter(parameter)
    }

    /// Drive a parameter; returns its new normalized value
    pub fn set_parameter_value(&mut self, parameter: &ParameterRef, raw_value: f32) -> f32 {
        self.registry.set_value(parameter, raw_value)
    }

    /// Drive a registered parameter by name
    pub fn set_parameter_by_name(&mut self, name: &str, raw_value: f32) -> Option<f32> {
        self.registry.set_value_by_name(name, raw_value)
    }

    /// Activate a layer and schedule its elements.
    ///
    /// Disabled layers are ignored. Activating the same definition twice
    /// creates two independent layers.
    pub fn activate_layer(&mut self, layer: &LayerRef) -> Option<LayerId> {
        if !layer.is_enabled() {
            debug!(layer = layer.name(), "Skipping disabled layer");
            return None;
        }

        for modifier in layer
            .parameter_modifiers()
            .iter()
            .chain(layer.elements().iter().flat_map(|e| e.parameter_modifiers.iter()))
        {
            if let Some(parameter) = modifier.parameter() {
                self.registry.register_parameter(&parameter);
            }
        }

        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.scheduler.bind_layer(id, layer);
        let instances =
            self.scheduler
                .register_elements(layer.elements(), id, &self.registry, &mut self.rng);

        info!(%id, layer = layer.name(), elements = instances.len(), "Layer activated");
        self.layers.insert(
            id,
            ActiveLayer {
                definition: LayerRef::clone(layer),
                age: 0.0,
            },
        );
        Some(id)
    }

    /// Deactivate a layer. Elements still playing finish naturally and are
    /// then disposed.
    pub fn deactivate_layer(&mut self, id: LayerId) -> bool {
        let Some(layer) = self.layers.remove(&id) else {
            debug!(%id, "Cannot deactivate unknown layer");
            return false;
        };
        let instances = self.scheduler.unbind_layer(id);
        info!(
            %id,
            layer = layer.definition.name(),
            elements = instances.len(),
            "Layer deactivated"
        );
        true
    }

    /// Advance the ambience by one frame
    pub fn tick(&mut self, delta_time: f32) -> Vec<FireEvent> {
        let delta_time = if delta_time.is_finite() {
            delta_time.clamp(0.0, self.config.max_delta_time)
        } else {
            0.0
        };
        self.elapsed += f64::from(delta_time);

        // Completions reported since the last tick restart their countdowns
        // before this frame's time is applied
        for handle in self.completions.drain() {
            self.on_playback_finished(handle);
        }
        self.backend.update(delta_time);
        self.apply_parameter_changes();
        self.expire_layers(delta_time);

        let listener = self.listener.try_get_listener_location();
        let mut ctx = TickContext {
            registry: &self.registry,
            distributor: &self.distributor,
            pool: &mut self.pool,
            backend: self.backend.as_mut(),
            sounds: &mut self.sounds,
            rng: &mut self.rng,
            listener,
        };
        let events = self.scheduler.tick(delta_time, &mut ctx);
        if !events.is_empty() {
            trace!(fired = events.len(), elapsed = self.elapsed, "Tick fired elements");
        }
        events
    }

    /// Completion callback for backends that report on the tick thread
    pub fn on_playback_finished(&mut self, handle: HandleId) {
        let Some(finished) = self.pool.on_playback_finished(handle) else {
            return;
        };
        if let Some(element) = finished.element {
            self.scheduler.evaluate_finished_element(
                element,
                Some(finished.location),
                &self.registry,
                &mut self.rng,
            );
        }
    }

    /// Re-apply volume scaling to playing handles affected by parameter changes
    fn apply_parameter_changes(&mut self) {
        let changes: Vec<ParameterChanged> = self.parameter_changes.try_iter().collect();
        for change in changes {
            trace!(
                parameter = change.parameter.name(),
                normalized = change.normalized,
                "Applying parameter change"
            );
            let affected: Vec<(HandleId, f32)> = self
                .pool
                .active_handles()
                .filter_map(|handle| {
                    let element = handle.bound_element()?;
                    self.scheduler
                        .uses_parameter(element, &change.parameter)
                        .then(|| {
                            let scalar = self.scheduler.volume_scalar(element, &self.registry);
                            (handle.id(), handle.base_volume() * scalar)
                        })
                })
                .collect();

            for (handle, volume) in affected {
                self.pool.set_volume(handle, volume);
                self.backend.set_volume(handle, volume);
            }
        }
    }

    fn expire_layers(&mut self, delta_time: f32) {
        let mut expired = Vec::new();
        for (id, layer) in self.layers.iter_mut() {
            layer.age += delta_time;
            if let Some(lifetime) = layer.definition.lifetime() {
                if layer.age >= lifetime {
                    expired.push(*id);
                }
            }
        }
        for id in expired {
            debug!(%id, "Layer lifetime elapsed");
            self.deactivate_layer(id);
        }
    }

    /// Turn the emitter debug visualization on or off
    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug_settings.enabled = enabled;
    }

    pub fn debug_draw(&self) -> bool {
        self.debug_settings.enabled
    }

    pub fn debug_settings_mut(&mut self) -> &mut EmitterDebugSettings {
        &mut self.debug_settings
    }

    /// Wireframe markers for the active emitters; empty while debug drawing is off
    pub fn debug_lines(&self) -> Vec<DebugLineData> {
        let mut lines = Vec::new();
        draw_emitter_debug(
            self.listener.try_get_listener_location(),
            &self.pool,
            &self.debug_settings,
            &mut lines,
        );
        lines
    }

    /// Counters describing the current scheduler and pool state
    pub fn stats(&self) -> AmbienceStats {
        AmbienceStats {
            active_layers: self.layers.len(),
            element_instances: self.scheduler.instance_count(),
            scheduled: self.scheduler.scheduled_count(),
            pending_kill: self.scheduler.pending_kill_count(),
            active_handles: self.pool.active_count(),
            idle_handles: self.pool.idle_count(),
            total_handles: self.pool.len(),
            pool_warning_threshold: self.pool.warning_threshold(),
            parameters: self.registry.len(),
        }
    }

    pub fn is_layer_active(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    /// Ids of every active layer, oldest first
    pub fn active_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().copied()
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &ElementScheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &HandlePool {
        &self.pool
    }

    pub fn config(&self) -> &AmbienceConfig {
        &self.config
    }

    /// Simulated seconds since the system was created
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
