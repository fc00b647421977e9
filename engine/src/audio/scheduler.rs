//! Element scheduling: countdowns, firing and re-arming
//!
//! Every registered element instance moves through
//! `Unscheduled -> Scheduled -> Firing -> (Scheduled | Unscheduled)`.
//!
//! A scheduled instance keeps two clocks. `reference_time` is the countdown
//! sampled from the element's interval, before any density scaling.
//! `remaining_time` is that countdown scaled by the current density. Each
//! tick recomputes `remaining_time` from the live parameter values and then
//! shrinks `reference_time` by the same proportion that `delta_time` takes
//! out of `remaining_time`. A parameter change therefore changes how fast the
//! countdown runs without moving how far through it the instance already is.

use crate::audio::backend::PlayRequest;
use crate::audio::distribution::DistributionRequest;
use crate::audio::element::{ElementInstanceId, ElementRef, IntervalMode};
use crate::audio::layer::{LayerDefinition, LayerId};
use crate::audio::parameter::{fold_density, fold_volume, ParameterModifier, ParameterRef, ParameterRegistry};
use crate::audio::pool::{Activation, HandleId};
use crate::audio::system::TickContext;
use crate::core::FloatRange;
use crate::AmbienceRng;
use glam::Vec3;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace, warn};

/// Runtime state of one element within one active layer
#[derive(Debug, Clone)]
pub struct ElementInstance {
    id: ElementInstanceId,
    definition: ElementRef,
    layer: LayerId,
    /// Unscaled countdown left, in seconds
    pub reference_time: f32,
    /// Density-scaled countdown left, in seconds
    pub remaining_time: f32,
    pub is_playing: bool,
    /// The owning layer is gone; dispose once playback ends
    pub is_pending_kill: bool,
    pub last_play_location: Option<Vec3>,
    active_handles: u32,
}

impl ElementInstance {
    pub fn id(&self) -> ElementInstanceId {
        self.id
    }

    pub fn definition(&self) -> &ElementRef {
        &self.definition
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Handles currently playing for this instance
    pub fn active_handles(&self) -> u32 {
        self.active_handles
    }
}

/// Layer-wide scaling inputs, captured when the layer is bound
#[derive(Debug, Clone)]
struct LayerBinding {
    name: String,
    modifiers: Vec<ParameterModifier>,
    density_multiplier: f32,
    volume_multiplier: f32,
}

/// One element firing during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct FireEvent {
    pub element: ElementInstanceId,
    pub element_name: String,
    pub layer: LayerId,
    pub handle: HandleId,
    pub location: Vec3,
    pub volume: f32,
}

/// Owns every element instance and the set of running countdowns
#[derive(Debug, Default)]
pub struct ElementScheduler {
    instances: HashMap<ElementInstanceId, ElementInstance>,
    scheduled: BTreeSet<ElementInstanceId>,
    layers: HashMap<LayerId, LayerBinding>,
    next_instance: u64,
}

impl ElementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the scaling inputs of a layer about to register elements
    pub fn bind_layer(&mut self, id: LayerId, layer: &LayerDefinition) {
        self.layers.insert(
            id,
            LayerBinding {
                name: layer.name().to_string(),
                modifiers: layer.parameter_modifiers().to_vec(),
                density_multiplier: layer.density_multiplier(),
                volume_multiplier: layer.volume_multiplier(),
            },
        );
    }

    /// Create and schedule one instance per definition.
    ///
    /// Fresh instances may fire anywhere in `[0, interval.max]` so a newly
    /// activated layer does not start with a silent gap.
    pub fn register_elements(
        &mut self,
        definitions: &[ElementRef],
        layer: LayerId,
        registry: &ParameterRegistry,
        rng: &mut AmbienceRng,
    ) -> Vec<ElementInstanceId> {
        if !self.layers.contains_key(&layer) {
            debug!(%layer, "Cannot register elements for an unbound layer");
            return Vec::new();
        }

        let mut registered = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let id = ElementInstanceId(self.next_instance);
            self.next_instance += 1;
            self.instances.insert(
                id,
                ElementInstance {
                    id,
                    definition: ElementRef::clone(definition),
                    layer,
                    reference_time: 0.0,
                    remaining_time: 0.0,
                    is_playing: false,
                    is_pending_kill: false,
                    last_play_location: None,
                    active_handles: 0,
                },
            );
            self.schedule(id, true, registry, rng);
            registered.push(id);
        }

        debug!(%layer, count = registered.len(), "Registered elements");
        registered
    }

    /// Sample a new countdown and put the instance in the scheduled set.
    ///
    /// Scheduling an instance that is already scheduled resamples its
    /// countdown; set membership does not change.
    pub fn schedule(
        &mut self,
        id: ElementInstanceId,
        ignore_minimum: bool,
        registry: &ParameterRegistry,
        rng: &mut AmbienceRng,
    ) -> bool {
        let Some(scale) = self.countdown_scale(id, registry) else {
            debug!(element = %id, "Cannot schedule element without a live instance and layer");
            return false;
        };
        let Some(instance) = self.instances.get_mut(&id) else {
            return false;
        };
        if instance.is_pending_kill {
            trace!(element = %id, "Not scheduling pending-kill element");
            return false;
        }

        let interval = instance.definition.interval_range;
        let lower = if ignore_minimum { 0.0 } else { interval.min };
        instance.reference_time = FloatRange::new(lower, interval.max).sample(rng);
        instance.remaining_time = instance.reference_time * scale;
        trace!(
            element = %id,
            reference_time = instance.reference_time,
            remaining_time = instance.remaining_time,
            "Scheduled element"
        );
        self.scheduled.insert(id);
        true
    }

    /// Advance every countdown and fire the instances that reach zero
    pub fn tick(&mut self, delta_time: f32, ctx: &mut TickContext<'_>) -> Vec<FireEvent> {
        let mut events = Vec::new();
        let due: Vec<ElementInstanceId> = self.scheduled.iter().copied().collect();

        for id in due {
            let Some(scale) = self.countdown_scale(id, ctx.registry) else {
                debug!(element = %id, "Dropping scheduled element without instance or layer");
                self.scheduled.remove(&id);
                continue;
            };
            let Some(instance) = self.instances.get_mut(&id) else {
                continue;
            };

            let remaining = instance.reference_time * scale;
            let next = remaining - delta_time;
            if next > 0.0 {
                // remaining > next > 0, so the ratio is well defined
                instance.reference_time *= next / remaining;
                instance.remaining_time = next;
                continue;
            }

            instance.reference_time = 0.0;
            instance.remaining_time = 0.0;
            match ctx.listener {
                Some(listener) => {
                    if let Some(event) = self.fire(id, listener, ctx) {
                        events.push(event);
                    }
                }
                None => trace!(element = %id, "Element due but no listener, holding"),
            }
        }

        events
    }

    /// Place, start and re-arm a due instance
    fn fire(&mut self, id: ElementInstanceId, listener: Vec3, ctx: &mut TickContext<'_>) -> Option<FireEvent> {
        let (definition, layer, last_play_location) = {
            let instance = self.instances.get(&id)?;
            (
                ElementRef::clone(&instance.definition),
                instance.layer,
                instance.last_play_location,
            )
        };
        let volume_scalar = self.volume_scalar(id, ctx.registry);

        let Some(sound) = definition
            .sound_set
            .pick(ctx.rng)
            .and_then(|path| ctx.sounds.get_or_resolve(path))
        else {
            debug!(element = %id, name = definition.name(), "No playable sound, skipping fire");
            self.schedule(id, false, ctx.registry, ctx.rng);
            return None;
        };

        let active_emitters = ctx.pool.active_locations();
        let request = DistributionRequest {
            config: &definition.distribution,
            listener,
            last_play_location,
            active_emitters: &active_emitters,
        };
        let location = ctx
            .distributor
            .distribute_with(definition.distributor(), &request, ctx.rng);

        let base_volume = definition.sound_set.volume.sample(ctx.rng);
        let volume = base_volume * volume_scalar;
        let pitch = definition.sound_set.pitch.sample(ctx.rng);

        let handle = ctx.pool.acquire(&definition.source_class, ctx.backend);
        ctx.pool.activate(
            handle,
            Activation {
                element: id,
                location,
                base_volume,
                volume,
            },
        );
        let started = ctx.backend.play(PlayRequest {
            handle,
            source_class: &definition.source_class,
            sound: &sound,
            location,
            volume,
            pitch,
        });
        if let Err(e) = started {
            warn!(element = %id, %handle, error = %e, "Backend refused playback");
            ctx.pool.release(handle);
            self.schedule(id, false, ctx.registry, ctx.rng);
            return None;
        }

        if let Some(instance) = self.instances.get_mut(&id) {
            debug_assert!(
                instance.definition.interval_mode != IntervalMode::OnFinished || instance.active_handles == 0,
                "{id} fired while its previous playback is still running"
            );
            instance.active_handles += 1;
            instance.is_playing = true;
        }

        match definition.interval_mode {
            IntervalMode::OnFinished => {
                self.scheduled.remove(&id);
            }
            IntervalMode::OnSpawn => {
                self.schedule(id, false, ctx.registry, ctx.rng);
            }
        }

        debug!(
            element = %id,
            name = definition.name(),
            %handle,
            x = location.x,
            y = location.y,
            z = location.z,
            volume,
            "Element fired"
        );
        Some(FireEvent {
            element: id,
            element_name: definition.name().to_string(),
            layer,
            handle,
            location,
            volume,
        })
    }

    /// Decide what happens to an instance whose playback just completed
    pub fn evaluate_finished_element(
        &mut self,
        id: ElementInstanceId,
        play_location: Option<Vec3>,
        registry: &ParameterRegistry,
        rng: &mut AmbienceRng,
    ) {
        let Some(instance) = self.instances.get_mut(&id) else {
            debug!(element = %id, "Finished element no longer exists");
            return;
        };

        instance.active_handles = instance.active_handles.saturating_sub(1);
        instance.is_playing = instance.active_handles > 0;
        if play_location.is_some() {
            instance.last_play_location = play_location;
        }

        if instance.is_pending_kill {
            if !instance.is_playing {
                self.instances.remove(&id);
                debug!(element = %id, "Disposed pending-kill element");
            }
            return;
        }

        match instance.definition.interval_mode {
            IntervalMode::OnFinished => {
                if !self.scheduled.contains(&id) {
                    self.schedule(id, false, registry, rng);
                }
            }
            // Already re-armed when it fired
            IntervalMode::OnSpawn => {}
        }
    }

    /// Stop scheduling `ids`. Instances still playing are disposed once
    /// their playback completes.
    pub fn unregister_elements(&mut self, ids: &[ElementInstanceId]) {
        for id in ids {
            self.scheduled.remove(id);
            let Some(instance) = self.instances.get_mut(id) else {
                continue;
            };
            if instance.is_playing {
                instance.is_pending_kill = true;
                trace!(element = %id, "Element marked pending kill");
            } else {
                self.instances.remove(id);
                trace!(element = %id, "Element disposed");
            }
        }
    }

    /// Unregister every instance of `layer` and forget its binding
    pub fn unbind_layer(&mut self, layer: LayerId) -> Vec<ElementInstanceId> {
        let ids: Vec<ElementInstanceId> = self
            .instances
            .values()
            .filter(|instance| instance.layer == layer && !instance.is_pending_kill)
            .map(|instance| instance.id)
            .collect();
        self.unregister_elements(&ids);
        if let Some(binding) = self.layers.remove(&layer) {
            debug!(%layer, name = %binding.name, elements = ids.len(), "Unbound layer");
        }
        ids
    }

    /// Density scalar of an instance: layer modifiers, then element
    /// modifiers, folded with last-wins semantics
    pub fn density_scalar(&self, id: ElementInstanceId, registry: &ParameterRegistry) -> Option<f32> {
        let instance = self.instances.get(&id)?;
        let binding = self.layers.get(&instance.layer)?;
        Some(fold_density(
            binding
                .modifiers
                .iter()
                .chain(instance.definition.parameter_modifiers.iter()),
            registry,
        ))
    }

    /// Factor turning an unscaled countdown into seconds left
    fn countdown_scale(&self, id: ElementInstanceId, registry: &ParameterRegistry) -> Option<f32> {
        let density = self.density_scalar(id, registry)?;
        let instance = self.instances.get(&id)?;
        let binding = self.layers.get(&instance.layer)?;
        Some((density / binding.density_multiplier).max(0.0))
    }

    /// Layer volume multiplier times the folded volume modifiers.
    ///
    /// Instances whose layer is gone keep the modifier fold of the element
    /// alone.
    pub fn volume_scalar(&self, id: ElementInstanceId, registry: &ParameterRegistry) -> f32 {
        let Some(instance) = self.instances.get(&id) else {
            return 1.0;
        };
        let element_modifiers = instance.definition.parameter_modifiers.iter();
        match self.layers.get(&instance.layer) {
            Some(binding) => {
                binding.volume_multiplier
                    * fold_volume(binding.modifiers.iter().chain(element_modifiers), registry)
            }
            None => fold_volume(element_modifiers, registry),
        }
    }

    /// Whether the instance's layer or element reads `parameter`
    pub fn uses_parameter(&self, id: ElementInstanceId, parameter: &ParameterRef) -> bool {
        let Some(instance) = self.instances.get(&id) else {
            return false;
        };
        let layer_uses = self
            .layers
            .get(&instance.layer)
            .is_some_and(|binding| binding.modifiers.iter().any(|m| m.references(parameter)));
        layer_uses
            || instance
                .definition
                .parameter_modifiers
                .iter()
                .any(|m| m.references(parameter))
    }

    pub fn instance(&self, id: ElementInstanceId) -> Option<&ElementInstance> {
        self.instances.get(&id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &ElementInstance> {
        self.instances.values()
    }

    pub fn is_scheduled(&self, id: ElementInstanceId) -> bool {
        self.scheduled.contains(&id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instances waiting on in-flight playback before they can be disposed
    pub fn pending_kill_count(&self) -> usize {
        self.instances.values().filter(|i| i.is_pending_kill).count()
    }

    pub fn is_layer_bound(&self, layer: LayerId) -> bool {
        self.layers.contains_key(&layer)
    }
}
