//! Reusable playback handles, pooled per source class
//!
//! Handles are created on demand and never destroyed: once the peak number of
//! concurrent voices for a class has been reached, every later fire reuses an
//! idle handle. Growth past the configured threshold is logged so sustained
//! high fire rates stay visible.

use crate::audio::backend::AudioBackend;
use crate::audio::element::{ElementInstanceId, SourceClass};
use glam::Vec3;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace, warn};

/// Index of a handle inside its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) usize);

impl HandleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// One playback slot
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: HandleId,
    source_class: SourceClass,
    /// Element currently playing through this handle. The instance may be
    /// gone by the time playback finishes.
    bound_element: Option<ElementInstanceId>,
    location: Vec3,
    /// Volume sampled from the sound set, before layer and parameter scaling
    base_volume: f32,
    volume: f32,
    is_active: bool,
}

impl PlaybackHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn source_class(&self) -> &SourceClass {
        &self.source_class
    }

    pub fn bound_element(&self) -> Option<ElementInstanceId> {
        self.bound_element
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn base_volume(&self) -> f32 {
        self.base_volume
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// What a finished handle was doing, handed back to the scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishedPlayback {
    pub handle: HandleId,
    pub element: Option<ElementInstanceId>,
    pub location: Vec3,
}

/// Parameters for [`HandlePool::activate`]
#[derive(Debug, Clone, Copy)]
pub struct Activation {
    pub element: ElementInstanceId,
    pub location: Vec3,
    pub base_volume: f32,
    pub volume: f32,
}

/// Pool of playback handles with idle and active sets
#[derive(Debug)]
pub struct HandlePool {
    handles: Vec<PlaybackHandle>,
    idle: Vec<HandleId>,
    active: BTreeSet<HandleId>,
    warning_threshold: usize,
}

impl HandlePool {
    pub fn new(warning_threshold: usize) -> Self {
        Self {
            handles: Vec::new(),
            idle: Vec::new(),
            active: BTreeSet::new(),
            warning_threshold,
        }
    }

    /// Take an idle handle of `source_class`, creating one if none is free.
    ///
    /// The returned handle is checked out: it is neither idle nor active
    /// until [`HandlePool::activate`] or [`HandlePool::release`] is called.
    pub fn acquire(&mut self, source_class: &SourceClass, backend: &mut dyn AudioBackend) -> HandleId {
        if let Some(position) = self
            .idle
            .iter()
            .position(|id| self.handles[id.0].source_class == *source_class)
        {
            let id = self.idle.remove(position);
            trace!(handle = %id, class = %source_class, "Reusing idle handle");
            return id;
        }

        let id = HandleId(self.handles.len());
        self.handles.push(PlaybackHandle {
            id,
            source_class: source_class.clone(),
            bound_element: None,
            location: Vec3::ZERO,
            base_volume: 0.0,
            volume: 0.0,
            is_active: false,
        });
        backend.spawn_handle(id, source_class);

        if self.handles.len() > self.warning_threshold {
            warn!(
                handles = self.handles.len(),
                threshold = self.warning_threshold,
                class = %source_class,
                "Playback handle pool grew past warning threshold"
            );
        } else {
            debug!(handle = %id, class = %source_class, "Created playback handle");
        }
        id
    }

    /// Mark a checked-out handle active and bind it to an element
    pub fn activate(&mut self, id: HandleId, activation: Activation) -> bool {
        let Some(handle) = self.handles.get_mut(id.0) else {
            debug!(handle = %id, "Cannot activate unknown handle");
            return false;
        };
        debug_assert!(!handle.is_active, "{id} activated twice");
        debug_assert!(!self.idle.contains(&id), "{id} activated while idle");
        if handle.is_active {
            return false;
        }

        handle.is_active = true;
        handle.bound_element = Some(activation.element);
        handle.location = activation.location;
        handle.base_volume = activation.base_volume;
        handle.volume = activation.volume;
        self.active.insert(id);
        true
    }

    /// Return a checked-out or active handle to the idle set without
    /// reporting a completion
    pub fn release(&mut self, id: HandleId) {
        let Some(handle) = self.handles.get_mut(id.0) else {
            return;
        };
        handle.is_active = false;
        handle.bound_element = None;
        self.active.remove(&id);
        if !self.idle.contains(&id) {
            self.idle.push(id);
        }
    }

    /// Completion callback: unbind the element and idle the handle.
    ///
    /// Returns `None` for unknown or already idle handles.
    pub fn on_playback_finished(&mut self, id: HandleId) -> Option<FinishedPlayback> {
        if !self.active.remove(&id) {
            debug!(handle = %id, "Completion for a handle that is not active");
            return None;
        }
        let handle = &mut self.handles[id.0];
        handle.is_active = false;
        let element = handle.bound_element.take();
        let location = handle.location;
        self.idle.push(id);

        trace!(handle = %id, ?element, "Playback finished");
        Some(FinishedPlayback {
            handle: id,
            element,
            location,
        })
    }

    /// Update the effective volume of an active handle
    pub fn set_volume(&mut self, id: HandleId, volume: f32) {
        if let Some(handle) = self.handles.get_mut(id.0) {
            handle.volume = volume;
        }
    }

    pub fn get(&self, id: HandleId) -> Option<&PlaybackHandle> {
        self.handles.get(id.0)
    }

    pub fn active_handles(&self) -> impl Iterator<Item = &PlaybackHandle> {
        self.active.iter().map(|id| &self.handles[id.0])
    }

    /// Locations of every active emitter
    pub fn active_locations(&self) -> Vec<Vec3> {
        self.active_handles().map(|handle| handle.location).collect()
    }

    pub fn is_active(&self, id: HandleId) -> bool {
        self.active.contains(&id)
    }

    pub fn is_idle(&self, id: HandleId) -> bool {
        self.idle.contains(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Total handles ever created
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn warning_threshold(&self) -> usize {
        self.warning_threshold
    }
}

impl Default for HandlePool {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{BackendError, PlayRequest};

    #[derive(Default)]
    struct CountingBackend {
        spawned: Vec<(HandleId, SourceClass)>,
    }

    impl AudioBackend for CountingBackend {
        fn spawn_handle(&mut self, handle: HandleId, source_class: &SourceClass) {
            self.spawned.push((handle, source_class.clone()));
        }

        fn play(&mut self, _request: PlayRequest<'_>) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn activation(element: u64, location: Vec3) -> Activation {
        Activation {
            element: ElementInstanceId(element),
            location,
            base_volume: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn test_acquire_creates_then_reuses() {
        let mut pool = HandlePool::default();
        let mut backend = CountingBackend::default();
        let class = SourceClass::new("bird");

        let first = pool.acquire(&class, &mut backend);
        assert!(pool.activate(first, activation(1, Vec3::X)));
        assert_eq!(pool.active_count(), 1);

        let finished = pool.on_playback_finished(first).unwrap();
        assert_eq!(finished.element, Some(ElementInstanceId(1)));
        assert_eq!(finished.location, Vec3::X);
        assert!(pool.is_idle(first));

        let second = pool.acquire(&class, &mut backend);
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
        assert_eq!(backend.spawned.len(), 1);
    }

    #[test]
    fn test_acquire_respects_class() {
        let mut pool = HandlePool::default();
        let mut backend = CountingBackend::default();
        let bird = SourceClass::new("bird");
        let wind = SourceClass::new("wind");

        let bird_handle = pool.acquire(&bird, &mut backend);
        pool.release(bird_handle);
        assert_eq!(pool.idle_count(), 1);

        let wind_handle = pool.acquire(&wind, &mut backend);
        assert_ne!(wind_handle, bird_handle);
        assert_eq!(pool.get(wind_handle).unwrap().source_class(), &wind);
        assert!(pool.is_idle(bird_handle));
    }

    #[test]
    fn test_concurrent_acquires_are_distinct() {
        let mut pool = HandlePool::default();
        let mut backend = CountingBackend::default();
        let class = SourceClass::new("bird");

        let a = pool.acquire(&class, &mut backend);
        let b = pool.acquire(&class, &mut backend);
        assert_ne!(a, b);
        pool.activate(a, activation(1, Vec3::ZERO));
        pool.activate(b, activation(2, Vec3::ONE));
        assert_eq!(pool.active_locations(), vec![Vec3::ZERO, Vec3::ONE]);
    }

    #[test]
    fn test_finish_is_reported_once() {
        let mut pool = HandlePool::default();
        let mut backend = CountingBackend::default();
        let handle = pool.acquire(&SourceClass::default(), &mut backend);
        pool.activate(handle, activation(3, Vec3::ZERO));

        assert!(pool.on_playback_finished(handle).is_some());
        assert!(pool.on_playback_finished(handle).is_none());
        assert!(pool.on_playback_finished(HandleId(99)).is_none());
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.get(handle).unwrap().bound_element().is_none());
    }

    #[test]
    fn test_pool_keeps_growing_past_threshold() {
        let mut pool = HandlePool::new(2);
        let mut backend = CountingBackend::default();
        let class = SourceClass::default();
        let handles: Vec<_> = (0..5).map(|_| pool.acquire(&class, &mut backend)).collect();
        assert_eq!(pool.len(), 5);
        assert_eq!(handles.iter().collect::<BTreeSet<_>>().len(), 5);
    }
}
