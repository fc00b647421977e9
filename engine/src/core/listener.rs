//! Listener location access
//!
//! The ambience system never owns the listener. The host hands it something
//! implementing [`ListenerSource`] and the system asks for the current
//! location once per tick.

use glam::Vec3;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Supplies the listener location, if one is currently known
pub trait ListenerSource: Send {
    fn try_get_listener_location(&self) -> Option<Vec3>;
}

impl<F> ListenerSource for F
where
    F: Fn() -> Option<Vec3> + Send,
{
    fn try_get_listener_location(&self) -> Option<Vec3> {
        self()
    }
}

/// Thread-safe listener cell the host writes into and the system reads from
#[derive(Debug, Clone, Default)]
pub struct SharedListener {
    location: Arc<RwLock<Option<Vec3>>>,
}

impl SharedListener {
    /// Create a listener cell with no known location
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a listener cell at a known location
    pub fn at(location: Vec3) -> Self {
        let listener = Self::new();
        listener.set(Some(location));
        listener
    }

    /// Update the listener location; `None` means the listener is gone
    pub fn set(&self, location: Option<Vec3>) {
        match self.location.write() {
            Ok(mut guard) => *guard = location,
            Err(_) => warn!("Listener lock poisoned, location update dropped"),
        }
    }

    /// Read the last written location
    pub fn get(&self) -> Option<Vec3> {
        self.location.read().ok().and_then(|guard| *guard)
    }
}

impl ListenerSource for SharedListener {
    fn try_get_listener_location(&self) -> Option<Vec3> {
        self.get()
    }
}

/// Distance between two points projected onto the horizontal (X/Y) plane
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    (a - b).truncate().length()
}
