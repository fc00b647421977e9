//! Audio rendering seam
//!
//! The ambience core decides what plays where; an [`AudioBackend`] makes it
//! audible. Backends report finished playback by pushing the handle onto the
//! [`CompletionQueue`] they were given, from whichever thread they like.
//!
//! [`SimulatedBackend`] plays nothing and finishes every sound after a fixed
//! duration. It drives the headless demo and the tests.

use crate::audio::commands::CompletionQueue;
use crate::audio::element::SourceClass;
use crate::audio::pool::HandleId;
use crate::audio::resources::SoundRef;
use glam::Vec3;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Errors a backend may raise when asked to start playback
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0} is unknown to the backend")]
    UnknownHandle(HandleId),

    #[error("failed to start {path:?}: {reason}")]
    Playback { path: PathBuf, reason: String },
}

/// Everything needed to start one sound
#[derive(Debug, Clone, Copy)]
pub struct PlayRequest<'a> {
    pub handle: HandleId,
    pub source_class: &'a SourceClass,
    pub sound: &'a SoundRef,
    pub location: Vec3,
    pub volume: f32,
    pub pitch: f32,
}

/// Renders playback requests
pub trait AudioBackend: Send {
    /// A new pool handle of `source_class` now exists
    fn spawn_handle(&mut self, _handle: HandleId, _source_class: &SourceClass) {}

    /// Start playing on `request.handle`
    fn play(&mut self, request: PlayRequest<'_>) -> Result<(), BackendError>;

    /// Change the volume of a handle that is playing
    fn set_volume(&mut self, _handle: HandleId, _volume: f32) {}

    /// Advance backend time; called once at the start of every tick
    fn update(&mut self, _delta_time: f32) {}
}

/// A play request as seen by the [`SimulatedBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub handle: HandleId,
    pub source_class: SourceClass,
    pub sound: PathBuf,
    pub location: Vec3,
    pub volume: f32,
    pub pitch: f32,
}

#[derive(Debug, Default)]
struct LogInner {
    plays: Vec<PlayRecord>,
    volume_changes: Vec<(HandleId, f32)>,
}

/// Shared view of what a [`SimulatedBackend`] was asked to do
#[derive(Debug, Clone, Default)]
pub struct PlaybackLog {
    inner: Arc<Mutex<LogInner>>,
}

impl PlaybackLog {
    pub fn plays(&self) -> Vec<PlayRecord> {
        self.with(|log| log.plays.clone())
    }

    pub fn play_count(&self) -> usize {
        self.with(|log| log.plays.len())
    }

    pub fn volume_changes(&self) -> Vec<(HandleId, f32)> {
        self.with(|log| log.volume_changes.clone())
    }

    fn with<T>(&self, f: impl FnOnce(&mut LogInner) -> T) -> T {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut inner)
    }
}

/// Headless backend finishing every sound after a fixed duration
#[derive(Debug)]
pub struct SimulatedBackend {
    completions: CompletionQueue,
    default_duration: f32,
    durations: HashMap<PathBuf, f32>,
    playing: Vec<(HandleId, f32)>,
    log: PlaybackLog,
}

impl SimulatedBackend {
    pub fn new(completions: CompletionQueue, default_duration: f32) -> Self {
        Self {
            completions,
            default_duration: default_duration.max(0.0),
            durations: HashMap::new(),
            playing: Vec::new(),
            log: PlaybackLog::default(),
        }
    }

    /// Override the playback length of one resolved sound path
    pub fn with_duration(mut self, path: impl Into<PathBuf>, seconds: f32) -> Self {
        self.durations.insert(path.into(), seconds.max(0.0));
        self
    }

    /// Handle onto the record of plays and volume changes
    pub fn log(&self) -> PlaybackLog {
        self.log.clone()
    }

    pub fn playing_count(&self) -> usize {
        self.playing.len()
    }
}

impl AudioBackend for SimulatedBackend {
    fn spawn_handle(&mut self, handle: HandleId, source_class: &SourceClass) {
        trace!(%handle, class = %source_class, "Simulated voice created");
    }

    fn play(&mut self, request: PlayRequest<'_>) -> Result<(), BackendError> {
        if self.playing.iter().any(|(handle, _)| *handle == request.handle) {
            return Err(BackendError::Playback {
                path: request.sound.path.clone(),
                reason: format!("{} is already playing", request.handle),
            });
        }
        let duration = self
            .durations
            .get(&request.sound.path)
            .copied()
            .unwrap_or(self.default_duration);
        debug!(
            handle = %request.handle,
            sound = ?request.sound.path,
            duration,
            volume = request.volume,
            "Simulated playback started"
        );
        self.playing.push((request.handle, duration));
        self.log.with(|log| {
            log.plays.push(PlayRecord {
                handle: request.handle,
                source_class: request.source_class.clone(),
                sound: request.sound.path.clone(),
                location: request.location,
                volume: request.volume,
                pitch: request.pitch,
            })
        });
        Ok(())
    }

    fn set_volume(&mut self, handle: HandleId, volume: f32) {
        self.log.with(|log| log.volume_changes.push((handle, volume)));
    }

    fn update(&mut self, delta_time: f32) {
        let completions = &self.completions;
        self.playing.retain_mut(|(handle, remaining)| {
            *remaining -= delta_time;
            if *remaining <= 0.0 {
                completions.push(*handle);
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(path: &str) -> SoundRef {
        SoundRef {
            id: 0,
            path: PathBuf::from(path),
        }
    }

    fn request<'a>(handle: usize, class: &'a SourceClass, sound: &'a SoundRef) -> PlayRequest<'a> {
        PlayRequest {
            handle: HandleId(handle),
            source_class: class,
            sound,
            location: Vec3::ZERO,
            volume: 0.5,
            pitch: 1.0,
        }
    }

    #[test]
    fn test_simulated_playback_completes() {
        let queue = CompletionQueue::new();
        let mut backend = SimulatedBackend::new(queue.clone(), 2.0).with_duration("long.ogg", 5.0);
        let class = SourceClass::default();
        let short = sound("short.ogg");
        let long = sound("long.ogg");

        backend.play(request(0, &class, &short)).unwrap();
        backend.play(request(1, &class, &long)).unwrap();

        backend.update(1.0);
        assert!(queue.is_empty());
        backend.update(1.0);
        assert_eq!(queue.drain(), vec![HandleId(0)]);
        backend.update(3.0);
        assert_eq!(queue.drain(), vec![HandleId(1)]);
        assert_eq!(backend.playing_count(), 0);
        assert_eq!(backend.log().play_count(), 2);
    }

    #[test]
    fn test_double_play_is_rejected() {
        let mut backend = SimulatedBackend::new(CompletionQueue::new(), 1.0);
        let class = SourceClass::default();
        let sound = sound("a.ogg");
        backend.play(request(0, &class, &sound)).unwrap();
        assert!(backend.play(request(0, &class, &sound)).is_err());
    }
}
