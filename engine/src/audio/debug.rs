//! Emitter debug visualization
//!
//! Converts the listener and the active playback handles into wireframe
//! lines a host can draw on top of its scene.

use crate::audio::pool::HandlePool;
use crate::dev::debug_overlay::DebugLineData;
use glam::{Vec3, Vec4};
use std::f32::consts::TAU;
use tracing::trace;

/// Settings for emitter debug visualization
#[derive(Debug, Clone)]
pub struct EmitterDebugSettings {
    pub enabled: bool,
    /// Draw a line from the listener to every playing emitter
    pub show_directions: bool,
    pub emitter_radius: f32,
    pub emitter_color: Vec4,
    pub listener_color: Vec4,
    pub direction_color: Vec4,
}

impl Default for EmitterDebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            show_directions: true,
            emitter_radius: 0.5,
            emitter_color: Vec4::new(0.0, 1.0, 0.0, 1.0),   // Green
            listener_color: Vec4::new(0.3, 0.6, 1.0, 1.0),  // Light blue
            direction_color: Vec4::new(1.0, 1.0, 0.0, 0.5), // Yellow
        }
    }
}

/// Append debug lines for the listener and every active emitter
pub fn draw_emitter_debug(
    listener: Option<Vec3>,
    pool: &HandlePool,
    settings: &EmitterDebugSettings,
    debug_lines: &mut Vec<DebugLineData>,
) {
    if !settings.enabled {
        return;
    }
    trace!(emitters = pool.active_count(), "Drawing emitter debug visualization");

    for handle in pool.active_handles() {
        draw_sphere(
            debug_lines,
            handle.location(),
            settings.emitter_radius,
            settings.emitter_color,
            8,
        );
        if let (true, Some(listener)) = (settings.show_directions, listener) {
            debug_lines.push(DebugLineData {
                start: listener,
                end: handle.location(),
                color: settings.direction_color,
            });
        }
    }

    if let Some(listener) = listener {
        draw_listener_cross(debug_lines, listener, settings.listener_color);
    }
}

/// Three axis-aligned circles approximating a sphere
fn draw_sphere(debug_lines: &mut Vec<DebugLineData>, center: Vec3, radius: f32, color: Vec4, segments: usize) {
    let point = |axis: usize, angle: f32| {
        let (sin, cos) = angle.sin_cos();
        match axis {
            0 => Vec3::new(0.0, sin * radius, cos * radius),
            1 => Vec3::new(sin * radius, 0.0, cos * radius),
            _ => Vec3::new(sin * radius, cos * radius, 0.0),
        }
    };

    for axis in 0..3 {
        for i in 0..segments {
            let a = i as f32 * TAU / segments as f32;
            let b = ((i + 1) % segments) as f32 * TAU / segments as f32;
            debug_lines.push(DebugLineData {
                start: center + point(axis, a),
                end: center + point(axis, b),
                color,
            });
        }
    }
}

fn draw_listener_cross(debug_lines: &mut Vec<DebugLineData>, position: Vec3, color: Vec4) {
    const ARM: f32 = 1.0;
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        debug_lines.push(DebugLineData {
            start: position - axis * ARM,
            end: position + axis * ARM,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{AudioBackend, BackendError, PlayRequest};
    use crate::audio::element::{ElementInstanceId, SourceClass};
    use crate::audio::pool::Activation;

    struct NullBackend;

    impl AudioBackend for NullBackend {
        fn play(&mut self, _request: PlayRequest<'_>) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn pool_with_emitter(location: Vec3) -> HandlePool {
        let mut pool = HandlePool::default();
        let handle = pool.acquire(&SourceClass::default(), &mut NullBackend);
        pool.activate(
            handle,
            Activation {
                element: ElementInstanceId(0),
                location,
                base_volume: 1.0,
                volume: 1.0,
            },
        );
        pool
    }

    #[test]
    fn test_disabled_draws_nothing() {
        let pool = pool_with_emitter(Vec3::X);
        let mut lines = Vec::new();
        draw_emitter_debug(Some(Vec3::ZERO), &pool, &EmitterDebugSettings::default(), &mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_emitter_sphere_and_direction() {
        let pool = pool_with_emitter(Vec3::new(10.0, 0.0, 0.0));
        let settings = EmitterDebugSettings {
            enabled: true,
            ..Default::default()
        };
        let mut lines = Vec::new();
        draw_emitter_debug(Some(Vec3::ZERO), &pool, &settings, &mut lines);

        // 3 circles of 8 segments, one direction line, three listener arms
        assert_eq!(lines.len(), 24 + 1 + 3);
        assert!(lines
            .iter()
            .any(|l| l.start == Vec3::ZERO && l.end == Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_no_listener_skips_listener_lines() {
        let pool = pool_with_emitter(Vec3::Y);
        let settings = EmitterDebugSettings {
            enabled: true,
            ..Default::default()
        };
        let mut lines = Vec::new();
        draw_emitter_debug(None, &pool, &settings, &mut lines);
        assert_eq!(lines.len(), 24);
    }
}
