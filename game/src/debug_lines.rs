//! Emitter debug line collection for the demo
//!
//! Shows how a host pulls debug lines out of the ambience system each frame
//! and flattens them into a vertex buffer layout.

use ambience::audio::AmbienceSystem;
use ambience::dev::DebugLineData;

/// Floats per line vertex: position then RGBA color
pub const FLOATS_PER_VERTEX: usize = 7;

/// Per-frame debug line state
#[derive(Default)]
pub struct DebugState {
    debug_lines: Vec<DebugLineData>,
}

impl DebugState {
    /// Collect this frame's lines; empty while debug drawing is off
    pub fn update(&mut self, system: &AmbienceSystem) {
        self.debug_lines = system.debug_lines();
    }

    pub fn line_count(&self) -> usize {
        self.debug_lines.len()
    }

    /// Flatten lines to `[x, y, z, r, g, b, a]` per vertex, two vertices per line
    pub fn vertex_data(&self) -> Vec<f32> {
        let mut line_data = Vec::with_capacity(self.debug_lines.len() * 2 * FLOATS_PER_VERTEX);
        for line in &self.debug_lines {
            for point in [line.start, line.end] {
                line_data.extend_from_slice(&[
                    point.x,
                    point.y,
                    point.z,
                    line.color.x,
                    line.color.y,
                    line.color.z,
                    line.color.w,
                ]);
            }
        }
        line_data
    }
}
