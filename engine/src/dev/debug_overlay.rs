//! Debug overlay for ambience statistics

use glam::{Vec3, Vec4};
use tracing::info;

/// A single colored line segment in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLineData {
    pub start: Vec3,
    pub end: Vec3,
    pub color: Vec4,
}

/// Snapshot of scheduler and pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmbienceStats {
    pub active_layers: usize,
    /// Live element instances, including pending-kill ones
    pub element_instances: usize,
    pub scheduled: usize,
    pub pending_kill: usize,
    pub active_handles: usize,
    pub idle_handles: usize,
    /// Handles ever created
    pub total_handles: usize,
    pub pool_warning_threshold: usize,
    pub parameters: usize,
}

impl AmbienceStats {
    /// One-line summary of the counters
    pub fn summary(&self) -> String {
        format!(
            "Layers: {}, Elements: {} ({} scheduled, {} pending kill), Handles: {}/{} active, Parameters: {}",
            self.active_layers,
            self.element_instances,
            self.scheduled,
            self.pending_kill,
            self.active_handles,
            self.total_handles,
            self.parameters
        )
    }

    /// Log the counters at info level
    pub fn print(&self) {
        info!(
            active_layers = self.active_layers,
            element_instances = self.element_instances,
            scheduled = self.scheduled,
            pending_kill = self.pending_kill,
            active_handles = self.active_handles,
            idle_handles = self.idle_handles,
            total_handles = self.total_handles,
            parameters = self.parameters,
            "Ambience Debug Statistics"
        );
    }

    /// Check for suspicious states and return warnings
    pub fn check_health(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.total_handles > self.pool_warning_threshold {
            warnings.push(format!(
                "{} playback handles exceed the warning threshold of {}",
                self.total_handles, self.pool_warning_threshold
            ));
        }

        if self.active_layers > 0 && self.element_instances == 0 {
            warnings.push("Active layers have no element instances".to_string());
        }

        // Every live instance is either counting down, playing or pending kill
        let idle_instances = self
            .element_instances
            .saturating_sub(self.scheduled + self.pending_kill + self.active_handles);
        if self.active_layers > 0 && idle_instances > 0 && self.active_handles == 0 {
            warnings.push(format!(
                "{idle_instances} element instances are neither scheduled nor playing"
            ));
        }

        if self.active_handles + self.idle_handles > self.total_handles {
            warnings.push("Handle bookkeeping is inconsistent".to_string());
        }

        warnings
    }
}
