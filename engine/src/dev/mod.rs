//! Development utilities and debugging tools

pub mod debug_overlay;

pub use debug_overlay::{AmbienceStats, DebugLineData};

/// Feature flag to enable development tools only in debug builds
#[cfg(debug_assertions)]
pub const DEV_TOOLS_ENABLED: bool = true;

#[cfg(not(debug_assertions))]
pub const DEV_TOOLS_ENABLED: bool = false;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_tools_enabled() {
        #[cfg(debug_assertions)]
        assert!(DEV_TOOLS_ENABLED);

        #[cfg(not(debug_assertions))]
        assert!(!DEV_TOOLS_ENABLED);
    }
}
