//! Procedural ambience engine
//!
//! This crate schedules short positional sounds around a listener: bird
//! calls, creaks, distant thunder. Density and volume follow named game
//! parameters, placement follows per-element distribution rules, and
//! playback is delegated to a pluggable [`audio::AudioBackend`].

pub mod audio;
pub mod config;
pub mod core;
pub mod dev;
pub mod io;

/// Random source used for every placement and interval sample
pub type AmbienceRng = rand_chacha::ChaCha8Rng;

// Re-export commonly used types
pub mod prelude {
    // Definitions
    pub use crate::audio::{
        DistributionConfig, DistributionMode, Distributor, ElementDefinition, ElementRef,
        IntervalMode, LayerDefinition, LayerId, LayerRef, ParameterDefinition, ParameterModifier,
        ParameterRef, SoundSet, SourceClass,
    };

    // Runtime
    pub use crate::audio::{
        AmbienceSystem, AudioBackend, CompletionQueue, FireEvent, SimulatedBackend, SoundLibrary,
    };

    // Core types
    pub use crate::core::{FloatRange, ListenerSource, SharedListener};

    // Math types
    pub use glam::{Vec3, Vec4};

    // IO types
    pub use crate::io::{ManifestError, Soundscape};

    // Config types
    pub use crate::config::{AmbienceConfig, ConfigError};

    pub use crate::AmbienceRng;
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
