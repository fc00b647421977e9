//! Procedural ambience: parameters, placement, handle pooling and scheduling
//!
//! This module provides:
//! - A registry of normalized, named parameters driven by game state
//! - Random, uniform and static emitter placement around the listener
//! - A pool of reusable playback handles per source class
//! - An element scheduler whose countdowns follow parameter-driven density

pub mod backend;
pub mod commands;
pub mod debug;
pub mod distribution;
pub mod element;
pub mod layer;
pub mod parameter;
pub mod pool;
pub mod resources;
pub mod scheduler;
pub mod system;


// Re-export commonly used types
pub use backend::{AudioBackend, BackendError, PlayRequest, PlaybackLog, SimulatedBackend};
pub use commands::CompletionQueue;
pub use distribution::{DistributionConfig, DistributionMode, DistributionRequest, Distributor, SpatialDistributor};
pub use element::{ElementDefinition, ElementInstanceId, ElementRef, IntervalMode, SoundSet, SourceClass};
pub use layer::{LayerDefinition, LayerId, LayerRef};
pub use parameter::{ParameterDefinition, ParameterModifier, ParameterRef, ParameterRegistry};
pub use pool::{HandleId, HandlePool};
pub use resources::{SoundLibrary, SoundRef};
pub use scheduler::{ElementScheduler, FireEvent};
pub use system::AmbienceSystem;
