//! Input/Output module for soundscape manifests

mod manifest;

pub use manifest::{
    ElementManifest, LayerManifest, ManifestError, ModifierManifest, ParameterManifest, Soundscape,
    SoundscapeManifest,
};
