//! Headless ambience demo
//!
//! Loads a soundscape manifest, walks a listener through it and ramps a
//! `tension` parameter while logging every element that fires.
//!
//! Usage: `ambience_demo [manifest.json]`

mod debug_lines;
#[cfg(feature = "audio")]
mod rodio_backend;

use ambience::dev::DEV_TOOLS_ENABLED;
use ambience::prelude::*;
use debug_lines::DebugState;
use std::path::PathBuf;
use tracing::{error, info, warn};

const DEFAULT_MANIFEST: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/soundscapes/forest.json");
const SOUND_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/sounds");

const FRAME_TIME: f32 = 1.0 / 60.0;
const RUN_SECONDS: f32 = 120.0;
const REPORT_INTERVAL: f32 = 10.0;
const WALK_RADIUS: f32 = 40.0;
const WALK_SPEED: f32 = 1.4;

fn main() {
    ambience::init_logging();

    let manifest_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));
    let soundscape = match Soundscape::load(&manifest_path) {
        Ok(soundscape) => soundscape,
        Err(e) => {
            error!(path = ?manifest_path, error = %e, "Failed to load soundscape");
            std::process::exit(1);
        }
    };
    info!(
        path = ?manifest_path,
        layers = soundscape.layers.len(),
        parameters = soundscape.parameters.len(),
        "Starting ambience demo"
    );

    let listener = SharedListener::at(Vec3::ZERO);
    let completions = CompletionQueue::new();

    #[cfg(feature = "audio")]
    let (_stream, backend, sounds) = {
        let (stream, handle) = match rodio::OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to open audio output");
                std::process::exit(1);
            }
        };
        let backend = rodio_backend::RodioBackend::new(handle, listener.clone(), completions.clone());
        let sounds = SoundLibrary::new(SOUND_DIR, ambience::audio::resources::FsResolver);
        (stream, backend, sounds)
    };
    #[cfg(not(feature = "audio"))]
    let (backend, sounds) = (
        SimulatedBackend::new(completions.clone(), 1.5).with_duration(format!("{SOUND_DIR}/weather/thunder_far.ogg"), 6.0),
        SoundLibrary::new(SOUND_DIR, ambience::audio::resources::DeferredResolver),
    );

    let mut config = soundscape.config.clone();
    config.debug_draw &= DEV_TOOLS_ENABLED;
    let mut system = match AmbienceSystem::new(config, listener.clone(), backend, completions) {
        Ok(system) => system.with_sound_library(sounds),
        Err(e) => {
            error!(error = %e, "Invalid ambience config");
            std::process::exit(1);
        }
    };

    for layer in &soundscape.layers {
        if system.activate_layer(layer).is_none() {
            info!(layer = layer.name(), "Layer is disabled, not activated");
        }
    }

    let tension = soundscape.parameter("tension").cloned();
    let mut debug_state = DebugState::default();
    let mut elapsed = 0.0f32;
    let mut next_report = REPORT_INTERVAL;
    let mut fired = 0usize;

    while elapsed < RUN_SECONDS {
        elapsed += FRAME_TIME;

        // Walk a slow circle around the origin
        let angle = elapsed * WALK_SPEED / WALK_RADIUS;
        listener.set(Some(Vec3::new(angle.cos(), angle.sin(), 0.0) * WALK_RADIUS));

        // Tension climbs over the first half of the run, then eases off
        if let Some(tension) = &tension {
            let half = RUN_SECONDS * 0.5;
            let ramp = 1.0 - ((elapsed - half).abs() / half);
            let range = tension.value_range();
            system.set_parameter_value(tension, range.lerp(ramp));
        }

        for event in system.tick(FRAME_TIME) {
            fired += 1;
            info!(
                t = elapsed,
                element = %event.element_name,
                layer = %event.layer,
                x = event.location.x,
                y = event.location.y,
                z = event.location.z,
                volume = event.volume,
                "Element fired"
            );
        }

        if elapsed >= next_report {
            next_report += REPORT_INTERVAL;
            let stats = system.stats();
            debug_state.update(&system);
            info!(
                t = elapsed,
                fired,
                debug_lines = debug_state.line_count(),
                debug_vertices = debug_state.vertex_data().len() / debug_lines::FLOATS_PER_VERTEX,
                "{}",
                stats.summary()
            );
            for warning in stats.check_health() {
                warn!(t = elapsed, "{warning}");
            }
        }

        #[cfg(feature = "audio")]
        std::thread::sleep(std::time::Duration::from_secs_f32(FRAME_TIME));
    }

    system.stats().print();
    info!(fired, seconds = RUN_SECONDS, "Ambience demo finished");
}
