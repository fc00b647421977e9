//! Loading soundscape manifests and running them headless

use ambience::prelude::*;
use std::collections::HashSet;
use std::fs;

const FOREST: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../game/assets/soundscapes/forest.json");

fn run(soundscape: &Soundscape, seconds: usize) -> (AmbienceSystem, Vec<FireEvent>) {
    let completions = CompletionQueue::new();
    let backend = SimulatedBackend::new(completions.clone(), 1.5);
    let mut system = AmbienceSystem::new(
        soundscape.config.clone(),
        SharedListener::at(Vec3::ZERO),
        backend,
        completions,
    )
    .unwrap();
    for layer in &soundscape.layers {
        system.activate_layer(layer);
    }

    let mut events = Vec::new();
    for _ in 0..seconds * 10 {
        events.extend(system.tick(0.1));
    }
    (system, events)
}

#[test]
fn test_bundled_forest_manifest_runs() {
    let soundscape = Soundscape::load(FOREST).unwrap();
    assert!(soundscape.parameter("tension").is_some());
    assert!(soundscape.layer("forest_day").is_some());

    let (system, events) = run(&soundscape, 120);
    let names: HashSet<&str> = events.iter().map(|e| e.element_name.as_str()).collect();
    assert!(names.contains("songbird"));
    assert!(names.contains("woodpecker"));
    // The thunder layer expires after 90 seconds
    assert_eq!(system.active_layers().count(), 1);
    assert!(system.stats().check_health().is_empty(), "{:?}", system.stats());
}

#[test]
fn test_same_seed_same_events() {
    let soundscape = Soundscape::load(FOREST).unwrap();
    let (_, first) = run(&soundscape, 60);
    let (_, second) = run(&soundscape, 60);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_manifest_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cave.json");
    fs::write(
        &path,
        r#"{
            "parameters": [{ "name": "depth", "range": { "min": 0, "max": 200 }, "default": 20 }],
            "layers": [{
                "name": "cave",
                "volume_multiplier": 5.0,
                "modifiers": [{ "parameter": "depth", "volume_scale_range": { "min": 0.5, "max": 1.0 } }],
                "elements": [{ "name": "drip", "sounds": ["drip.ogg"], "interval": { "min": 0, "max": 0 } }]
            }]
        }"#,
    )
    .unwrap();

    let soundscape = Soundscape::load(&path).unwrap();
    let cave = soundscape.layer("cave").unwrap();
    // Multipliers are clamped to the supported maximum
    assert_eq!(cave.volume_multiplier(), 2.0);

    let (_, events) = run(&soundscape, 1);
    // depth 20 of 200 maps to 0.1, so volume scale is 0.55, doubled by the layer
    let first = &events[0];
    assert!((first.volume - 1.1).abs() < 1e-5, "volume {}", first.volume);
}

#[test]
fn test_bad_manifest_reports_the_definition() {
    let json = r#"{
        "layers": [{
            "name": "broken",
            "density_multiplier": -1.0,
            "elements": [{ "name": "x", "sounds": ["x.ogg"] }]
        }]
    }"#;
    let error = Soundscape::from_json(json).unwrap_err();
    assert!(error.to_string().contains("broken"), "{error}");
}
