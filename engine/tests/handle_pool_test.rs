//! Handle pool class separation and reuse under churn

use ambience::audio::backend::{AudioBackend, BackendError, PlayRequest};
use ambience::audio::pool::Activation;
use ambience::audio::{ElementInstanceId, HandleId, HandlePool, SourceClass};
use ambience::AmbienceRng;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct RecordingBackend {
    classes: HashMap<HandleId, SourceClass>,
}

impl AudioBackend for RecordingBackend {
    fn spawn_handle(&mut self, handle: HandleId, source_class: &SourceClass) {
        assert!(
            self.classes.insert(handle, source_class.clone()).is_none(),
            "{handle} spawned twice"
        );
    }

    fn play(&mut self, _request: PlayRequest<'_>) -> Result<(), BackendError> {
        Ok(())
    }
}

fn activation(element: ElementInstanceId, location: Vec3) -> Activation {
    Activation {
        element,
        location,
        base_volume: 1.0,
        volume: 1.0,
    }
}

/// Take a real instance id from a running system; the pool only stores it
fn element_id() -> ElementInstanceId {
    let completions = ambience::audio::CompletionQueue::new();
    let mut system = ambience::audio::AmbienceSystem::new(
        ambience::config::AmbienceConfig::seeded(0),
        ambience::core::SharedListener::at(Vec3::ZERO),
        ambience::audio::SimulatedBackend::new(completions.clone(), 1.0),
        completions,
    )
    .unwrap();
    let element = ambience::audio::ElementDefinition::builder("probe", ambience::audio::SoundSet::new(["p.ogg"]))
        .interval(0.0, 0.0)
        .build()
        .unwrap();
    let layer = ambience::audio::LayerDefinition::builder("probe")
        .element(element)
        .build()
        .unwrap();
    system.activate_layer(&layer).unwrap();
    system.tick(0.1)[0].element
}

#[test]
fn test_acquire_never_crosses_classes_or_duplicates() {
    let classes = [SourceClass::new("bird"), SourceClass::new("wind"), SourceClass::new("insect")];
    let mut pool = HandlePool::new(1000);
    let mut backend = RecordingBackend::default();
    let mut rng = AmbienceRng::seed_from_u64(11);
    let mut active: Vec<HandleId> = Vec::new();
    let element = element_id();

    for _ in 0..2000 {
        if !active.is_empty() && rng.gen_bool(0.45) {
            let index = rng.gen_range(0..active.len());
            let handle = active.swap_remove(index);
            let finished = pool.on_playback_finished(handle).unwrap();
            assert_eq!(finished.element, Some(element));
            assert!(pool.is_idle(handle));
            continue;
        }

        let class = &classes[rng.gen_range(0..classes.len())];
        let handle = pool.acquire(class, &mut backend);
        assert_eq!(pool.get(handle).unwrap().source_class(), class);
        assert_eq!(&backend.classes[&handle], class);
        assert!(!active.contains(&handle), "{handle} handed out twice");
        assert!(pool.activate(handle, activation(element, Vec3::splat(handle.index() as f32))));
        active.push(handle);
    }

    assert_eq!(pool.active_count(), active.len());
    assert_eq!(pool.active_count() + pool.idle_count(), pool.len());
    let unique: HashSet<_> = active.iter().collect();
    assert_eq!(unique.len(), active.len());
}

#[test]
fn test_pool_size_tracks_peak_concurrency() {
    let class = SourceClass::new("bird");
    let mut pool = HandlePool::default();
    let mut backend = RecordingBackend::default();
    let element = element_id();

    for _round in 0..10 {
        let handles: Vec<_> = (0..4).map(|_| pool.acquire(&class, &mut backend)).collect();
        for handle in &handles {
            pool.activate(*handle, activation(element, Vec3::ZERO));
        }
        assert_eq!(pool.active_locations().len(), 4);
        for handle in handles {
            pool.on_playback_finished(handle);
        }
    }
    assert_eq!(pool.len(), 4);
    assert_eq!(backend.classes.len(), 4);
    assert_eq!(pool.idle_count(), 4);
}
