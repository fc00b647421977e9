//! Placement properties of the built-in and custom distributors

use ambience::audio::distribution::{angle_bucket, angular_histogram, least_crowded_bucket};
use ambience::audio::DistributionRequest;
use ambience::core::horizontal_distance;
use ambience::prelude::*;
use rand::SeedableRng;
use std::sync::Arc;

fn rng(seed: u64) -> AmbienceRng {
    AmbienceRng::seed_from_u64(seed)
}

fn config(mode: DistributionMode) -> DistributionConfig {
    DistributionConfig {
        mode,
        horizontal_range: FloatRange::new(10.0, 20.0),
        vertical_range: 2.0,
        vertical_offset: 0.0,
        drift_amount: 1.0,
        static_relocation_threshold: 15.0,
    }
}

#[test]
fn test_random_stays_inside_ring() {
    let distributor = ambience::audio::SpatialDistributor::new();
    let config = config(DistributionMode::Random);
    let listener = Vec3::new(100.0, -50.0, 3.0);
    let mut rng = rng(1);

    for _ in 0..500 {
        let request = DistributionRequest {
            config: &config,
            listener,
            last_play_location: None,
            active_emitters: &[],
        };
        let location = distributor.distribute(&request, &mut rng);
        let radius = horizontal_distance(location, listener);
        assert!((10.0 - 1e-3..=20.0 + 1e-3).contains(&radius), "radius {radius}");
        assert!((location.z - listener.z).abs() <= 1.0 + 1e-4);
    }
}

#[test]
fn test_uniform_avoids_cluster() {
    let distributor = ambience::audio::SpatialDistributor::new();
    let config = DistributionConfig {
        drift_amount: 0.0,
        ..config(DistributionMode::Uniform)
    };
    let listener = Vec3::ZERO;

    // Every degree from 0 to 89 is occupied, three emitters deep
    let cluster: Vec<Vec3> = (0..90)
        .flat_map(|degree| {
            let (sin, cos) = (degree as f32).to_radians().sin_cos();
            [10.0, 12.0, 15.0].map(|r| Vec3::new(cos * r, sin * r, 0.0))
        })
        .collect();
    let histogram = angular_histogram(listener, &cluster);
    assert_eq!(histogram.iter().sum::<u32>(), 270);
    assert_eq!(least_crowded_bucket(&histogram), 90);

    let mut rng = rng(2);
    for _ in 0..50 {
        let request = DistributionRequest {
            config: &config,
            listener,
            last_play_location: None,
            active_emitters: &cluster,
        };
        let location = distributor.distribute(&request, &mut rng);
        let bucket = angle_bucket(listener, location).unwrap();
        assert!(bucket >= 90, "placed inside the cluster at {bucket}");
    }
}

#[test]
fn test_uniform_without_emitters_faces_bucket_zero() {
    let histogram = angular_histogram(Vec3::ZERO, &[]);
    assert_eq!(least_crowded_bucket(&histogram), 0);
}

#[test]
fn test_static_anchor_until_threshold() {
    let distributor = ambience::audio::SpatialDistributor::new();
    let config = config(DistributionMode::Static);
    let anchor = Vec3::new(12.0, 0.0, 1.0);
    let mut rng = rng(3);

    // Listener close to the anchor: reuse it within drift
    for step in 0..10 {
        let listener = Vec3::new(step as f32, 0.0, 0.0);
        let request = DistributionRequest {
            config: &config,
            listener,
            last_play_location: Some(anchor),
            active_emitters: &[],
        };
        let location = distributor.distribute(&request, &mut rng);
        assert!((location.x - anchor.x).abs() <= 0.5 + 1e-4);
        assert!((location.y - anchor.y).abs() <= 0.5 + 1e-4);
        assert_eq!(location.z, anchor.z);
    }

    // Listener walked away: relocate around the listener
    let listener = Vec3::new(100.0, 0.0, 0.0);
    let request = DistributionRequest {
        config: &config,
        listener,
        last_play_location: Some(anchor),
        active_emitters: &[],
    };
    let location = distributor.distribute(&request, &mut rng);
    assert!(horizontal_distance(location, listener) >= 10.0 - 1e-3);
    assert!(location.distance(anchor) > 50.0);
}

#[derive(Debug)]
struct Overhead {
    height: f32,
}

impl Distributor for Overhead {
    fn try_distribute(&self, request: &DistributionRequest<'_>, _rng: &mut AmbienceRng) -> Option<Vec3> {
        (self.height > 0.0).then(|| request.listener + Vec3::Z * self.height)
    }
}

fn system_with(distributor: Overhead) -> AmbienceSystem {
    let completions = CompletionQueue::new();
    let mut system = AmbienceSystem::new(
        AmbienceConfig::seeded(5),
        SharedListener::at(Vec3::new(1.0, 2.0, 0.0)),
        SimulatedBackend::new(completions.clone(), 1.0),
        completions,
    )
    .unwrap();
    let bat = ElementDefinition::builder("bat", SoundSet::new(["bat.ogg"]))
        .interval(0.0, 0.0)
        .distributor(Arc::new(distributor))
        .build()
        .unwrap();
    system
        .activate_layer(&LayerDefinition::builder("cave").element(bat).build().unwrap())
        .unwrap();
    system
}

#[test]
fn test_custom_distributor_overrides_modes() {
    let mut system = system_with(Overhead { height: 8.0 });
    let events = system.tick(0.1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].location, Vec3::new(1.0, 2.0, 8.0));
}

#[test]
fn test_declining_distributor_falls_back() {
    let mut system = system_with(Overhead { height: 0.0 });
    let events = system.tick(0.1);
    assert_eq!(events.len(), 1);
    let radius = horizontal_distance(events[0].location, Vec3::new(1.0, 2.0, 0.0));
    // Default ring is 5 to 20 around the listener
    assert!((5.0 - 1e-3..=20.0 + 1e-3).contains(&radius));
}
