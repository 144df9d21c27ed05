use std::time::Instant;

use crate::simulation::body::{PhysicalBody, RigidBody};
use crate::simulation::collision::{detect_collisions, PenaltyCollisionHandler};
use crate::simulation::forces::Gravity;
use crate::simulation::math::NVec3;
use crate::simulation::params::PhysicsParams;
use crate::simulation::world::PhysicsWorld;

/// Helper to build `n` dynamic boxes of 2x2x2 particles with bounding spheres
fn make_bodies(n: usize, spread: f64) -> Vec<PhysicalBody> {
    (0..n)
        .filter_map(|i| {
            let i_f = i as f64;
            // deterministic positions, no rand needed
            let position = NVec3::new(
                (i_f * 0.37).sin() * spread,
                (i_f * 0.13).cos() * spread + spread,
                (i_f * 0.07).sin() * spread,
            );
            RigidBody::dynamic()
                .at(position)
                .with_box(NVec3::new(2.0, 2.0, 2.0), 1.0)
                .ok()
                .map(|b| PhysicalBody::from(b.with_bounding_sphere()))
        })
        .collect()
}

/// Helper to build a world of `n` boxes above a static floor
fn make_world(n: usize) -> PhysicsWorld {
    let params = PhysicsParams::default();
    let mut world = PhysicsWorld::new(params.clone());
    world.add_force_field(Gravity { g: params.gravity });
    world.add_collision_handler(PenaltyCollisionHandler::from_params(&params));

    if let Ok(floor) = RigidBody::fixed().with_box(NVec3::new(40.0, 1.0, 40.0), 1.0) {
        world.register_body(floor.with_bounding_sphere());
    }
    for body in make_bodies(n, 10.0) {
        world.register_body(body);
    }
    world
}

/// Time contact detection with and without broad-phase pruning
pub fn bench_collision() {
    // Different body counts to test
    let ns = [8, 16, 32, 64, 128, 256];

    for n in ns {
        let bodies = make_bodies(n, 20.0);

        // Warm up
        let _ = detect_collisions(&bodies, false);
        let _ = detect_collisions(&bodies, true);

        // Time narrow phase only
        let t0 = Instant::now();
        let narrow = detect_collisions(&bodies, false);
        let dt_narrow = t0.elapsed().as_secs_f64();

        // Time broad + narrow phase
        let t1 = Instant::now();
        let broad = detect_collisions(&bodies, true);
        let dt_broad = t1.elapsed().as_secs_f64();

        println!(
            "N = {n:4}, narrow only = {:8.6} s ({} contacts), broad phase = {:8.6} s ({} contacts)",
            dt_narrow,
            narrow.len(),
            dt_broad,
            broad.len()
        );
    }
}

/// Time full world steps for a range of body counts
pub fn bench_step() {
    let ns = [8, 16, 32, 64, 128];
    let steps = 20; // steps averaged per world size

    for n in ns {
        let mut world = make_world(n);
        let dt = world.params().time_step;

        // Warm-up
        world.update(dt);

        let t0 = Instant::now();
        for _ in 0..steps {
            world.update(dt);
        }
        let per_step = t0.elapsed().as_secs_f64() / steps as f64;

        println!(
            "N = {:4}, step = {:8.6} s, contacts last step = {}",
            n,
            per_step,
            world.contacts_last_step()
        );
    }
}
