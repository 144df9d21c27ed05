use approx::assert_relative_eq;

use shapesim::simulation::bounding::{Rectangle, Sphere, SphereTree};
use shapesim::simulation::collision::{
    broad_phase_overlap, circle_collision, detect_collisions, CollisionHandler, PenaltyCollisionHandler,
};
use shapesim::simulation::integrator::shape_match;
use shapesim::simulation::math::{
    extract_proper_rotation_from_matrix, extract_rotation_from_matrix, extract_rotation_from_positions,
    outer_product_sum,
};
use shapesim::simulation::particle::{MassParticle, Spring};
use shapesim::{
    BodyHandle, BoundingVolume, Gravity, NMat3, NVec3, ParticleFrame, PhysicalBody, PhysicsError, PhysicsParams, PhysicsWorld,
    RigidBody, Scenario, ScenarioConfig, SceneObject, SoftBody, Transform,
};

/// Build a dynamic rigid body holding a single particle
pub fn single_particle_body(position: NVec3, radius: f64) -> RigidBody {
    let mut body = RigidBody::dynamic();
    body.add_mass_particle(MassParticle::new(position, radius));
    body
}

/// Build a box of particles of diameter 1 centred on `position`
pub fn box_body(position: NVec3, dimension: NVec3) -> RigidBody {
    RigidBody::dynamic()
        .at(position)
        .with_box(dimension, 1.0)
        .unwrap()
        .with_bounding_sphere()
}

/// Static floor slab one particle thick, top face at y = 0.5
pub fn floor() -> RigidBody {
    RigidBody::fixed()
        .with_box(NVec3::new(10.0, 1.0, 10.0), 1.0)
        .unwrap()
        .with_bounding_sphere()
}

/// World with gravity and default penalty collisions
pub fn gravity_world() -> PhysicsWorld {
    let params = PhysicsParams::default();
    let mut world = PhysicsWorld::new(params.clone());
    world.add_force_field(Gravity { g: params.gravity });
    world.add_collision_handler(PenaltyCollisionHandler::from_params(&params));
    world
}

fn pairwise_distances(body: &PhysicalBody) -> Vec<f64> {
    let ps = body.mass_particles();
    let mut out = Vec::new();
    for i in 0..ps.len() {
        for j in (i + 1)..ps.len() {
            out.push((ps[i].position - ps[j].position).norm());
        }
    }
    out
}

// ==================================================================================
// Collision geometry tests
// ==================================================================================

#[test]
fn circle_collision_touching_is_not_a_collision() {
    let c = circle_collision(&NVec3::zeros(), &NVec3::new(2.0, 0.0, 0.0), 1.0, 1.0);
    assert_eq!(c.magnitude, 0.0);
    assert_eq!(c.direction, NVec3::zeros());
    assert!(!c.is_colliding());
}

#[test]
fn circle_collision_magnitude_and_direction() {
    let c = circle_collision(&NVec3::zeros(), &NVec3::new(2.0, 0.0, 0.0), 1.0, 1.5);
    assert_relative_eq!(c.magnitude, 0.5, epsilon = 1e-12);
    // points from the second center toward the first
    assert_relative_eq!(c.direction, NVec3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);

    let c = circle_collision(&NVec3::zeros(), &NVec3::new(0.5, 0.0, 0.0), 1.0, 1.0);
    assert_relative_eq!(c.magnitude, 1.5, epsilon = 1e-12);
}

// ==================================================================================
// Rotation extraction tests
// ==================================================================================

#[test]
fn rotation_of_unmoved_points_is_identity() {
    let points = vec![
        NVec3::new(1.0, 0.0, 0.0),
        NVec3::new(0.0, 2.0, 0.0),
        NVec3::new(0.0, 0.0, 3.0),
        NVec3::new(-1.0, -2.0, -3.0),
    ];
    let r = extract_rotation_from_positions(&points, &points, 5);
    assert_relative_eq!(r, NMat3::identity(), epsilon = 1e-4);

    let a = outer_product_sum(&points, &points, 5);
    assert_relative_eq!(extract_rotation_from_matrix(&a, 5), NMat3::identity(), epsilon = 1e-4);
}

#[test]
fn rotation_of_two_point_quarter_turn() {
    let old = vec![NVec3::new(-1.0, 0.0, 0.0), NVec3::new(1.0, 0.0, 0.0)];
    let new = vec![NVec3::new(0.0, 1.0, 0.0), NVec3::new(0.0, -1.0, 0.0)];
    let r = extract_rotation_from_positions(&old, &new, 5);

    let expected = NMat3::new(
        0.0, -1.0, 0.0, //
        -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0,
    );
    assert_relative_eq!(r, expected, epsilon = 1e-4);
    // maps every old offset onto its new one
    for (o, n) in old.iter().zip(new.iter()) {
        assert_relative_eq!(r * o, *n, epsilon = 1e-4);
    }
}

#[test]
fn rotation_recovers_known_turn() {
    let rotation = nalgebra::Rotation3::from_axis_angle(&NVec3::z_axis(), 0.3).into_inner();
    let old = vec![
        NVec3::new(1.0, 0.0, 0.0),
        NVec3::new(0.0, 2.0, 0.0),
        NVec3::new(0.0, 0.0, 3.0),
        NVec3::new(-1.0, -2.0, -3.0),
    ];
    let new: Vec<NVec3> = old.iter().map(|p| rotation * p).collect();
    let r = extract_rotation_from_positions(&old, &new, 5);
    assert_relative_eq!(r, rotation, epsilon = 1e-4);
}

#[test]
fn proper_rotation_flips_reflected_axis() {
    let a = NMat3::from_diagonal(&NVec3::new(3.0, 2.0, -1.0));
    assert_relative_eq!(extract_rotation_from_matrix(&a, 5).determinant(), -1.0, epsilon = 1e-4);

    let r = extract_proper_rotation_from_matrix(&a, 5);
    assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-4);
    assert_relative_eq!(r, NMat3::identity(), epsilon = 1e-4);
}

#[test]
fn proper_rotation_of_rank_one_matrix() {
    let old = vec![NVec3::new(-1.0, 0.0, 0.0), NVec3::new(1.0, 0.0, 0.0)];
    let new = vec![NVec3::new(0.0, 1.0, 0.0), NVec3::new(0.0, -1.0, 0.0)];
    let a = outer_product_sum(&new, &old, 5);

    let r = extract_proper_rotation_from_matrix(&a, 5);
    assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-4);
    for (o, n) in old.iter().zip(new.iter()) {
        assert_relative_eq!(r * o, *n, epsilon = 1e-4);
    }
}

// ==================================================================================
// Spring tests
// ==================================================================================

#[test]
fn spring_at_rest_length_applies_no_force() {
    let mut particles = vec![
        MassParticle::new(NVec3::zeros(), 0.5),
        MassParticle::new(NVec3::new(1.0, 0.0, 0.0), 0.5),
    ];
    let spring = Spring::from_particles(&particles, 0, 1, 100.0, 0.0);
    assert_relative_eq!(spring.length, 1.0);

    spring.apply(&mut particles);
    assert_eq!(particles[0].spring_force, NVec3::zeros());
    assert_eq!(particles[1].spring_force, NVec3::zeros());
}

#[test]
fn stretched_spring_pulls_endpoints_together() {
    let mut particles = vec![
        MassParticle::new(NVec3::zeros(), 0.5),
        MassParticle::new(NVec3::new(2.0, 0.0, 0.0), 0.5),
    ];
    let spring = Spring {
        source: 0,
        target: 1,
        length: 1.0,
        spring_constant: 10.0,
        damper_constant: 0.0,
    };
    spring.apply(&mut particles);
    assert_relative_eq!(particles[0].spring_force, NVec3::new(10.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(particles[1].spring_force, NVec3::new(-10.0, 0.0, 0.0), epsilon = 1e-12);
}

// ==================================================================================
// Body tests
// ==================================================================================

#[test]
fn box_population_is_centred() {
    let body = box_body(NVec3::new(1.0, 2.0, 3.0), NVec3::new(2.0, 3.0, 1.0));
    assert_eq!(body.mass_particles().len(), 6);
    assert_relative_eq!(body.position(), NVec3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
}

#[test]
fn set_position_shifts_particles_and_bounding() {
    let mut body = box_body(NVec3::zeros(), NVec3::new(2.0, 2.0, 2.0));
    let before = body.bounding().spheres()[0].position;
    body.set_position(NVec3::new(5.0, 0.0, 0.0));
    assert_relative_eq!(body.position(), NVec3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(body.bounding().spheres()[0].position, before + NVec3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn empty_body_reports_origin() {
    let body = RigidBody::dynamic().at(NVec3::new(1.0, 1.0, 1.0));
    assert_eq!(body.position(), NVec3::new(1.0, 1.0, 1.0));
    assert_eq!(body.velocity(), NVec3::zeros());
}

#[test]
fn object_local_box_is_sampled_around_the_object() {
    let body = RigidBody::fixed()
        .with_object(Box::new(Transform::at(NVec3::new(5.0, 0.0, 0.0))))
        .with_frame(ParticleFrame::ObjectLocal)
        .with_box(NVec3::new(1.0, 1.0, 1.0), 1.0)
        .unwrap();
    assert_eq!(body.mass_particles()[0].position, NVec3::zeros());
    assert_relative_eq!(body.world_position(0), NVec3::new(5.0, 0.0, 0.0), epsilon = 1e-12);

    let plate = RigidBody::fixed()
        .with_object(Box::new(Transform::at(NVec3::new(0.0, 2.0, 0.0))))
        .with_frame(ParticleFrame::ObjectLocal)
        .with_rectangle(1.0, 1.0, 1.0)
        .unwrap();
    assert_relative_eq!(plate.world_position(0), NVec3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
}

#[test]
fn invalid_population_is_rejected() {
    let err = RigidBody::dynamic().with_box(NVec3::new(1.0, 1.0, 1.0), 0.0).unwrap_err();
    assert_eq!(err, PhysicsError::InvalidParticleDiameter(0.0));

    let err = RigidBody::dynamic().with_rectangle(-1.0, 1.0, 1.0).unwrap_err();
    assert!(matches!(err, PhysicsError::InvalidDimension(_)));
}

#[test]
fn soft_grid_layout_and_springs() {
    let soft = SoftBody::grid(3, 4, 1.0, 0.5, NVec3::zeros(), 100.0, 1.0).unwrap();
    assert_eq!(soft.mass_particles().len(), 12);
    // right: 3 * 3, down: 2 * 4, diagonal: 2 * 3
    assert_eq!(soft.springs().len(), 23);
    assert_relative_eq!(
        soft.particle(0, 0).unwrap().position,
        NVec3::new(-1.5, -1.0, 0.0),
        epsilon = 1e-12
    );
    assert!(soft.particle(3, 0).is_none());
    // corner touches right, down and diagonal springs
    assert_eq!(soft.particle(0, 0).unwrap().springs.len(), 3);
    assert_eq!(soft.strip_vertices().len(), 2 * 4 * 6);
}

#[test]
fn soft_grid_too_small() {
    let err = SoftBody::grid(1, 3, 1.0, 0.5, NVec3::zeros(), 100.0, 1.0).unwrap_err();
    assert_eq!(err, PhysicsError::InvalidGrid { rows: 1, columns: 3 });
}

#[test]
fn soft_spring_forces_cancel() {
    let mut soft = SoftBody::grid(3, 3, 1.0, 0.5, NVec3::zeros(), 100.0, 1.0).unwrap();
    soft.update_spring_forces();
    for p in soft.mass_particles() {
        assert_relative_eq!(p.spring_force, NVec3::zeros(), epsilon = 1e-9);
    }

    soft.mass_particles_mut()[4].position += NVec3::new(0.3, -0.2, 0.1);
    soft.update_spring_forces();
    let net = soft
        .mass_particles()
        .iter()
        .fold(NVec3::zeros(), |acc, p| acc + p.spring_force);
    assert!(net.norm() < 1e-9, "net spring force not zero: {:?}", net);
    assert!(soft.mass_particles()[4].spring_force.norm() > 0.0);
}

// ==================================================================================
// Bounding volume tests
// ==================================================================================

#[test]
fn sphere_tree_leaves_respect_radius() {
    let region = Rectangle::new(NVec3::zeros(), NVec3::new(4.0, 4.0, 4.0));
    let tree = SphereTree::build(region, 1.0).unwrap();
    assert!(!tree.leaves.is_empty());
    for leaf in tree.leaf_spheres() {
        assert!(leaf.radius <= 1.0);
    }
    assert!(tree.overlaps_sphere(&Sphere::new(NVec3::new(2.0, 2.0, 2.0), 0.1)));
    assert!(!tree.overlaps_sphere(&Sphere::new(NVec3::new(20.0, 2.0, 2.0), 0.1)));
}

#[test]
fn sphere_tree_pair_queries() {
    let a = SphereTree::build(Rectangle::new(NVec3::zeros(), NVec3::new(2.0, 2.0, 2.0)), 0.5).unwrap();
    let mut b = a.clone();
    assert!(a.overlaps_tree(&b));
    b.shift(&NVec3::new(10.0, 0.0, 0.0));
    assert!(!a.overlaps_tree(&b));
}

#[test]
fn sphere_tree_rejects_bad_leaf_radius() {
    let region = Rectangle::new(NVec3::zeros(), NVec3::new(1.0, 1.0, 1.0));
    assert_eq!(
        SphereTree::build(region, 0.0).unwrap_err(),
        PhysicsError::InvalidLeafRadius(0.0)
    );
}

#[test]
fn broad_phase_prunes_disjoint_bodies() {
    let a = box_body(NVec3::zeros(), NVec3::new(2.0, 2.0, 2.0));
    let b = box_body(NVec3::new(10.0, 0.0, 0.0), NVec3::new(2.0, 2.0, 2.0));
    let bodies: Vec<PhysicalBody> = vec![a.into(), b.into()];
    assert!(detect_collisions(&bodies, true).is_empty());
}

#[test]
fn broad_phase_trusts_bounding_volumes() {
    // particles overlap but the bounding sphere of the second body lies elsewhere
    let a = single_particle_body(NVec3::zeros(), 0.5);
    let mut b = single_particle_body(NVec3::new(0.5, 0.0, 0.0), 0.5);
    b.add_bounding_sphere(Sphere::new(NVec3::new(50.0, 0.0, 0.0), 1.0));
    let a = a.with_bounding_sphere();
    let bodies: Vec<PhysicalBody> = vec![a.into(), b.into()];

    assert!(detect_collisions(&bodies, true).is_empty());
    assert_eq!(detect_collisions(&bodies, false).len(), 1);
}

// ==================================================================================
// Collision response tests
// ==================================================================================

#[test]
fn penalty_response_separates_particles() {
    let mut a = single_particle_body(NVec3::zeros(), 0.5);
    a.set_velocity(NVec3::new(1.0, 0.0, 0.0));
    let mut b = single_particle_body(NVec3::new(0.8, 0.0, 0.0), 0.5);
    b.set_velocity(NVec3::new(-1.0, 0.0, 0.0));
    let mut bodies: Vec<PhysicalBody> = vec![a.into(), b.into()];

    let mut handler = PenaltyCollisionHandler::new(500.0, 5.0, 0.5);
    let contacts = handler.apply(&mut bodies, 0.01);

    assert_eq!(contacts, 1);
    let va = bodies[0].velocity();
    let vb = bodies[1].velocity();
    assert_relative_eq!(va.x, -0.055, epsilon = 1e-9);
    assert_relative_eq!(vb.x, 0.055, epsilon = 1e-9);
    assert!(bodies[0].mass_particles()[0].collided);
    assert!(bodies[1].mass_particles()[0].collided);
}

#[test]
fn penalty_response_leaves_static_bodies_alone() {
    let mut wall = single_particle_body(NVec3::zeros(), 0.5);
    wall.set_static(true);
    let ball = single_particle_body(NVec3::new(0.8, 0.0, 0.0), 0.5);
    let mut bodies: Vec<PhysicalBody> = vec![wall.into(), ball.into()];

    PenaltyCollisionHandler::default().apply(&mut bodies, 0.01);

    assert_eq!(bodies[0].velocity(), NVec3::zeros());
    assert!(bodies[0].mass_particles()[0].collided);
    assert!(bodies[1].velocity().x > 0.0);
}

#[test]
fn object_local_geometry_collides_in_world_space() {
    let mut wall = RigidBody::fixed()
        .with_object(Box::new(Transform::at(NVec3::new(5.0, 0.0, 0.0))))
        .with_frame(ParticleFrame::ObjectLocal);
    wall.add_mass_particle(MassParticle::new(NVec3::zeros(), 0.5));
    assert_relative_eq!(wall.world_position(0), NVec3::new(5.0, 0.0, 0.0), epsilon = 1e-12);

    let ball = single_particle_body(NVec3::new(5.8, 0.0, 0.0), 0.5);
    let bodies: Vec<PhysicalBody> = vec![wall.into(), ball.into()];
    let contacts = detect_collisions(&bodies, false);
    assert_eq!(contacts.len(), 1);
    assert_relative_eq!(contacts[0].collision.magnitude, 0.2, epsilon = 1e-12);
}

#[test]
fn object_local_bounding_is_tested_in_world_space() {
    let mut wall = RigidBody::fixed()
        .with_object(Box::new(Transform::at(NVec3::new(5.0, 0.0, 0.0))))
        .with_frame(ParticleFrame::ObjectLocal);
    wall.add_mass_particle(MassParticle::new(NVec3::zeros(), 0.5));
    let wall = wall.with_bounding_sphere();
    assert_relative_eq!(wall.world_bounding().spheres()[0].position, NVec3::new(5.0, 0.0, 0.0), epsilon = 1e-12);

    let ball = single_particle_body(NVec3::new(5.8, 0.0, 0.0), 0.5).with_bounding_sphere();
    let bodies: Vec<PhysicalBody> = vec![wall.into(), ball.into()];
    assert_eq!(detect_collisions(&bodies, true).len(), 1);
}

#[test]
fn scaled_object_scales_bounding_radius() {
    let mut object = Transform::at(NVec3::new(0.0, 3.0, 0.0));
    object.scale = NVec3::new(1.0, 2.0, 1.0);
    let mut body = RigidBody::fixed().with_object(Box::new(object)).with_frame(ParticleFrame::ObjectLocal);
    body.add_mass_particle(MassParticle::new(NVec3::zeros(), 0.5));
    let body = body.with_bounding_sphere();

    let sphere = body.world_bounding().spheres()[0];
    assert_relative_eq!(sphere.position, NVec3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(sphere.radius, 1.0, epsilon = 1e-12);
}

// ==================================================================================
// World tests
// ==================================================================================

#[test]
fn free_fall_matches_euler_integration() {
    let g = 9.81;
    let dt = 0.01;
    let n = 30;

    let mut world = PhysicsWorld::default();
    world.add_force_field(Gravity { g });
    let handle = world.register_body(single_particle_body(NVec3::new(0.0, 10.0, 0.0), 0.5));

    for _ in 0..n {
        world.update(dt);
    }

    let body = world.body(handle).unwrap();
    let n_f = n as f64;
    assert_relative_eq!(body.velocity().y, -g * n_f * dt, epsilon = 1e-9);
    assert_relative_eq!(
        body.position().y,
        10.0 - g * dt * dt * n_f * (n_f + 1.0) / 2.0,
        epsilon = 1e-9
    );
    assert_relative_eq!(world.time(), n_f * dt, epsilon = 1e-12);
    assert_eq!(world.step_count(), n as u64);
}

#[test]
fn particle_count_is_invariant() {
    let mut world = gravity_world();
    world.register_body(floor());
    let handle = world.register_body(box_body(NVec3::new(0.0, 2.0, 0.0), NVec3::new(2.0, 2.0, 2.0)));
    let before = world.body(handle).unwrap().mass_particles().len();

    for _ in 0..120 {
        world.update(1.0 / 60.0);
    }
    assert_eq!(world.body(handle).unwrap().mass_particles().len(), before);
}

#[test]
fn static_bodies_never_move() {
    let mut world = gravity_world();
    let floor_handle = world.register_body(floor());
    world.register_body(box_body(NVec3::new(0.0, 1.6, 0.0), NVec3::new(2.0, 2.0, 2.0)));

    let snapshot: Vec<(NVec3, NVec3)> = world
        .body(floor_handle)
        .unwrap()
        .mass_particles()
        .iter()
        .map(|p| (p.position, p.velocity))
        .collect();

    let mut saw_contact = false;
    for _ in 0..200 {
        world.update(1.0 / 60.0);
        saw_contact |= world.contacts_last_step() > 0;
    }
    assert!(saw_contact, "box never reached the floor");

    let after: Vec<(NVec3, NVec3)> = world
        .body(floor_handle)
        .unwrap()
        .mass_particles()
        .iter()
        .map(|p| (p.position, p.velocity))
        .collect();
    assert_eq!(snapshot, after);
}

#[test]
fn shape_matching_keeps_bodies_rigid() {
    let mut world = PhysicsWorld::default();
    let mut body = box_body(NVec3::zeros(), NVec3::new(2.0, 2.0, 2.0));
    // spin about z plus a kick on a single particle
    let omega = NVec3::new(0.0, 0.0, 2.0);
    for p in body.mass_particles_mut() {
        p.velocity = omega.cross(&p.position);
    }
    body.mass_particles_mut()[0].velocity += NVec3::new(0.0, 3.0, 0.0);
    let handle = world.register_body(body);

    let before = pairwise_distances(world.body(handle).unwrap());
    for _ in 0..10 {
        world.update(1.0 / 60.0);
    }
    let after = pairwise_distances(world.body(handle).unwrap());

    for (d0, d1) in before.iter().zip(after.iter()) {
        assert_relative_eq!(*d0, *d1, epsilon = 1e-3);
    }
}

#[test]
fn softened_shape_matching_applies_partial_correction() {
    let kicked = || {
        let mut body = box_body(NVec3::zeros(), NVec3::new(2.0, 2.0, 2.0));
        body.mass_particles_mut()[0].velocity = NVec3::new(0.0, 3.0, 0.0);
        body
    };
    let dt = 1.0 / 60.0;
    let original = kicked();
    let mut full = kicked();
    shape_match(&mut full, dt, &PhysicsParams::default());
    let mut half = kicked();
    shape_match(&mut half, dt, &PhysicsParams { alpha: 0.5, ..PhysicsParams::default() });

    let particles = original
        .mass_particles()
        .iter()
        .zip(full.mass_particles())
        .zip(half.mass_particles());
    for ((o, f), h) in particles {
        let expected = o.velocity + (f.velocity - o.velocity) * 0.5;
        assert_relative_eq!(h.velocity, expected, epsilon = 1e-9);
    }
    let kicked_y = |b: &RigidBody| b.mass_particles()[0].velocity.y;
    assert!(kicked_y(&full) < kicked_y(&half));
    assert!(kicked_y(&half) < 3.0);
}

#[test]
fn enclosing_sphere_covers_rotating_body() {
    let mut world = PhysicsWorld::default();
    let mut rod = box_body(NVec3::zeros(), NVec3::new(6.0, 1.0, 1.0));
    let omega = NVec3::new(0.0, 0.0, 3.0);
    for p in rod.mass_particles_mut() {
        p.velocity = omega.cross(&p.position);
    }
    let handle = world.register_body(rod);
    // roughly a quarter turn
    for _ in 0..30 {
        world.update(1.0 / 60.0);
    }

    let rod = world.body(handle).unwrap();
    let sphere = rod.bounding_spheres()[0];
    for p in rod.mass_particles() {
        assert!((p.position - sphere.position).norm() + p.radius <= sphere.radius + 1e-3);
    }

    let top = rod
        .mass_particles()
        .iter()
        .map(|p| p.position)
        .fold(NVec3::new(0.0, f64::MIN, 0.0), |a, b| if b.y > a.y { b } else { a });
    assert!(top.y > 1.5);
    let neighbour: PhysicalBody = single_particle_body(top + NVec3::new(0.0, 0.8, 0.0), 0.5)
        .with_bounding_sphere()
        .into();
    assert!(broad_phase_overlap(rod, &neighbour));
}

#[test]
fn invalid_time_steps_are_ignored() {
    let mut world = gravity_world();
    let handle = world.register_body(single_particle_body(NVec3::new(0.0, 1.0, 0.0), 0.5));

    world.update(0.0);
    world.update(-0.1);
    world.update(f64::NAN);

    assert_eq!(world.step_count(), 0);
    assert_eq!(world.time(), 0.0);
    assert_eq!(world.body(handle).unwrap().velocity(), NVec3::zeros());
}

#[test]
fn registered_object_follows_body() {
    let mut world = gravity_world();
    let handle = world.register_object(Box::new(Transform::at(NVec3::new(0.0, 5.0, 0.0))));
    assert_eq!(handle, BodyHandle(0));

    let rigid = world.body_mut(handle).unwrap().as_rigid_mut().unwrap();
    rigid.add_mass_particle(MassParticle::new(NVec3::new(0.0, 5.0, 0.0), 0.5));

    for _ in 0..10 {
        world.update(1.0 / 60.0);
    }

    let rigid = world.body(handle).unwrap().as_rigid().unwrap();
    let object_position = rigid.object().unwrap().position();
    assert_relative_eq!(object_position, rigid.position(), epsilon = 1e-12);
    assert!(object_position.y < 5.0);
}

#[test]
fn velocity_clamp_limits_speed() {
    let params = PhysicsParams {
        max_velocity: Some(1.0),
        ..PhysicsParams::default()
    };
    let mut world = PhysicsWorld::new(params);
    world.add_force_field(Gravity { g: 100.0 });
    let handle = world.register_body(single_particle_body(NVec3::zeros(), 0.5));

    for _ in 0..10 {
        world.update(0.1);
    }
    assert!(world.body(handle).unwrap().velocity().norm() <= 1.0 + 1e-12);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

const DROP_BOX: &str = r#"
engine:
  dt: 0.016666
  steps: 20
  broad_phase: tree
  leaf_radius: 1.0

parameters:
  stiffness: 400.0
  response_curve: stiffened_power
  response_exponent: 3.0

force_fields:
  - type: gravity
  - type: air_resistance
    coefficient: 0.1

bodies:
  - kind: rigid
    position: [0.0, 3.0, 0.0]
    velocity: [1.0, 0.0, 0.0]
    dimension: [2.0, 2.0, 2.0]
    particle_diameter: 1.0
  - kind: rigid
    static: true
    position: [0.0, 0.0, 0.0]
    dimension: [10.0, 1.0, 10.0]
    particle_diameter: 1.0
  - kind: soft
    position: [5.0, 3.0, 0.0]
    dimension: [3.0, 3.0]
    particle_diameter: 1.0
    mass: 2.0
"#;

#[test]
fn scenario_builds_and_runs() {
    let cfg = ScenarioConfig::from_yaml_str(DROP_BOX).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();

    assert_eq!(scenario.world.bodies().len(), 3);
    assert_eq!(scenario.world.force_fields().len(), 2);
    assert!(scenario.world.has_collision_handler());
    assert_relative_eq!(scenario.world.params().stiffness, 400.0);
    assert_relative_eq!(scenario.world.params().damping, PhysicsParams::default().damping);
    assert_eq!(scenario.world.bodies()[2].mass(), 2.0);
    assert_eq!(scenario.world.bodies()[2].mass_particles().len(), 9);

    let floor_before = scenario.world.bodies()[1].position();
    scenario.run();

    assert_eq!(scenario.world.step_count(), 20);
    assert_eq!(scenario.world.bodies()[1].position(), floor_before);
    assert!(scenario.world.bodies()[0].position().y < 3.0);
    assert!(scenario.world.bodies()[2].position().y < 3.0);
}

#[test]
fn tree_broad_phase_is_kept_for_static_bodies() {
    let cfg = ScenarioConfig::from_yaml_str(DROP_BOX).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();
    let bodies = scenario.world.bodies();
    assert!(matches!(bodies[0].bounding(), BoundingVolume::Spheres(s) if s.len() == 1));
    assert!(matches!(bodies[1].bounding(), BoundingVolume::Tree(_)));
}

#[test]
fn scenario_rejects_bad_vectors() {
    let yaml = DROP_BOX.replace("position: [0.0, 3.0, 0.0]", "position: [0.0, 3.0]");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    let err = Scenario::build_scenario(cfg).err().unwrap();
    assert_eq!(
        err,
        PhysicsError::InvalidVector {
            field: "position",
            expected: 3,
            got: 2
        }
    );
}

#[test]
fn scenario_rejects_bad_time_step() {
    let yaml = DROP_BOX.replace("dt: 0.016666", "dt: 0.0");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(
        Scenario::build_scenario(cfg).err().unwrap(),
        PhysicsError::InvalidTimeStep(0.0)
    );
}

#[test]
fn bundled_scenarios_parse() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["drop_box.yaml", "cloth.yaml", "spinning_boxes.yaml"] {
        let text = std::fs::read_to_string(dir.join(name)).unwrap();
        let cfg = ScenarioConfig::from_yaml_str(&text).unwrap();
        assert!(Scenario::build_scenario(cfg).is_ok(), "{name} failed to build");
    }
}
