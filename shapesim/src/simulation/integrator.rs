//! Velocity and position integration for particle bodies
//!
//! Rigid bodies are kept rigid by shape matching: each step the freely
//! integrated particle cloud is compared with the cloud at the start of the
//! step, the best-fit rotation between them is extracted, and every particle's
//! velocity is nudged toward the position that rotation (plus the projected
//! center of mass) would put it at. Positions are then advanced with plain
//! explicit Euler by [`integrate_positions`].

use crate::simulation::body::{PhysicalBody, RigidBody};
use crate::simulation::math::{
    extract_proper_rotation_from_matrix, extract_rotation_from_positions, mean, outer_product_sum, NMat3, NVec3,
};
use crate::simulation::params::PhysicsParams;
use crate::simulation::particle::MassParticle;

/// Mean particle position, `None` for an empty slice
pub fn center_of_mass(particles: &[MassParticle]) -> Option<NVec3> {
    mean(particles.iter().map(|p| p.position))
}

/// Mean of where every particle would be after `dt` of free motion
pub fn projected_center_of_mass(particles: &[MassParticle], dt: f64) -> Option<NVec3> {
    mean(particles.iter().map(|p| p.predicted_position(dt)))
}

/// Best-fit rotation carrying `old` offsets onto `new` offsets.
pub fn rotation_matrix(old: &[NVec3], new: &[NVec3], params: &PhysicsParams) -> NMat3 {
    if params.correct_reflections {
        let a = outer_product_sum(new, old, params.rounding_digits);
        extract_proper_rotation_from_matrix(&a, params.rounding_digits)
    } else {
        extract_rotation_from_positions(old, new, params.rounding_digits)
    }
}

/// Shape-matching velocity update for one rigid body.
///
/// No-op for static bodies, bodies without particles and non-positive `dt`.
pub fn shape_match(body: &mut RigidBody, dt: f64, params: &PhysicsParams) {
    if body.is_static() || !(dt > 0.0) {
        return;
    }
    let (cm, cm_next) = match (
        center_of_mass(&body.particles),
        projected_center_of_mass(&body.particles, dt),
    ) {
        (Some(cm), Some(cm_next)) => (cm, cm_next),
        _ => return, // no particles
    };

    // offsets from the current and the projected center
    let old: Vec<NVec3> = body.particles.iter().map(|p| p.position - cm).collect();
    let new: Vec<NVec3> = body.particles.iter().map(|p| p.predicted_position(dt) - cm_next).collect();

    let rotation = rotation_matrix(&old, &new, params);
    let gain = params.alpha / dt;

    for (particle, offset) in body.particles.iter_mut().zip(old.iter()) {
        let goal = rotation * offset + cm_next;
        let correction = (goal - particle.predicted_position(dt)) * gain;
        particle.velocity += correction;
    }

    // the body's center moves by exactly this much once positions integrate
    body.bounding.shift(&(cm_next - cm));
}

/// Explicit Euler position step: `x += v * dt` for every particle.
/// Soft bodies refit their bounding sphere afterwards.
pub fn integrate_positions(body: &mut PhysicalBody, dt: f64) {
    if body.is_static() {
        return;
    }
    for particle in body.mass_particles_mut() {
        particle.position += particle.velocity * dt;
    }
    if let PhysicalBody::Soft(soft) = body {
        soft.refit_bounding();
    }
}

/// Scale down any particle velocity longer than `max_speed`.
/// Returns how many particles were clamped.
pub fn clamp_velocities(body: &mut PhysicalBody, max_speed: f64) -> usize {
    if body.is_static() {
        return 0;
    }
    let mut clamped = 0;
    for particle in body.mass_particles_mut() {
        let speed = particle.velocity.norm();
        if speed > max_speed {
            particle.velocity *= max_speed / speed;
            clamped += 1;
        }
    }
    clamped
}
