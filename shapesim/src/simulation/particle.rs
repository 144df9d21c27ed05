//! Mass particles and the damped springs connecting them.
//!
//! Particles live in their owning body's `Vec<MassParticle>`; springs refer
//! to them by index into that same vector.

use crate::simulation::math::{normalize_or_zero, NVec3};

/// Point mass used to discretize a body.
#[derive(Debug, Clone)]
pub struct MassParticle {
    pub position: NVec3,
    pub velocity: NVec3,
    pub radius: f64,
    /// Set during the last collision pass when this particle overlapped another
    pub collided: bool,
    /// Sum of spring forces for the current step (soft bodies only)
    pub spring_force: NVec3,
    /// Indices of springs in the owning body touching this particle
    pub springs: Vec<usize>,
}

impl MassParticle {
    pub fn new(position: NVec3, radius: f64) -> Self {
        Self {
            position,
            velocity: NVec3::zeros(),
            radius,
            collided: false,
            spring_force: NVec3::zeros(),
            springs: Vec::new(),
        }
    }

    pub fn shift_position(&mut self, shift: &NVec3) {
        self.position += shift;
    }

    /// Add a velocity delta. Callers scale forces by `dt` beforehand.
    pub fn apply_force(&mut self, force: &NVec3) {
        self.velocity += force;
    }

    pub fn apply_spring_force(&mut self, force: &NVec3) {
        self.spring_force += force;
    }

    pub fn reset_spring_force(&mut self) {
        self.spring_force = NVec3::zeros();
    }

    /// Where free motion would carry the particle after `dt`
    pub fn predicted_position(&self, dt: f64) -> NVec3 {
        self.position + self.velocity * dt
    }
}

/// Damped elastic link between two particles of the same body.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub source: usize,
    pub target: usize,
    /// Rest length, captured from the particles' separation at creation
    pub length: f64,
    pub spring_constant: f64,
    pub damper_constant: f64,
}

impl Spring {
    /// Spring between `particles[source]` and `particles[target]` resting at
    /// their current distance.
    pub fn from_particles(
        particles: &[MassParticle],
        source: usize,
        target: usize,
        spring_constant: f64,
        damper_constant: f64,
    ) -> Self {
        let length = (particles[target].position - particles[source].position).norm();
        Self {
            source,
            target,
            length,
            spring_constant,
            damper_constant,
        }
    }

    /// Force this spring exerts on its source particle. The target receives
    /// the negation.
    pub fn force(&self, particles: &[MassParticle]) -> NVec3 {
        let source = &particles[self.source];
        let target = &particles[self.target];

        let offset = target.position - source.position;
        let direction = normalize_or_zero(&offset);

        let relative_speed = (target.velocity - source.velocity).dot(&direction);
        let damper_force = direction * relative_speed * self.damper_constant;
        let spring_force = direction * (offset.norm() - self.length) * self.spring_constant;

        damper_force + spring_force
    }

    /// Accumulate this spring's force into both endpoints' `spring_force`.
    pub fn apply(&self, particles: &mut [MassParticle]) {
        let force = self.force(particles);
        particles[self.source].apply_spring_force(&force);
        particles[self.target].apply_spring_force(&-force);
    }
}
