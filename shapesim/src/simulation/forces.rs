//! Force fields acting on whole bodies
//!
//! A field turns a time step into velocity deltas on a body's particles
//! (particle mass is 1, so force and acceleration coincide). The world keeps
//! its fields in a [`ForceSet`] and applies them to every non-static body.

use crate::simulation::body::PhysicalBody;
use crate::simulation::math::NVec3;

/// Collection of force fields applied in registration order
#[derive(Default)]
pub struct ForceSet {
    fields: Vec<Box<dyn ForceField + Send + Sync>>,
}

impl ForceSet {
    /// Create an empty force set
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field, builder style
    pub fn with(mut self, field: impl ForceField + Send + Sync + 'static) -> Self {
        self.fields.push(Box::new(field));
        self
    }

    pub fn push(&mut self, field: impl ForceField + Send + Sync + 'static) {
        self.fields.push(Box::new(field));
    }

    pub fn push_boxed(&mut self, field: Box<dyn ForceField + Send + Sync>) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply every field to every body; static bodies are skipped
    pub fn apply_all(&self, bodies: &mut [PhysicalBody], dt: f64) {
        for body in bodies.iter_mut().filter(|b| !b.is_static()) {
            for field in &self.fields {
                field.apply(body, dt);
            }
        }
    }
}

/// Anything that changes a body's particle velocities over `dt`
pub trait ForceField {
    fn apply(&self, body: &mut PhysicalBody, dt: f64);
}

/// Constant downward (-y) acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    pub g: f64, // units/s^2
}

impl Default for Gravity {
    fn default() -> Self {
        Self { g: 9.81 }
    }
}

impl ForceField for Gravity {
    fn apply(&self, body: &mut PhysicalBody, dt: f64) {
        body.apply_force(NVec3::new(0.0, -self.g * dt, 0.0));
    }
}

/// Constant acceleration in an arbitrary direction (wind, tilted gravity)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformAcceleration {
    pub acceleration: NVec3,
}

impl ForceField for UniformAcceleration {
    fn apply(&self, body: &mut PhysicalBody, dt: f64) {
        body.apply_force(self.acceleration * dt);
    }
}

/// Linear drag: every particle loses `coefficient * v * dt` of its velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirResistance {
    pub coefficient: f64, // 1/s
}

impl ForceField for AirResistance {
    fn apply(&self, body: &mut PhysicalBody, dt: f64) {
        // never reverse the velocity on a large step
        let keep = (1.0 - self.coefficient * dt).max(0.0);
        for particle in body.mass_particles_mut() {
            particle.velocity *= keep;
        }
    }
}
