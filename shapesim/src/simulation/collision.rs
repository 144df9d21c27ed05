//! Collision detection and penalty-force response.
//!
//! Detection runs in two levels:
//! - broad phase: bounding volumes of a body pair must overlap
//! - narrow phase: every particle of A against every particle of B as spheres
//!
//! The narrow phase is O(|A| × |B|) per surviving pair and dominates the step
//! cost once bodies hold more than a few dozen particles.
//!
//! Response does not move particles apart. It injects a spring-plus-damper
//! force along the contact normal and lets later steps resolve the overlap.

use tracing::trace;

use crate::simulation::body::PhysicalBody;
use crate::simulation::math::{normalize_or_zero, NVec3};
use crate::simulation::params::PhysicsParams;
use crate::simulation::particle::MassParticle;

/// Overlap between two spheres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Unit normal from the second center toward the first
    pub direction: NVec3,
    /// Penetration depth, 0 when disjoint
    pub magnitude: f64,
}

impl Collision {
    pub fn none() -> Self {
        Self {
            direction: NVec3::zeros(),
            magnitude: 0.0,
        }
    }

    pub fn is_colliding(&self) -> bool {
        self.magnitude > 0.0
    }
}

/// Test two spheres given by center and radius.
///
/// Coincident centers have no defined normal; +Y is used so the pair can
/// still be pushed apart.
pub fn circle_collision(p1: &NVec3, p2: &NVec3, r1: f64, r2: f64) -> Collision {
    let offset = p1 - p2;
    let magnitude = (r1 + r2) - offset.norm();
    if magnitude <= 0.0 {
        return Collision::none();
    }

    let mut direction = normalize_or_zero(&offset);
    if direction == NVec3::zeros() {
        direction = NVec3::y();
    }
    Collision { direction, magnitude }
}

pub fn detect_inter_particle_collision(a: &MassParticle, b: &MassParticle) -> Collision {
    circle_collision(&a.position, &b.position, a.radius, b.radius)
}

/// One overlapping particle pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub body_a: usize,
    pub particle_a: usize,
    pub body_b: usize,
    pub particle_b: usize,
    pub collision: Collision,
}

/// Do the world-space bounding volumes of two bodies overlap?
pub fn broad_phase_overlap(a: &PhysicalBody, b: &PhysicalBody) -> bool {
    a.world_bounding().overlaps(&b.world_bounding())
}

/// Append every overlapping particle pair between bodies `ia` and `ib`.
pub fn narrow_phase(ia: usize, a: &PhysicalBody, ib: usize, b: &PhysicalBody, out: &mut Vec<Contact>) {
    let positions_b: Vec<NVec3> = (0..b.mass_particles().len()).map(|j| b.world_position(j)).collect();

    for (i, particle_a) in a.mass_particles().iter().enumerate() {
        let pa = a.world_position(i);
        for (j, particle_b) in b.mass_particles().iter().enumerate() {
            let collision = circle_collision(&pa, &positions_b[j], particle_a.radius, particle_b.radius);
            if collision.is_colliding() {
                out.push(Contact {
                    body_a: ia,
                    particle_a: i,
                    body_b: ib,
                    particle_b: j,
                    collision,
                });
            }
        }
    }
}

/// All particle contacts between distinct bodies.
///
/// Pairs where both bodies are static are skipped since neither can respond.
pub fn detect_collisions(bodies: &[PhysicalBody], use_broad_phase: bool) -> Vec<Contact> {
    let mut contacts = Vec::new();
    let n = bodies.len();

    for i in 0..n {
        let a = &bodies[i];
        if a.mass_particles().is_empty() {
            continue;
        }
        for j in (i + 1)..n {
            let b = &bodies[j];
            if b.mass_particles().is_empty() || (a.is_static() && b.is_static()) {
                continue;
            }
            if use_broad_phase && !broad_phase_overlap(a, b) {
                continue;
            }
            narrow_phase(i, a, j, b, &mut contacts);
        }
    }

    contacts
}

/// Maps penetration depth to penalty magnitude.
#[derive(Debug, Clone, Copy, Default)]
pub enum ResponseCurve {
    /// `m`
    #[default]
    Linear,
    /// `m²`
    Squared,
    /// `(1 + m)^n - 1`, punishes deep overlaps super-linearly
    StiffenedPower { exponent: f64 },
    Custom(fn(f64) -> f64),
}

impl ResponseCurve {
    pub fn evaluate(&self, magnitude: f64) -> f64 {
        match self {
            ResponseCurve::Linear => magnitude,
            ResponseCurve::Squared => magnitude * magnitude,
            ResponseCurve::StiffenedPower { exponent } => (1.0 + magnitude).powf(*exponent) - 1.0,
            ResponseCurve::Custom(curve) => curve(magnitude),
        }
    }
}

/// Resolves contacts after positions have been integrated.
pub trait CollisionHandler {
    /// Detect and respond to contacts between `bodies`; returns the contact count.
    fn apply(&mut self, bodies: &mut [PhysicalBody], dt: f64) -> usize;
}

/// Penalty-method contact response.
#[derive(Debug, Clone)]
pub struct PenaltyCollisionHandler {
    pub stiffness: f64,
    pub damping: f64,
    pub friction: f64,
    pub curve: ResponseCurve,
    pub broad_phase: bool,
}

impl PenaltyCollisionHandler {
    pub fn new(stiffness: f64, damping: f64, friction: f64) -> Self {
        Self {
            stiffness,
            damping,
            friction,
            curve: ResponseCurve::Linear,
            broad_phase: true,
        }
    }

    pub fn from_params(params: &PhysicsParams) -> Self {
        Self {
            stiffness: params.stiffness,
            damping: params.damping,
            friction: params.friction,
            curve: params.response_curve,
            broad_phase: params.broad_phase,
        }
    }

    pub fn with_curve(mut self, curve: ResponseCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_broad_phase(mut self, broad_phase: bool) -> Self {
        self.broad_phase = broad_phase;
        self
    }

    /// Force on one particle of a contact.
    ///
    /// `into` is the unit vector from this particle toward the other one.
    /// `into * (-K f(m) - B dot(v, into))` pushes away and damps approach
    /// speed; `-FRICTION * v` bleeds off the remaining motion.
    pub fn contact_force(&self, into: &NVec3, magnitude: f64, velocity: &NVec3) -> NVec3 {
        let normal = -self.stiffness * self.curve.evaluate(magnitude) - self.damping * velocity.dot(into);
        into * normal - velocity * self.friction
    }
}

impl Default for PenaltyCollisionHandler {
    fn default() -> Self {
        Self::from_params(&PhysicsParams::default())
    }
}

impl CollisionHandler for PenaltyCollisionHandler {
    fn apply(&mut self, bodies: &mut [PhysicalBody], dt: f64) -> usize {
        for body in bodies.iter_mut() {
            for particle in body.mass_particles_mut() {
                particle.collided = false;
            }
        }

        let contacts = detect_collisions(bodies, self.broad_phase);

        for contact in &contacts {
            let n = contact.collision.direction; // B -> A
            let m = contact.collision.magnitude;

            let va = bodies[contact.body_a].mass_particles()[contact.particle_a].velocity;
            let vb = bodies[contact.body_b].mass_particles()[contact.particle_b].velocity;

            let fa = self.contact_force(&-n, m, &va);
            let fb = self.contact_force(&n, m, &vb);

            respond(&mut bodies[contact.body_a], contact.particle_a, fa * dt);
            respond(&mut bodies[contact.body_b], contact.particle_b, fb * dt);
        }

        trace!(contacts = contacts.len(), "collision pass");
        contacts.len()
    }
}

/// Flag the particle and, unless its body is static, add the velocity delta
fn respond(body: &mut PhysicalBody, index: usize, delta: NVec3) {
    let is_static = body.is_static();
    let particle = &mut body.mass_particles_mut()[index];
    particle.collided = true;
    if !is_static {
        particle.apply_force(&delta);
    }
}
