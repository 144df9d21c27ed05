//! The physics world: owner of every body, force field and the collision handler
//!
//! One call to [`PhysicsWorld::update`] runs one fixed-order step:
//! 1. reset and sum spring forces (soft bodies)
//! 2. apply force fields to non-static bodies
//! 3. velocity update: shape matching (rigid) or spring deltas (soft)
//! 4. position update `x += v * dt`
//! 5. collision detection and response
//!
//! followed by the optional velocity clamp and pushing rigid body positions
//! onto their linked scene objects. The step never fails; bad input is
//! logged and skipped.

use tracing::{debug, warn};

use crate::simulation::body::{PhysicalBody, RigidBody};
use crate::simulation::collision::CollisionHandler;
use crate::simulation::forces::{ForceField, ForceSet};
use crate::simulation::integrator::{clamp_velocities, integrate_positions, shape_match};
use crate::simulation::object::SceneObject;
use crate::simulation::params::PhysicsParams;

/// Index of a body registered with a [`PhysicsWorld`]. Bodies are never
/// removed, so a handle stays valid for the world's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub usize);

pub struct PhysicsWorld {
    bodies: Vec<PhysicalBody>,
    forces: ForceSet,
    collision_handler: Option<Box<dyn CollisionHandler>>,
    params: PhysicsParams,
    time: f64, // simulated seconds
    step_count: u64,
    contacts_last_step: usize,
}

impl PhysicsWorld {
    /// Empty world without force fields or collision handling
    pub fn new(params: PhysicsParams) -> Self {
        Self {
            bodies: Vec::new(),
            forces: ForceSet::new(),
            collision_handler: None,
            params,
            time: 0.0,
            step_count: 0,
            contacts_last_step: 0,
        }
    }

    pub fn register_body(&mut self, body: impl Into<PhysicalBody>) -> BodyHandle {
        self.bodies.push(body.into());
        BodyHandle(self.bodies.len() - 1)
    }

    /// Register an empty dynamic rigid body driving `object`. Particles are
    /// added afterwards through [`PhysicsWorld::body_mut`].
    pub fn register_object(&mut self, object: Box<dyn SceneObject>) -> BodyHandle {
        self.register_body(RigidBody::dynamic().with_object(object))
    }

    pub fn add_force_field(&mut self, field: impl ForceField + Send + Sync + 'static) -> &mut Self {
        self.forces.push(field);
        self
    }

    pub fn add_boxed_force_field(&mut self, field: Box<dyn ForceField + Send + Sync>) -> &mut Self {
        self.forces.push_boxed(field);
        self
    }

    /// Install the collision handler, replacing any previous one
    pub fn add_collision_handler(&mut self, handler: impl CollisionHandler + 'static) -> &mut Self {
        self.collision_handler = Some(Box::new(handler));
        self
    }

    /// Advance the world by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            warn!(dt, "rejected time step, world unchanged");
            return;
        }

        // 1. spring forces
        for body in self.bodies.iter_mut() {
            if let PhysicalBody::Soft(soft) = body {
                soft.update_spring_forces();
            }
        }

        // 2. force fields
        self.forces.apply_all(&mut self.bodies, dt);

        // 3. velocities
        for body in self.bodies.iter_mut().filter(|b| !b.is_static()) {
            match body {
                PhysicalBody::Rigid(rigid) => shape_match(rigid, dt, &self.params),
                PhysicalBody::Soft(soft) => {
                    soft.apply_spring_forces(dt);
                }
            }
        }

        // 4. positions
        for body in self.bodies.iter_mut() {
            integrate_positions(body, dt);
        }

        // 5. collisions
        self.contacts_last_step = match self.collision_handler.as_mut() {
            Some(handler) => handler.apply(&mut self.bodies, dt),
            None => 0,
        };

        if let Some(max_speed) = self.params.max_velocity {
            for (index, body) in self.bodies.iter_mut().enumerate() {
                let clamped = clamp_velocities(body, max_speed);
                if clamped > 0 {
                    warn!(body = index, clamped, max_speed, "particle velocities clamped");
                }
            }
        }

        for body in self.bodies.iter_mut() {
            if let PhysicalBody::Rigid(rigid) = body {
                rigid.sync_object();
            }
        }

        self.time += dt;
        self.step_count += 1;
        debug!(
            step = self.step_count,
            time = self.time,
            contacts = self.contacts_last_step,
            "world step"
        );
    }

    /// Run `steps` updates of `params.time_step`
    pub fn run(&mut self, steps: usize) {
        let dt = self.params.time_step;
        for _ in 0..steps {
            self.update(dt);
        }
    }

    pub fn bodies(&self) -> &[PhysicalBody] {
        &self.bodies
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&PhysicalBody> {
        self.bodies.get(handle.0)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut PhysicalBody> {
        self.bodies.get_mut(handle.0)
    }

    pub fn force_fields(&self) -> &ForceSet {
        &self.forces
    }

    pub fn has_collision_handler(&self) -> bool {
        self.collision_handler.is_some()
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Contacts reported by the collision handler during the last step
    pub fn contacts_last_step(&self) -> usize {
        self.contacts_last_step
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsParams::default())
    }
}
