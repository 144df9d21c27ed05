//! Build fully-initialized physics scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - engine settings (`Engine`)
//! - a `PhysicsWorld` holding every body at t = 0, the configured force
//!   fields and a penalty collision handler built from the parameters
//!
//! Validation happens here, once; stepping the world afterwards never fails.

use tracing::info;

use crate::configuration::config::{BodyConfig, BodyKindConfig, BroadPhaseConfig, ForceFieldConfig, ScenarioConfig};
use crate::error::PhysicsError;
use crate::simulation::body::{PhysicalBody, RigidBody, SoftBody};
use crate::simulation::bounding::BoundingVolume;
use crate::simulation::collision::PenaltyCollisionHandler;
use crate::simulation::engine::Engine;
use crate::simulation::forces::{AirResistance, ForceField, Gravity, UniformAcceleration};
use crate::simulation::math::NVec3;
use crate::simulation::params::PhysicsParams;
use crate::simulation::world::PhysicsWorld;

/// Runtime bundle constructed from a [`ScenarioConfig`]
pub struct Scenario {
    pub engine: Engine,
    pub world: PhysicsWorld,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, PhysicsError> {
        // Engine (runtime) from EngineConfig
        let e_cfg = cfg.engine;
        if !(e_cfg.dt.is_finite() && e_cfg.dt > 0.0) {
            return Err(PhysicsError::InvalidTimeStep(e_cfg.dt));
        }
        let engine = Engine {
            dt: e_cfg.dt,
            steps: e_cfg.steps,
            broad_phase: e_cfg.broad_phase,
            leaf_radius: e_cfg.leaf_radius,
        };

        // Parameters (runtime) from ParametersConfig
        let params = cfg.parameters.to_params(engine.dt, engine.uses_broad_phase());

        let mut world = PhysicsWorld::new(params.clone());

        for f_cfg in &cfg.force_fields {
            world.add_boxed_force_field(build_force_field(f_cfg, &params)?);
        }

        for b_cfg in &cfg.bodies {
            world.register_body(build_body(b_cfg, &engine, &params)?);
        }

        world.add_collision_handler(PenaltyCollisionHandler::from_params(&params));

        info!(
            bodies = world.bodies().len(),
            force_fields = world.force_fields().len(),
            dt = engine.dt,
            steps = engine.steps,
            "scenario built"
        );

        Ok(Self { engine, world })
    }

    /// Advance one step of `engine.dt`
    pub fn step(&mut self) {
        self.world.update(self.engine.dt);
    }

    /// Run all `engine.steps` steps
    pub fn run(&mut self) {
        for _ in 0..self.engine.steps {
            self.step();
        }
    }
}

/// Map a length-3 vector field to `NVec3`
pub fn vec3(field: &'static str, v: &[f64]) -> Result<NVec3, PhysicsError> {
    match v {
        [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
        _ => Err(PhysicsError::InvalidVector {
            field,
            expected: 3,
            got: v.len(),
        }),
    }
}

fn build_force_field(
    cfg: &ForceFieldConfig,
    params: &PhysicsParams,
) -> Result<Box<dyn ForceField + Send + Sync>, PhysicsError> {
    let field: Box<dyn ForceField + Send + Sync> = match cfg {
        ForceFieldConfig::Gravity { g } => Box::new(Gravity {
            g: g.unwrap_or(params.gravity),
        }),
        ForceFieldConfig::Uniform { acceleration } => Box::new(UniformAcceleration {
            acceleration: vec3("acceleration", acceleration)?,
        }),
        ForceFieldConfig::AirResistance { coefficient } => Box::new(AirResistance {
            coefficient: *coefficient,
        }),
    };
    Ok(field)
}

fn build_body(cfg: &BodyConfig, engine: &Engine, params: &PhysicsParams) -> Result<PhysicalBody, PhysicsError> {
    let position = vec3("position", &cfg.position)?;
    let diameter = cfg.particle_diameter;

    let mut body: PhysicalBody = match cfg.kind {
        BodyKindConfig::Rigid => {
            let base = if cfg.is_static { RigidBody::fixed() } else { RigidBody::dynamic() };
            let base = base.at(position);
            let body = match cfg.dimension.as_slice() {
                [w, h, d] => base.with_box(NVec3::new(*w, *h, *d), diameter)?,
                [w, h] => base.with_rectangle(*w, *h, diameter)?,
                other => {
                    return Err(PhysicsError::InvalidVector {
                        field: "dimension",
                        expected: 3,
                        got: other.len(),
                    })
                }
            };
            // tree leaves only follow translation; moving bodies get an enclosing sphere
            let body = match engine.broad_phase {
                BroadPhaseConfig::None => body,
                BroadPhaseConfig::Tree if cfg.is_static => {
                    body.with_sphere_tree(engine.leaf_radius.unwrap_or(diameter))?
                }
                BroadPhaseConfig::Spheres | BroadPhaseConfig::Tree => body.with_bounding_sphere(),
            };
            body.into()
        }
        BodyKindConfig::Soft => {
            let (w, h) = match cfg.dimension.as_slice() {
                [w, h] => (*w, *h),
                other => {
                    return Err(PhysicsError::InvalidVector {
                        field: "dimension",
                        expected: 2,
                        got: other.len(),
                    })
                }
            };
            let mut soft =
                SoftBody::from_rectangle(w, h, diameter, position, params.spring_constant, params.damper_constant)?;
            soft.set_static(cfg.is_static);
            // a deforming grid only ever gets an enclosing sphere
            if engine.broad_phase == BroadPhaseConfig::None {
                soft.bounding = BoundingVolume::None;
            }
            soft.into()
        }
    };

    if let Some(mass) = cfg.mass {
        body.set_mass(mass);
    }
    if let Some(velocity) = &cfg.velocity {
        body.set_velocity(vec3("velocity", velocity)?);
    }
    Ok(body)
}
