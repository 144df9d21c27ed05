pub mod simulation;
pub mod configuration;
pub mod benchmark;
pub mod error;

pub use error::PhysicsError;

pub use simulation::math::{NVec3, NMat3, NMat4};
pub use simulation::particle::{MassParticle, Spring};
pub use simulation::bounding::{Sphere, SphereTree, BoundingVolume};
pub use simulation::object::{SceneObject, Transform};
pub use simulation::body::{RigidBody, SoftBody, PhysicalBody, BodyKind, ParticleFrame};
pub use simulation::params::PhysicsParams;
pub use simulation::forces::{ForceField, ForceSet, Gravity, UniformAcceleration, AirResistance};
pub use simulation::collision::{Collision, CollisionHandler, PenaltyCollisionHandler, ResponseCurve};
pub use simulation::world::{PhysicsWorld, BodyHandle};
pub use simulation::scenario::Scenario;

pub use configuration::config::{EngineConfig, ParametersConfig, ForceFieldConfig, BodyConfig, ScenarioConfig};

pub use benchmark::benchmark::{bench_collision, bench_step};
