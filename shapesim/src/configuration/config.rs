//! Configuration types for loading physics scenarios from YAML.
//!
//! A scenario is a thin, `serde`-deserializable description of a world:
//!
//! - [`EngineConfig`]     – step size, step count and broad-phase choice
//! - [`ParametersConfig`] – optional overrides of [`PhysicsParams`]
//! - [`ForceFieldConfig`] – force fields registered with the world
//! - [`BodyConfig`]       – rigid and soft bodies with their initial state
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! A box dropped onto a static floor:
//!
//! ```yaml
//! engine:
//!   dt: 0.016666            # seconds per step
//!   steps: 600              # steps run by the driver
//!   broad_phase: spheres    # none | spheres | tree
//!   leaf_radius: 1.0        # only used by `tree`
//!
//! parameters:               # every field optional
//!   alpha: 1.0
//!   stiffness: 500.0
//!   damping: 5.0
//!   friction: 0.5
//!   response_curve: linear  # linear | squared | stiffened_power
//!   response_exponent: 4.0  # exponent for stiffened_power
//!
//! force_fields:
//!   - type: gravity
//!     g: 9.81
//!   - type: air_resistance
//!     coefficient: 0.1
//!
//! bodies:
//!   - kind: rigid
//!     position: [0.0, 5.0, 0.0]
//!     dimension: [2.0, 2.0, 2.0]
//!     particle_diameter: 1.0
//!   - kind: rigid
//!     static: true
//!     position: [0.0, 0.0, 0.0]
//!     dimension: [20.0, 1.0, 20.0]
//!     particle_diameter: 1.0
//! ```
//!
//! [`PhysicsParams`]: crate::simulation::params::PhysicsParams

use serde::Deserialize;

use crate::simulation::collision::ResponseCurve;
use crate::simulation::params::PhysicsParams;

/// Which bounding volume scenario bodies get
/// broad_phase: "none" | "spheres" | "tree"
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhaseConfig {
    None, // no bounding volumes, every body pair reaches the narrow phase
    #[default]
    Spheres, // one enclosing sphere per body
    Tree, // sphere tree split down to `leaf_radius`
}

/// High-level engine configuration
#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    pub dt: f64, // seconds per step
    pub steps: usize, // number of steps the driver runs
    #[serde(default)]
    pub broad_phase: BroadPhaseConfig,
    pub leaf_radius: Option<f64>, // sphere tree leaf radius, defaults to one particle diameter
}

/// Penetration response curve name
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCurveConfig {
    Linear,
    Squared,
    StiffenedPower,
}

/// Overrides for [`PhysicsParams`]; missing fields keep their defaults
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ParametersConfig {
    pub alpha: Option<f64>, // shape matching stiffness
    pub rounding_digits: Option<i32>, // rotation extraction precision
    pub correct_reflections: Option<bool>, // flip reflections into proper rotations
    pub stiffness: Option<f64>, // penalty K
    pub damping: Option<f64>, // penalty B
    pub friction: Option<f64>, // contact friction
    pub response_curve: Option<ResponseCurveConfig>,
    pub response_exponent: Option<f64>, // exponent for `stiffened_power`, default 4
    pub spring_constant: Option<f64>, // soft body springs
    pub damper_constant: Option<f64>, // soft body dampers
    pub max_velocity: Option<f64>, // per-particle speed clamp
}

impl ParametersConfig {
    /// Apply the overrides on top of `PhysicsParams::default()`
    pub fn to_params(&self, time_step: f64, broad_phase: bool) -> PhysicsParams {
        let d = PhysicsParams::default();
        let response_curve = match self.response_curve {
            None => d.response_curve,
            Some(ResponseCurveConfig::Linear) => ResponseCurve::Linear,
            Some(ResponseCurveConfig::Squared) => ResponseCurve::Squared,
            Some(ResponseCurveConfig::StiffenedPower) => ResponseCurve::StiffenedPower {
                exponent: self.response_exponent.unwrap_or(4.0),
            },
        };

        PhysicsParams {
            time_step,
            gravity: d.gravity,
            alpha: self.alpha.unwrap_or(d.alpha),
            rounding_digits: self.rounding_digits.unwrap_or(d.rounding_digits),
            correct_reflections: self.correct_reflections.unwrap_or(d.correct_reflections),
            stiffness: self.stiffness.unwrap_or(d.stiffness),
            damping: self.damping.unwrap_or(d.damping),
            friction: self.friction.unwrap_or(d.friction),
            response_curve,
            broad_phase,
            spring_constant: self.spring_constant.unwrap_or(d.spring_constant),
            damper_constant: self.damper_constant.unwrap_or(d.damper_constant),
            max_velocity: self.max_velocity.or(d.max_velocity),
        }
    }
}

/// One force field, tagged by `type`
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceFieldConfig {
    Gravity { g: Option<f64> }, // downward, default 9.81
    Uniform { acceleration: Vec<f64> }, // constant acceleration [x, y, z]
    AirResistance { coefficient: f64 }, // linear drag, 1/s
}

/// Rigid bodies are shape matched, soft bodies are spring grids
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyKindConfig {
    #[default]
    Rigid,
    Soft,
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    #[serde(default)]
    pub kind: BodyKindConfig,
    pub position: Vec<f64>, // center [x, y, z]
    #[serde(default)]
    pub velocity: Option<Vec<f64>>, // initial velocity [x, y, z], default at rest
    pub dimension: Vec<f64>, // rigid: [w, h, d] box or [w, h] rectangle; soft: [w, h]
    pub particle_diameter: f64,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    pub mass: Option<f64>,
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub force_fields: Vec<ForceFieldConfig>,
    pub bodies: Vec<BodyConfig>,
}

impl ScenarioConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
