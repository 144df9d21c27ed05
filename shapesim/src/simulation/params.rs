//! Tunable constants for one physics world
//!
//! Units are simulation units: lengths in particle diameters (typically 1),
//! time in seconds, particle mass fixed at 1 so forces act as accelerations.
//!
//! The penalty collision response is conditionally stable: `stiffness`,
//! `damping` and the step size were tuned together for steps between 1/60 s
//! and 1/20 s. Raising any one of them alone can make contacts explode.

use crate::simulation::collision::ResponseCurve;

#[derive(Debug, Clone)]
pub struct PhysicsParams {
    pub time_step: f64, // suggested dt for drivers, seconds
    pub gravity: f64, // downward acceleration used by scenario gravity fields, units/s^2
    pub alpha: f64, // shape matching stiffness in [0, 1], 1 = fully rigid
    pub rounding_digits: i32, // decimal digits kept around rotation extraction
    pub correct_reflections: bool, // flip det = -1 rotations into proper ones
    pub stiffness: f64, // penalty spring constant K, 1/s^2
    pub damping: f64, // penalty damper constant B, 1/s
    pub friction: f64, // velocity-proportional friction on colliding particles, 1/s
    pub response_curve: ResponseCurve, // penetration depth -> penalty magnitude
    pub broad_phase: bool, // prune body pairs by bounding volumes
    pub spring_constant: f64, // soft body spring constant
    pub damper_constant: f64, // soft body damper constant
    pub max_velocity: Option<f64>, // per-particle speed clamp, logged when hit
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            gravity: 9.81,
            alpha: 1.0,
            rounding_digits: crate::simulation::math::DEFAULT_ROUNDING_DIGITS,
            correct_reflections: false,
            stiffness: 500.0,
            damping: 5.0,
            friction: 0.5,
            response_curve: ResponseCurve::Linear,
            broad_phase: true,
            spring_constant: 400.0,
            damper_constant: 2.0,
            max_velocity: None,
        }
    }
}
