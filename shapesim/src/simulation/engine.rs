//! Stepping setup for a scenario run
//!
//! Step size, step count and the broad-phase choice used when building and
//! running a `Scenario`

use crate::configuration::config::BroadPhaseConfig;

#[derive(Debug, Clone)]
pub struct Engine {
    pub dt: f64, // seconds per step
    pub steps: usize, // steps run by `Scenario::run`
    pub broad_phase: BroadPhaseConfig, // bounding volume given to each body
    pub leaf_radius: Option<f64>, // sphere tree leaf radius
}

impl Engine {
    pub fn uses_broad_phase(&self) -> bool {
        self.broad_phase != BroadPhaseConfig::None
    }
}
