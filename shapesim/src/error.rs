//! Construction-time errors.
//!
//! Stepping the simulation never fails; these only surface while building
//! bodies, bounding volumes or scenarios from user input.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A vector field in a scenario had the wrong number of components.
    #[error("`{field}` must have {expected} components, got {got}")]
    InvalidVector {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("particle diameter must be positive and finite, got {0}")]
    InvalidParticleDiameter(f64),

    #[error("sphere tree leaf radius must be positive and finite, got {0}")]
    InvalidLeafRadius(f64),

    #[error("body extents must be positive and finite, got {0:?}")]
    InvalidDimension(Vec<f64>),

    #[error("soft body grid needs at least 2x2 particles, got {rows}x{columns}")]
    InvalidGrid { rows: usize, columns: usize },

    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
}
