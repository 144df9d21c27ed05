//! Seam to the renderable scene object a body may drive.
//!
//! The physics core never draws anything. A rigid body can hold a
//! [`SceneObject`] so its motion moves the object, and so particle geometry
//! stored in object-local coordinates can be brought into world space.

use nalgebra::UnitQuaternion;

use crate::simulation::math::{NMat4, NVec3};

/// What the physics core needs from a renderable object.
pub trait SceneObject: std::fmt::Debug {
    fn position(&self) -> NVec3;
    fn set_position(&mut self, position: NVec3);
    /// Local-to-world matrix
    fn transformation_matrix(&self) -> NMat4;
}

/// Translation, rotation and scale, composed as `T * R * S`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: NVec3,
    pub rotation: UnitQuaternion<f64>,
    pub scale: NVec3,
}

impl Transform {
    pub fn at(position: NVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f64>) -> Self {
        self.rotation = rotation;
        self
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: NVec3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: NVec3::repeat(1.0),
        }
    }
}

impl SceneObject for Transform {
    fn position(&self) -> NVec3 {
        self.position
    }

    fn set_position(&mut self, position: NVec3) {
        self.position = position;
    }

    fn transformation_matrix(&self) -> NMat4 {
        NMat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * NMat4::new_nonuniform_scaling(&self.scale)
    }
}
