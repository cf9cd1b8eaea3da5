//! World-space pose of an object

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation. Forward is +Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotation from euler angles in degrees, applied yaw (Y) then pitch (X) then roll (Z)
    pub fn with_euler_degrees(self, euler: Vec3) -> Self {
        self.with_rotation(euler_degrees(euler))
    }

    /// Unit forward direction
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Transform a local-space offset to world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }
}

/// Quaternion from euler angles in degrees
pub fn euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        glam::EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}
