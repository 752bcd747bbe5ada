//! Transform component for positioning scene objects and instances.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Transform for a ground object: position plus a yaw around +Y and a
    /// uniform scale. This is the shape every scatter-placed instance uses.
    pub fn from_position_yaw_scale(position: Vec3, yaw: f32, scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
            scale: Vec3::splat(scale),
        }
    }

    /// Transform with a non-uniform scale and no rotation (boxes, window quads).
    pub fn from_position_scale(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale,
        }
    }

    /// Create the model matrix for this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Yaw the transform so +Z follows a travel direction on the ground
    /// plane. Used to orient vehicles along their road tangent.
    pub fn face_direction(&mut self, direction: Vec3) {
        if direction.length_squared() > 1e-8 {
            let yaw = direction.x.atan2(direction.z);
            self.rotation = Quat::from_rotation_y(yaw);
        }
    }
}

/// Raw transform data for GPU upload (instance data).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<&Transform> for TransformRaw {
    fn from(transform: &Transform) -> Self {
        Self {
            model: transform.to_matrix().to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_scale_transform_composes() {
        let t = Transform::from_position_yaw_scale(Vec3::new(1.0, 0.0, 2.0), 0.5, 1.5);
        let m = t.to_matrix();
        let origin = m.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn face_direction_points_along_tangent() {
        let mut t = Transform::default();
        t.face_direction(Vec3::new(1.0, 0.0, 0.0));
        let f = t.rotation * Vec3::Z;
        assert!((f - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn face_direction_ignores_degenerate_input() {
        let mut t = Transform::default();
        t.face_direction(Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }
}
