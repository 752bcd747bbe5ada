//! Orbit camera, camera poses, and frustum extraction.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

/// A complete camera pose: where the camera sits, what it looks at, and its
/// vertical field of view. Transitions interpolate between two of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
}

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3, fov_degrees: f32) -> Self {
        Self {
            position,
            target,
            fov_degrees,
        }
    }

    /// Linear interpolation of position, target, and fov.
    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
            fov_degrees: self.fov_degrees + (other.fov_degrees - self.fov_degrees) * t,
        }
    }
}

/// Orbit camera: yaw/pitch/distance around a look-at target.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Slow spin around the target (cinematic preset).
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: 0.6,
            distance: 35.0,
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
            auto_rotate: false,
            auto_rotate_speed: 0.1,
        }
    }
}

impl OrbitCamera {
    const MIN_DISTANCE: f32 = 5.0;
    const MAX_DISTANCE: f32 = 200.0;
    const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.05;
    const MIN_PITCH: f32 = 0.02;

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// World-space eye position derived from yaw/pitch/distance.
    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.cos(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.sin(),
            )
    }

    /// Rotate around the target (mouse drag).
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw += delta_x;
        self.pitch = (self.pitch + delta_y).clamp(Self::MIN_PITCH, Self::MAX_PITCH);
    }

    /// Pan the target on the ground plane, screen-relative.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let forward = Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin());
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        let scale = self.distance * 0.002;
        self.target += right * delta_x * scale + forward * delta_y * scale;
    }

    /// Dolly toward/away from the target.
    pub fn zoom(&mut self, amount: f32) {
        self.distance =
            (self.distance * (1.0 - amount * 0.1)).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    /// Advance auto-rotation, if enabled.
    pub fn update(&mut self, dt: f32) {
        if self.auto_rotate {
            self.yaw += self.auto_rotate_speed * dt;
        }
    }

    /// Current pose (eye, target, fov).
    pub fn pose(&self) -> CameraPose {
        CameraPose::new(self.eye(), self.target, self.fov_degrees)
    }

    /// Adopt a pose: recover yaw/pitch/distance from the eye-target offset.
    pub fn set_pose(&mut self, pose: &CameraPose) {
        self.target = pose.target;
        self.fov_degrees = pose.fov_degrees;
        let offset = pose.position - pose.target;
        let distance = offset.length();
        if distance > 1e-4 {
            self.distance = distance.clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
            let horizontal = (offset.x * offset.x + offset.z * offset.z).sqrt();
            self.pitch = offset.y.atan2(horizontal).clamp(Self::MIN_PITCH, Self::MAX_PITCH);
            if horizontal > 1e-4 {
                self.yaw = offset.z.atan2(offset.x);
            }
        }
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    /// Get the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// View frustum as six inward-facing planes, extracted from a
/// view-projection matrix.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Planes as (normal, d); a point is inside when `n·p + d >= 0`.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix (Gribb/Hartmann).
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);

        let mut planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r2,      // near (wgpu depth 0..1)
            r3 - r2, // far
        ];
        for p in &mut planes {
            let len = p.xyz().length();
            if len > 1e-6 {
                *p /= len;
            }
        }
        Self { planes }
    }

    /// Sphere-frustum intersection test.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| p.xyz().dot(center) + p.w >= -radius)
    }

    /// AABB-frustum intersection test (positive-vertex trick).
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|p| {
            let n = p.xyz();
            let v = Vec3::new(
                if n.x >= 0.0 { max.x } else { min.x },
                if n.y >= 0.0 { max.y } else { min.y },
                if n.z >= 0.0 { max.z } else { min.z },
            );
            n.dot(v) + p.w >= 0.0
        })
    }
}

/// Camera uniform data for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4], // w unused, padding
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 4],
        }
    }

    pub fn update(&mut self, camera: &OrbitCamera) {
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        let eye = camera.eye();
        self.position = [eye.x, eye.y, eye.z, 1.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_orbits_at_distance() {
        let camera = OrbitCamera {
            target: Vec3::new(1.0, 0.0, 2.0),
            distance: 10.0,
            ..Default::default()
        };
        let d = camera.eye().distance(camera.target);
        assert!((d - 10.0).abs() < 1e-4);
    }

    #[test]
    fn pose_roundtrip_recovers_eye() {
        let mut camera = OrbitCamera::default();
        let pose = CameraPose::new(Vec3::new(30.0, 30.0, 30.0), Vec3::ZERO, 50.0);
        camera.set_pose(&pose);
        assert!((camera.eye() - pose.position).length() < 0.01);
        assert_eq!(camera.fov_degrees, 50.0);
    }

    #[test]
    fn frustum_accepts_point_ahead_rejects_behind() {
        let camera = OrbitCamera {
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.5,
            distance: 30.0,
            ..Default::default()
        };
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        // The look-at target is inside; a point far behind the eye is not.
        assert!(frustum.intersects_sphere(Vec3::ZERO, 1.0));
        let eye = camera.eye();
        let behind = eye + (eye - camera.target).normalize() * 50.0;
        assert!(!frustum.intersects_sphere(behind, 1.0));
    }

    #[test]
    fn frustum_aabb_matches_sphere_result_for_target() {
        let camera = OrbitCamera::default();
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        assert!(frustum.intersects_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)));
    }

    #[test]
    fn pose_lerp_hits_both_ends() {
        let a = CameraPose::new(Vec3::ZERO, Vec3::ZERO, 50.0);
        let b = CameraPose::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 4.0), 70.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        let mid = a.lerp(&b, 0.5);
        assert!((mid.position.x - 5.0).abs() < 1e-5);
        assert!((mid.fov_degrees - 60.0).abs() < 1e-4);
    }
}
