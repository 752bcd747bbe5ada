//! Scene picking: a lightweight hit-testing layer keyed by location id.
//!
//! Picking never touches render meshes. Each location gets a bounding box
//! derived from its footprint, and a cursor click becomes a world-space ray
//! tested against those boxes (nearest hit wins). Terrain clicks resolve
//! against the ground plane and are reported to whatever owns location
//! data — the scene itself never creates locations.

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};
use renderer::OrbitCamera;

use crate::model::CityData;
use crate::visibility::Aabb;

/// A world-space pick ray.
#[derive(Debug, Clone, Copy)]
pub struct PickRay {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl PickRay {
    /// Unproject a cursor position into a world ray.
    pub fn from_screen(camera: &OrbitCamera, cursor: Vec2, viewport: (u32, u32)) -> Self {
        let (width, height) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
        let ndc = Vec2::new(
            cursor.x / width * 2.0 - 1.0,
            1.0 - cursor.y / height * 2.0,
        );

        let inverse = camera.view_projection_matrix().inverse();
        let near = unproject(&inverse, Vec4::new(ndc.x, ndc.y, 0.0, 1.0));
        let far = unproject(&inverse, Vec4::new(ndc.x, ndc.y, 1.0, 1.0));

        Self {
            origin: near,
            direction: (far - near).normalize_or(Vec3::NEG_Y),
        }
    }

    /// Intersection with the ground plane (y = 0), if the ray points at it.
    pub fn ground_hit(&self) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = -self.origin.y / self.direction.y;
        if t < 0.0 {
            return None;
        }
        let hit = self.origin + self.direction * t;
        // Report plan coordinates with y pinned to the ground.
        Some(Vec3::new(hit.x, 0.0, hit.z))
    }

    /// Slab test against an AABB; returns the entry distance.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::MAX;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let min = aabb.min[axis];
            let max = aabb.max[axis];

            if direction.abs() < 1e-8 {
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let (t0, t1) = if inv >= 0.0 {
                ((min - origin) * inv, (max - origin) * inv)
            } else {
                ((max - origin) * inv, (min - origin) * inv)
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

fn unproject(inverse: &Mat4, clip: Vec4) -> Vec3 {
    let world = *inverse * clip;
    world.xyz() / world.w
}

/// A picked location.
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub location_id: String,
    pub distance: f32,
}

/// Hit-testing layer: per-location bounding volumes, rebuilt with the
/// location set and otherwise independent of rendering.
pub struct HitTester {
    boxes: Vec<(String, Aabb)>,
}

impl HitTester {
    pub fn build(city: &CityData) -> Self {
        let boxes = city
            .locations
            .iter()
            .filter(|l| l.position().is_finite())
            .map(|location| {
                let center = location.position();
                let aabb = if location.kind.has_structure() {
                    let half = location.kind.footprint() * 0.5;
                    Aabb::new(
                        center - Vec3::new(half.x, 0.0, half.z),
                        center + Vec3::new(half.x, half.y * 2.0, half.z),
                    )
                } else {
                    // Parks are flat but still clickable.
                    let r = location.kind.flatten_radius();
                    Aabb::new(
                        center - Vec3::new(r, 0.0, r),
                        center + Vec3::new(r, 0.5, r),
                    )
                };
                (location.id.clone(), aabb)
            })
            .collect();
        Self { boxes }
    }

    /// Nearest location along the ray, if any.
    pub fn pick(&self, ray: &PickRay) -> Option<PickHit> {
        let mut best: Option<PickHit> = None;
        for (id, aabb) in &self.boxes {
            if let Some(distance) = ray.intersect_aabb(aabb) {
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(PickHit {
                        location_id: id.clone(),
                        distance,
                    });
                }
            }
        }
        best
    }
}
