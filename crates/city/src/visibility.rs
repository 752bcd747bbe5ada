//! Visibility and level-of-detail selection.
//!
//! Locations live in an octree that is rebuilt wholesale whenever the
//! location set changes (never mutated incrementally). Every frame the
//! camera frustum queries the octree, and each surviving candidate is
//! classified by camera distance into a LOD tier. The per-frame cost scales
//! with the visible set, not the whole city.

use glam::Vec3;
use renderer::Frustum;

use crate::model::{CityData, Location};

/// LOD tier by camera distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodLevel {
    High,
    Medium,
    Low,
    Hidden,
}

impl LodLevel {
    /// Fixed distance thresholds: high < 20, medium < 50, low < 100.
    pub fn classify(distance: f32) -> Self {
        if distance < 20.0 {
            LodLevel::High
        } else if distance < 50.0 {
            LodLevel::Medium
        } else if distance < 100.0 {
            LodLevel::Low
        } else {
            LodLevel::Hidden
        }
    }

    /// Whether the cheap building mesh should be used at this tier.
    pub fn uses_low_detail(&self) -> bool {
        !matches!(self, LodLevel::High)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// One entry in the spatial index: a location slot plus its bounds.
#[derive(Debug, Clone, Copy)]
struct OctreeEntry {
    slot: usize,
    position: Vec3,
    radius: f32,
}

const MAX_OBJECTS: usize = 10;
const MAX_DEPTH: u32 = 5;

/// Octree node. Leaves hold up to `MAX_OBJECTS` entries before subdividing
/// into eight children (until `MAX_DEPTH`).
#[derive(Debug)]
struct OctreeNode {
    bounds: Aabb,
    entries: Vec<OctreeEntry>,
    children: Vec<OctreeNode>,
}

impl OctreeNode {
    fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, entry: OctreeEntry, depth: u32) {
        if !self.bounds.contains(entry.position) {
            return;
        }

        if self.is_leaf() && (self.entries.len() < MAX_OBJECTS || depth >= MAX_DEPTH) {
            self.entries.push(entry);
            return;
        }

        if self.is_leaf() {
            self.subdivide();
            for existing in std::mem::take(&mut self.entries) {
                for child in &mut self.children {
                    child.insert(existing, depth + 1);
                }
            }
        }

        for child in &mut self.children {
            child.insert(entry, depth + 1);
        }
    }

    fn subdivide(&mut self) {
        let center = self.bounds.center();
        let (min, max) = (self.bounds.min, self.bounds.max);
        for xi in 0..2 {
            for yi in 0..2 {
                for zi in 0..2 {
                    let child_min = Vec3::new(
                        if xi == 0 { min.x } else { center.x },
                        if yi == 0 { min.y } else { center.y },
                        if zi == 0 { min.z } else { center.z },
                    );
                    let child_max = Vec3::new(
                        if xi == 0 { center.x } else { max.x },
                        if yi == 0 { center.y } else { max.y },
                        if zi == 0 { center.z } else { max.z },
                    );
                    self.children
                        .push(OctreeNode::new(Aabb::new(child_min, child_max)));
                }
            }
        }
    }

    fn query(&self, frustum: &Frustum, out: &mut Vec<OctreeEntry>) {
        if !frustum.intersects_aabb(self.bounds.min, self.bounds.max) {
            return;
        }
        if self.is_leaf() {
            out.extend_from_slice(&self.entries);
        } else {
            for child in &self.children {
                child.query(frustum, out);
            }
        }
    }
}

/// One location's visibility result for this frame.
#[derive(Debug, Clone)]
pub struct VisibleLocation {
    pub slot: usize,
    pub id: String,
    pub distance: f32,
    pub lod: LodLevel,
}

/// The spatial index over the active location set.
pub struct VisibilityIndex {
    root: OctreeNode,
    ids: Vec<String>,
}

impl VisibilityIndex {
    /// Build the octree for a location set. Called once per structural
    /// change, not per frame.
    pub fn build(city: &CityData) -> Self {
        let (mut min, mut max) = city.bounds();
        // Padding so border objects never straddle the root bounds.
        min -= Vec3::splat(10.0);
        max += Vec3::splat(10.0);

        let mut root = OctreeNode::new(Aabb::new(min, max));
        for (slot, location) in city.locations.iter().enumerate() {
            let position = location.position();
            if !position.is_finite() {
                continue;
            }
            root.insert(
                OctreeEntry {
                    slot,
                    position,
                    radius: bounding_radius(location),
                },
                0,
            );
        }

        Self {
            root,
            ids: city.locations.iter().map(|l| l.id.clone()).collect(),
        }
    }

    /// Frustum-and-distance query. Returns every non-hidden location with
    /// its LOD tier; the hidden tier is filtered out here.
    pub fn visible_set(&self, frustum: &Frustum, camera_position: Vec3) -> Vec<VisibleLocation> {
        let mut candidates = Vec::new();
        self.root.query(frustum, &mut candidates);

        let mut visible = Vec::with_capacity(candidates.len());
        for entry in candidates {
            if !frustum.intersects_sphere(entry.position, entry.radius) {
                continue;
            }
            let distance = camera_position.distance(entry.position);
            let lod = LodLevel::classify(distance);
            if lod == LodLevel::Hidden {
                continue;
            }
            visible.push(VisibleLocation {
                slot: entry.slot,
                id: self.ids[entry.slot].clone(),
                distance,
                lod,
            });
        }
        visible
    }
}

fn bounding_radius(location: &Location) -> f32 {
    let f = location.kind.footprint();
    // Half-diagonal of the footprint box, padded a little for decoration.
    (f * 0.5).length() + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::OrbitCamera;

    #[test]
    fn lod_thresholds_match_contract() {
        assert_eq!(LodLevel::classify(5.0), LodLevel::High);
        assert_eq!(LodLevel::classify(20.0), LodLevel::Medium);
        assert_eq!(LodLevel::classify(49.9), LodLevel::Medium);
        assert_eq!(LodLevel::classify(50.0), LodLevel::Low);
        assert_eq!(LodLevel::classify(100.0), LodLevel::Hidden);
        assert!(LodLevel::classify(25.0).uses_low_detail());
        assert!(!LodLevel::classify(10.0).uses_low_detail());
    }

    #[test]
    fn octree_subdivides_past_leaf_capacity() {
        // 40 locations forces subdivision (leaf cap is 10).
        let mut city = CityData::demo();
        city.locations.clear();
        city.roads.clear();
        for i in 0..40 {
            city.locations.push(crate::model::Location {
                id: format!("b{}", i),
                name: String::new(),
                description: String::new(),
                kind: crate::model::LocationKind::Building,
                position: [(i % 8) as f32 * 10.0 - 35.0, 0.0, (i / 8) as f32 * 10.0 - 25.0],
                color: None,
                zone: None,
            });
        }
        let index = VisibilityIndex::build(&city);
        assert!(!index.root.is_leaf());
    }

    #[test]
    fn visible_set_excludes_objects_behind_camera() {
        let mut city = CityData::demo();
        city.locations.clear();
        city.roads.clear();
        for (id, x) in [("ahead", 0.0_f32), ("behind", 400.0)] {
            city.locations.push(crate::model::Location {
                id: id.to_string(),
                name: String::new(),
                description: String::new(),
                kind: crate::model::LocationKind::Building,
                position: [x, 0.0, 0.0],
                color: None,
                zone: None,
            });
        }

        let mut camera = OrbitCamera::default();
        camera.target = Vec3::ZERO;
        camera.yaw = 0.0;
        camera.pitch = 0.5;
        camera.distance = 30.0;

        let index = VisibilityIndex::build(&city);
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        let visible = index.visible_set(&frustum, camera.eye());

        assert!(visible.iter().any(|v| v.id == "ahead"));
        assert!(visible.iter().all(|v| v.id != "behind"));
    }

    #[test]
    fn distant_objects_classify_hidden_and_drop_out() {
        let mut city = CityData::demo();
        city.locations.clear();
        city.roads.clear();
        city.locations.push(crate::model::Location {
            id: "near".to_string(),
            name: String::new(),
            description: String::new(),
            kind: crate::model::LocationKind::Building,
            position: [0.0, 0.0, 0.0],
            color: None,
            zone: None,
        });

        let mut camera = OrbitCamera::default();
        camera.distance = 150.0;
        let index = VisibilityIndex::build(&city);
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        let visible = index.visible_set(&frustum, camera.eye());
        // 150 units away: beyond the hidden threshold even if in frustum.
        assert!(visible.is_empty());
    }

    #[test]
    fn empty_city_builds_and_queries() {
        let city = CityData {
            name: String::new(),
            locations: Vec::new(),
            roads: Vec::new(),
        };
        let index = VisibilityIndex::build(&city);
        let camera = OrbitCamera::default();
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        assert!(index.visible_set(&frustum, camera.eye()).is_empty());
    }
}
