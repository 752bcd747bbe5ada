//! Merged building geometry.
//!
//! All structural buildings collapse into two static meshes — walls and
//! roof caps — so the whole district costs two draw calls regardless of
//! building count. Parks contribute flat green pads to a third merged mesh.
//! Wall tint shifts with the weather; a selected building gets a ground
//! ring highlight rebuilt only when the selection changes.

use engine_core::Transform;
use glam::Vec3;
use renderer::MeshData;

use crate::model::{lerp_color, CityData, Location, Weather};

const ROOF_COLOR: [f32; 4] = [0.29, 0.33, 0.41, 1.0];
const PARK_PAD_COLOR: [f32; 4] = [0.29, 0.87, 0.5, 1.0];
const SELECTION_COLOR: [f32; 4] = [0.23, 0.51, 0.96, 1.0];
const SNOW_TINT: [f32; 4] = [0.55, 0.7, 0.91, 1.0];

/// Weather-adjusted wall color. Snow pushes walls toward a cold light
/// tint; rain darkens them slightly for the wet look.
pub fn weather_wall_color(base: [f32; 4], weather: Weather) -> [f32; 4] {
    match weather {
        Weather::Clear => base,
        Weather::Rain => [base[0] * 0.8, base[1] * 0.8, base[2] * 0.85, base[3]],
        Weather::Snow => lerp_color(base, SNOW_TINT, 0.5),
    }
}

/// The merged static building meshes.
#[derive(Debug, Default)]
pub struct BuildingMeshes {
    pub walls: MeshData,
    pub roofs: MeshData,
    pub park_pads: MeshData,
}

impl BuildingMeshes {
    /// Merge every structural building into the wall/roof buffers.
    pub fn build(city: &CityData, weather: Weather) -> Self {
        let mut meshes = BuildingMeshes::default();

        for location in &city.locations {
            let center = location.position();
            if !center.is_finite() {
                continue;
            }
            if !location.kind.has_structure() {
                meshes.park_pads.merge(&park_pad(location));
                continue;
            }

            let dims = location.kind.footprint();
            let color = weather_wall_color(location.wall_color(), weather);

            meshes.walls.push_box(
                dims,
                &Transform::from_position(center + Vec3::new(0.0, dims.y / 2.0, 0.0)),
                color,
            );

            // Roof cap slightly overhangs the walls.
            meshes.roofs.push_box(
                Vec3::new(dims.x + 0.2, 0.2, dims.z + 0.2),
                &Transform::from_position(center + Vec3::new(0.0, dims.y + 0.1, 0.0)),
                ROOF_COLOR,
            );
        }

        meshes
    }
}

fn park_pad(location: &Location) -> MeshData {
    let mut pad = MeshData::disk(
        location.kind.flatten_radius(),
        32,
        0.02,
        PARK_PAD_COLOR,
    );
    let center = location.position();
    // Disk is built at the origin; move it under the park.
    for v in &mut pad.vertices {
        v.position[0] += center.x;
        v.position[2] += center.z;
    }
    pad
}

/// Ground ring highlighting the selected building.
pub fn selection_ring(location: &Location) -> MeshData {
    let dims = location.kind.footprint();
    let mut ring = MeshData::ring(dims.x + 0.5, dims.x + 0.8, 32, 0.1, SELECTION_COLOR);
    let center = location.position();
    for v in &mut ring.vertices {
        v.position[0] += center.x;
        v.position[2] += center.z;
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationKind;

    #[test]
    fn buildings_merge_into_fixed_buffers() {
        let city = CityData::demo();
        let meshes = BuildingMeshes::build(&city, Weather::Clear);
        let structural = city
            .locations
            .iter()
            .filter(|l| l.kind.has_structure())
            .count();
        // One box is 24 vertices; walls and roofs hold one box per building.
        assert_eq!(meshes.walls.vertices.len(), structural * 24);
        assert_eq!(meshes.roofs.vertices.len(), structural * 24);
        assert!(!meshes.park_pads.is_empty());
    }

    #[test]
    fn wall_heights_follow_footprints() {
        let mut city = CityData::demo();
        city.locations.retain(|l| l.id == "hotel");
        let meshes = BuildingMeshes::build(&city, Weather::Clear);
        let top = meshes
            .walls
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert!((top - LocationKind::Hotel.footprint().y).abs() < 1e-4);
    }

    #[test]
    fn weather_changes_wall_tint() {
        let base = [0.4, 0.6, 0.9, 1.0];
        assert_eq!(weather_wall_color(base, Weather::Clear), base);
        let rain = weather_wall_color(base, Weather::Rain);
        assert!(rain[0] < base[0]);
        let snow = weather_wall_color(base, Weather::Snow);
        assert!(snow[0] > base[0]);
    }

    #[test]
    fn empty_city_builds_empty_meshes() {
        let city = CityData {
            name: String::new(),
            locations: Vec::new(),
            roads: Vec::new(),
        };
        let meshes = BuildingMeshes::build(&city, Weather::Snow);
        assert!(meshes.walls.is_empty());
        assert!(meshes.roofs.is_empty());
        assert!(meshes.park_pads.is_empty());
    }

    #[test]
    fn selection_ring_surrounds_footprint() {
        let city = CityData::demo();
        let hotel = city.locations.iter().find(|l| l.id == "hotel").unwrap();
        let ring = selection_ring(hotel);
        assert!(!ring.is_empty());
        let dims = hotel.kind.footprint();
        for v in &ring.vertices {
            let dx = v.position[0] - hotel.position[0];
            let dz = v.position[2] - hotel.position[2];
            let r = (dx * dx + dz * dz).sqrt();
            assert!(r >= dims.x + 0.5 - 1e-4 && r <= dims.x + 0.8 + 1e-4);
        }
    }
}
