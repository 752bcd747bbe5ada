//! Derived-scene construction and ownership.
//!
//! `CityScene` owns every structure derived from the city snapshot: merged
//! meshes, instance batches, road splines, the spatial index, and the
//! terrain. All of it is memoized on a `SceneKey` — (city revision,
//! weather, lighting bucket) — so UI-only state changes never trigger a
//! rebuild, and a real change rebuilds everything synchronously before the
//! next frame draws. Each buffer has exactly one owner here.

pub mod buildings;
pub mod roads;
pub mod streets;
pub mod vegetation;
pub mod windows;

use glam::Vec3;
use renderer::{InstanceData, Mesh, MeshData, Renderer, Vertex};
use std::collections::HashSet;

use crate::environment::WeatherParticles;
use crate::model::{CityData, Weather};
use crate::picking::HitTester;
use crate::traffic::TrafficSystem;
use crate::visibility::{LodLevel, VisibilityIndex, VisibleLocation};

use buildings::{selection_ring, BuildingMeshes};
use procgen::{FlattenDisc, FlattenStrip, TerrainConfig, TerrainGenerator};
use roads::RoadNetwork;
use streets::StreetLayer;
use vegetation::{build_obstacle_field, VegetationLayer};
use windows::{lighting_bucket, WindowBatches};

/// Identity of the inputs the derived scene is a pure function of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneKey {
    pub city_revision: u64,
    pub weather: Weather,
    pub lighting_bucket: u8,
}

impl SceneKey {
    pub fn new(city_revision: u64, weather: Weather, hour: f32) -> Self {
        Self {
            city_revision,
            weather,
            lighting_bucket: lighting_bucket(hour),
        }
    }
}

/// Terrain colors by weather.
fn terrain_color(weather: Weather) -> [f32; 4] {
    match weather {
        Weather::Clear => crate::model::hex_color("#4a9375").unwrap_or([0.29, 0.58, 0.46, 1.0]),
        Weather::Rain => crate::model::hex_color("#3d7260").unwrap_or([0.24, 0.45, 0.38, 1.0]),
        Weather::Snow => crate::model::hex_color("#e2e8f0").unwrap_or([0.89, 0.91, 0.94, 1.0]),
    }
}

/// Static unit primitives shared by the instanced batches.
pub struct PrimitiveMeshes {
    pub unit_cube: Mesh,
    pub unit_sphere: Mesh,
    pub trunk: Mesh,
    pub foliage: Mesh,
    pub grass_blade: Mesh,
    pub bush: Mesh,
    pub flower: Mesh,
    pub bulb: Mesh,
}

impl PrimitiveMeshes {
    pub fn upload(device: &wgpu::Device) -> Self {
        let white = [1.0, 1.0, 1.0, 1.0];
        Self {
            unit_cube: MeshData::unit_box(Vec3::ONE, white).upload(device),
            unit_sphere: MeshData::sphere(1.0, 12, 8, white).upload(device),
            trunk: MeshData::cylinder(0.15, 0.1, 1.2, 6, white).upload(device),
            foliage: MeshData::sphere(0.5, 10, 7, white).upload(device),
            grass_blade: MeshData::cylinder(0.05, 0.0, 0.3, 4, white).upload(device),
            bush: MeshData::sphere(0.3, 8, 6, white).upload(device),
            flower: MeshData::unit_box(Vec3::new(0.04, 0.12, 0.04), white).upload(device),
            bulb: MeshData::sphere(0.15, 8, 6, white).upload(device),
        }
    }
}

/// GPU uploads of the merged static meshes.
pub struct StaticMeshes {
    pub terrain: Mesh,
    pub walls: Mesh,
    pub roofs: Mesh,
    pub park_pads: Mesh,
    pub road_shadow: Mesh,
    pub road_surface: Mesh,
    pub road_markings: Mesh,
    pub sidewalks: Mesh,
    pub lamps: Mesh,
    pub benches: Mesh,
    pub trash_cans: Mesh,
    pub signs: Mesh,
    pub light_poles: Mesh,
}

/// The whole derived scene.
pub struct CityScene {
    key: SceneKey,
    pub windows: WindowBatches,
    pub vegetation: VegetationLayer,
    pub streets: StreetLayer,
    pub road_network: RoadNetwork,
    pub traffic: TrafficSystem,
    pub particles: WeatherParticles,
    pub visibility: VisibilityIndex,
    pub hit_tester: HitTester,
    pub meshes: StaticMeshes,

    // Per-frame scratch for the window LOD/selection path.
    lit_scratch: Vec<InstanceData>,
    dark_scratch: Vec<InstanceData>,
    cached_high_slots: Vec<usize>,
    scratch_valid: bool,

    selection_mesh: Option<Mesh>,
    selection_slot: Option<usize>,
}

impl CityScene {
    /// Build every derived structure for the given inputs. Synchronous: by
    /// the time this returns, the scene is fully consistent with the city.
    pub fn build(
        renderer: &Renderer,
        city: &CityData,
        key: SceneKey,
        hour: f32,
        seed: u64,
    ) -> Self {
        log::info!(
            "rebuilding scene: {} locations, {} roads, weather {:?}",
            city.locations.len(),
            city.roads.len(),
            key.weather
        );

        let field = build_obstacle_field(city);
        let building_meshes = BuildingMeshes::build(city, key.weather);
        let windows = WindowBatches::build(city, hour, seed);
        let vegetation = VegetationLayer::build(city, &field, key.weather, seed);
        let streets = StreetLayer::build(city, &field, seed);
        let road_network = RoadNetwork::build(city, key.weather, seed);
        let traffic = TrafficSystem::new(&road_network.paths, &road_network.roundabouts, seed);
        let particles = WeatherParticles::new(key.weather, seed);
        let visibility = VisibilityIndex::build(city);
        let hit_tester = HitTester::build(city);

        let terrain = build_terrain(city, key.weather, seed);

        let device = &renderer.device;
        let meshes = StaticMeshes {
            terrain: terrain.upload(device),
            walls: building_meshes.walls.upload(device),
            roofs: building_meshes.roofs.upload(device),
            park_pads: building_meshes.park_pads.upload(device),
            road_shadow: road_network.shadow.upload(device),
            road_surface: road_network.surface.upload(device),
            road_markings: road_network.markings.upload(device),
            sidewalks: road_network.sidewalks.upload(device),
            lamps: streets.lamps.upload(device),
            benches: streets.benches.upload(device),
            trash_cans: streets.trash_cans.upload(device),
            signs: streets.signs.upload(device),
            light_poles: traffic.light_pole_mesh().upload(device),
        };

        Self {
            key,
            windows,
            vegetation,
            streets,
            road_network,
            traffic,
            particles,
            visibility,
            hit_tester,
            meshes,
            lit_scratch: Vec::new(),
            dark_scratch: Vec::new(),
            cached_high_slots: Vec::new(),
            scratch_valid: false,
            selection_mesh: None,
            selection_slot: None,
        }
    }

    pub fn key(&self) -> SceneKey {
        self.key
    }

    /// Advance every animated subsystem by one frame. Geometry is never
    /// rebuilt here; only the animated instance buffers are rewritten.
    pub fn update_animation(&mut self, dt: f32, time: f32, hour: f32, is_night: bool) {
        self.vegetation.update_sway(time, self.key.weather);
        self.streets.update_bulbs(time, is_night);
        self.traffic
            .update(&self.road_network.paths, dt, time, hour);
        self.particles.update(dt);
    }

    /// Refresh the selection highlight ring when the selection changes.
    pub fn sync_selection(
        &mut self,
        renderer: &Renderer,
        city: &CityData,
        selected_slot: Option<usize>,
    ) {
        if self.selection_slot == selected_slot {
            return;
        }
        self.selection_slot = selected_slot;
        self.scratch_valid = false;
        self.selection_mesh = selected_slot
            .and_then(|slot| city.locations.get(slot))
            .map(|location| selection_ring(location).upload(&renderer.device));
    }

    pub fn selection_mesh(&self) -> Option<&Mesh> {
        self.selection_mesh.as_ref()
    }

    pub fn selection_slot(&self) -> Option<usize> {
        self.selection_slot
    }

    /// Window batches for this frame, gated by LOD: only buildings in the
    /// high-detail tier (< 20 units) show windows; beyond that the bare
    /// merged box is the cheap representation. The filter recomputes only
    /// when the high-LOD set changes; the selection pulse rewrites just the
    /// selected building's windows.
    pub fn window_instances(
        &mut self,
        visible: &[VisibleLocation],
        time: f32,
    ) -> (&[InstanceData], &[InstanceData]) {
        let mut high_slots: Vec<usize> = visible
            .iter()
            .filter(|v| v.lod == LodLevel::High)
            .map(|v| v.slot)
            .collect();
        high_slots.sort_unstable();

        if !self.scratch_valid || high_slots != self.cached_high_slots {
            let set: HashSet<usize> = high_slots.iter().copied().collect();
            self.lit_scratch.clear();
            self.dark_scratch.clear();
            let mut pulse_scratch = Vec::new();
            let lit = self
                .windows
                .lit_instances(self.selection_slot, time, &mut pulse_scratch);
            for (instance, window) in lit.iter().zip(self.windows.lit.iter()) {
                if set.contains(&window.location_slot) {
                    self.lit_scratch.push(*instance);
                }
            }
            for (instance, window) in self
                .windows
                .dark_instances()
                .iter()
                .zip(self.windows.dark.iter())
            {
                if set.contains(&window.location_slot) {
                    self.dark_scratch.push(*instance);
                }
            }
            self.cached_high_slots = high_slots;
            self.scratch_valid = true;
        } else if let Some(selected) = self.selection_slot {
            // Same visible set; only the pulse needs refreshing.
            let pulse = 1.0 + (time * 4.0).sin() * 0.1;
            let set: HashSet<usize> = self.cached_high_slots.iter().copied().collect();
            if set.contains(&selected) {
                let mut cursor = 0;
                for window in self.windows.lit.iter() {
                    if !set.contains(&window.location_slot) {
                        continue;
                    }
                    if window.location_slot == selected {
                        let mut t = window.transform;
                        t.scale *= pulse;
                        self.lit_scratch[cursor].model = t.to_matrix().to_cols_array_2d();
                    }
                    cursor += 1;
                }
            }
        }

        (&self.lit_scratch, &self.dark_scratch)
    }
}

/// Generate the terrain height field for the active city and convert it to
/// a renderable mesh tinted for the weather.
fn build_terrain(city: &CityData, weather: Weather, seed: u64) -> MeshData {
    let discs = city
        .locations
        .iter()
        .filter(|l| l.position().is_finite())
        .map(|l| FlattenDisc {
            center: l.plan_position(),
            radius: l.kind.flatten_radius(),
        })
        .collect();
    let strips = city
        .active_roads()
        .iter()
        .map(|(road, from, to)| FlattenStrip {
            start: from.plan_position(),
            end: to.plan_position(),
            half_width: road.class.flatten_half_width(),
        })
        .collect();

    let generator = TerrainGenerator::new(
        TerrainConfig {
            seed,
            ..Default::default()
        },
        discs,
        strips,
    );
    let data = generator.generate();

    let color = terrain_color(weather);
    MeshData {
        vertices: data
            .vertices
            .iter()
            .map(|v| Vertex::new(v.position, v.normal, color))
            .collect(),
        indices: data.indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_key_tracks_lighting_bucket_not_exact_hour() {
        let a = SceneKey::new(1, Weather::Clear, 10.0);
        let b = SceneKey::new(1, Weather::Clear, 15.0);
        let night = SceneKey::new(1, Weather::Clear, 23.0);
        assert_eq!(a, b);
        assert_ne!(a, night);
        // Weather changes the key even at the same hour.
        assert_ne!(a, SceneKey::new(1, Weather::Rain, 10.0));
        // A structural change always changes the key.
        assert_ne!(a, SceneKey::new(2, Weather::Clear, 10.0));
    }

    #[test]
    fn terrain_mesh_is_flat_under_roads_and_buildings() {
        let city = CityData::demo();
        let mesh = build_terrain(&city, Weather::Clear, 77);
        assert!(!mesh.is_empty());
        // Vertices near the plaza park center should be at ground level.
        let near_plaza: Vec<&Vertex> = mesh
            .vertices
            .iter()
            .filter(|v| {
                let dx = v.position[0];
                let dz = v.position[2];
                (dx * dx + dz * dz).sqrt() < 0.75
            })
            .collect();
        assert!(!near_plaza.is_empty());
        // Park + two main-road ends overlap here; the strongest falloff
        // wins, so elevation is nearly damped out.
        for v in near_plaza {
            assert!(v.position[1].abs() < 0.6);
        }
        // Far corner is untouched terrain; some relief must survive there.
        let relief = mesh
            .vertices
            .iter()
            .map(|v| v.position[1].abs())
            .fold(0.0_f32, f32::max);
        assert!(relief > 0.5);
    }

    #[test]
    fn terrain_tint_follows_weather() {
        let city = CityData::demo();
        let clear = build_terrain(&city, Weather::Clear, 77);
        let snow = build_terrain(&city, Weather::Snow, 77);
        assert!(snow.vertices[0].color[0] > clear.vertices[0].color[0]);
        // Same seed, same geometry.
        assert_eq!(clear.vertices.len(), snow.vertices.len());
        assert_eq!(clear.vertices[0].position, snow.vertices[0].position);
    }
}
