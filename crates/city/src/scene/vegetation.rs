//! Instanced vegetation: trees (trunk + foliage batches), grass, bushes,
//! and flowers.
//!
//! Placement runs the scatter engine twice per kind — dense disks around
//! parks, then a sparse pass over the open field — always against the
//! shared obstacle field, so nothing grows inside a building or on a road.
//! Foliage, grass, and flowers get per-frame wind sway: a base sinusoid
//! phased by world position plus a slower gust term, with amplitude set by
//! the weather. Trunks stay static.

use glam::Quat;
use procgen::{id_tag, mix_seed, scatter_disk, scatter_rect, ObstacleField, PlacedInstance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::InstanceData;

use crate::model::{hex_color, lerp_color, CityData, LocationKind, Weather};

pub const TRUNK_COLOR: [f32; 4] = [0.29, 0.22, 0.16, 1.0];

const TREE_COLORS: [&str; 3] = ["#2d5a27", "#22c55e", "#16a34a"];
const GRASS_COLORS: [&str; 3] = ["#3a5a40", "#2e7d32", "#4caf50"];
const BUSH_COLORS: [&str; 3] = ["#22c55e", "#16a34a", "#15803d"];
const FLOWER_COLORS: [&str; 5] = ["#f472b6", "#ec4899", "#db2777", "#fbbf24", "#f59e0b"];

/// Height of the foliage ball above the trunk base.
pub const FOLIAGE_HEIGHT: f32 = 1.2;

/// Wind amplitude by weather: rain blows hardest, snow drifts, clear idles.
pub fn wind_amplitude(weather: Weather) -> f32 {
    match weather {
        Weather::Rain => 0.15,
        Weather::Snow => 0.08,
        Weather::Clear => 0.05,
    }
}

/// Adjust a base plant color for the weather.
fn weather_plant_color(base: [f32; 4], weather: Weather) -> [f32; 4] {
    match weather {
        Weather::Clear => base,
        Weather::Snow => lerp_color(base, [1.0, 1.0, 1.0, 1.0], 0.3),
        Weather::Rain => [
            (base[0] * 1.2).min(1.0),
            (base[1] * 1.2).min(1.0),
            (base[2] * 1.2).min(1.0),
            base[3],
        ],
    }
}

/// One vegetation kind's placements plus its color per instance.
#[derive(Debug, Default)]
struct VegetationBatch {
    placements: Vec<PlacedInstance>,
    colors: Vec<[f32; 4]>,
    /// Instance buffer rewritten in place by the sway pass.
    instances: Vec<InstanceData>,
}

impl VegetationBatch {
    fn push(&mut self, placement: PlacedInstance, color: [f32; 4]) {
        self.placements.push(placement);
        self.colors.push(color);
        self.instances.push(InstanceData::new(
            placement.transform().to_matrix().to_cols_array_2d(),
            color,
        ));
    }

    fn len(&self) -> usize {
        self.placements.len()
    }
}

/// All vegetation batches for the active city.
#[derive(Debug, Default)]
pub struct VegetationLayer {
    trees: VegetationBatch,
    grass: VegetationBatch,
    bushes: VegetationBatch,
    flowers: VegetationBatch,
    /// Static trunk instances (no sway).
    trunk_instances: Vec<InstanceData>,
}

/// Scatter counts: (around each park, across the open field).
const TREE_COUNTS: (usize, usize) = (20, 50);
const GRASS_COUNTS: (usize, usize) = (100, 200);
const BUSH_COUNTS: (usize, usize) = (15, 30);
const FLOWER_COUNTS: (usize, usize) = (30, 50);

const PARK_RADIUS: f32 = 8.0;
const PARK_CLEARANCE: f32 = 1.0;
const OPEN_HALF_EXTENT: f32 = 90.0;
const OPEN_CLEARANCE: f32 = 3.0;

impl VegetationLayer {
    pub fn build(city: &CityData, field: &ObstacleField, weather: Weather, seed: u64) -> Self {
        let mut layer = VegetationLayer::default();

        let kinds: [(&str, (usize, usize), &[&str]); 4] = [
            ("trees", TREE_COUNTS, &TREE_COLORS),
            ("grass", GRASS_COUNTS, &GRASS_COLORS),
            ("bushes", BUSH_COUNTS, &BUSH_COLORS),
            ("flowers", FLOWER_COUNTS, &FLOWER_COLORS),
        ];

        for (kind, (park_count, open_count), palette) in kinds {
            let mut placements = Vec::new();

            for location in &city.locations {
                if location.kind != LocationKind::Park {
                    continue;
                }
                let mut rng = StdRng::seed_from_u64(mix_seed(
                    seed,
                    id_tag(&location.id).wrapping_add(id_tag(kind)),
                ));
                placements.extend(scatter_disk(
                    field,
                    location.plan_position(),
                    PARK_RADIUS,
                    park_count,
                    PARK_CLEARANCE,
                    (0.8, 1.2),
                    &mut rng,
                ));
            }

            let mut open_rng = StdRng::seed_from_u64(mix_seed(seed, id_tag(kind)));
            placements.extend(scatter_rect(
                field,
                OPEN_HALF_EXTENT,
                open_count,
                OPEN_CLEARANCE,
                (0.6, 1.0),
                &mut open_rng,
            ));

            let mut color_rng = StdRng::seed_from_u64(mix_seed(seed, id_tag(kind) ^ 0x5eed));
            let batch = match kind {
                "trees" => &mut layer.trees,
                "grass" => &mut layer.grass,
                "bushes" => &mut layer.bushes,
                _ => &mut layer.flowers,
            };
            for placement in placements {
                let base = hex_color(palette[color_rng.gen_range(0..palette.len())])
                    .unwrap_or([0.2, 0.6, 0.3, 1.0]);
                batch.push(placement, weather_plant_color(base, weather));
            }
        }

        layer.trunk_instances = layer
            .trees
            .placements
            .iter()
            .map(|p| {
                InstanceData::new(p.transform().to_matrix().to_cols_array_2d(), TRUNK_COLOR)
            })
            .collect();

        layer
    }

    /// Advance wind sway, rewriting the animated instance buffers in place.
    /// The composed rotation is yaw, then a tilt whose angle is the base
    /// sinusoid plus a slower gust.
    pub fn update_sway(&mut self, time: f32, weather: Weather) {
        let amplitude = wind_amplitude(weather);
        for batch in [&mut self.grass, &mut self.flowers, &mut self.bushes] {
            Self::sway_batch(batch, time, amplitude, 0.0);
        }
        // Foliage sways around the trunk top, so lift before tilting.
        Self::sway_batch(&mut self.trees, time, amplitude, FOLIAGE_HEIGHT);
    }

    fn sway_batch(batch: &mut VegetationBatch, time: f32, amplitude: f32, lift: f32) {
        for (i, placement) in batch.placements.iter().enumerate() {
            let phase = placement.position.x * 0.1;
            let gust = (time * 0.3 + placement.position.z * 0.05).sin() * amplitude * 0.5;
            let sway = (time + phase).sin() * amplitude + gust;

            let mut transform = placement.transform();
            transform.position.y += lift * placement.scale;
            transform.rotation = Quat::from_rotation_x(sway) * transform.rotation;
            batch.instances[i].model = transform.to_matrix().to_cols_array_2d();
            batch.instances[i].color = batch.colors[i];
        }
    }

    pub fn trunk_instances(&self) -> &[InstanceData] {
        &self.trunk_instances
    }

    pub fn foliage_instances(&self) -> &[InstanceData] {
        &self.trees.instances
    }

    pub fn grass_instances(&self) -> &[InstanceData] {
        &self.grass.instances
    }

    pub fn bush_instances(&self) -> &[InstanceData] {
        &self.bushes.instances
    }

    pub fn flower_instances(&self) -> &[InstanceData] {
        &self.flowers.instances
    }

    pub fn total_count(&self) -> usize {
        self.trees.len() + self.grass.len() + self.bushes.len() + self.flowers.len()
    }
}

/// Build the shared obstacle field: building circles plus road strips.
pub fn build_obstacle_field(city: &CityData) -> ObstacleField {
    let mut field = ObstacleField::new();
    for location in &city.locations {
        field.add_circle(location.plan_position(), location.kind.obstacle_radius());
    }
    for (road, from, to) in city.active_roads() {
        field.add_segment(
            from.plan_position(),
            to.plan_position(),
            road.class.obstacle_half_width(),
        );
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn vegetation_avoids_buildings_and_roads() {
        let city = CityData::demo();
        let field = build_obstacle_field(&city);
        let layer = VegetationLayer::build(&city, &field, Weather::Clear, 11);
        assert!(layer.total_count() > 0);

        let active = city.active_roads();
        for instance in layer
            .trees
            .placements
            .iter()
            .chain(layer.bushes.placements.iter())
        {
            let p = Vec2::new(instance.position.x, instance.position.z);
            for location in &city.locations {
                let clearance = p.distance(location.plan_position())
                    - location.kind.obstacle_radius();
                assert!(clearance >= PARK_CLEARANCE - 1e-4);
            }
            for (road, from, to) in &active {
                let a = from.plan_position();
                let b = to.plan_position();
                let seg = b - a;
                let t = ((p - a).dot(seg) / seg.length_squared()).clamp(0.0, 1.0);
                let d = p.distance(a + seg * t) - road.class.obstacle_half_width();
                assert!(d >= PARK_CLEARANCE - 1e-4);
            }
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        let city = CityData::demo();
        let field = build_obstacle_field(&city);
        let a = VegetationLayer::build(&city, &field, Weather::Clear, 11);
        let b = VegetationLayer::build(&city, &field, Weather::Clear, 11);
        assert_eq!(a.total_count(), b.total_count());
        for (x, y) in a.trees.placements.iter().zip(&b.trees.placements) {
            assert_eq!(x.position, y.position);
        }
    }

    #[test]
    fn trunks_match_foliage_count_and_stay_static() {
        let city = CityData::demo();
        let field = build_obstacle_field(&city);
        let mut layer = VegetationLayer::build(&city, &field, Weather::Rain, 4);
        assert_eq!(layer.trunk_instances().len(), layer.foliage_instances().len());

        let trunks_before = layer.trunk_instances().to_vec();
        let foliage_before: Vec<[[f32; 4]; 4]> = layer
            .foliage_instances()
            .iter()
            .map(|i| i.model)
            .collect();
        layer.update_sway(1.7, Weather::Rain);
        // Sway rewrites foliage matrices but never trunks.
        for (a, b) in trunks_before.iter().zip(layer.trunk_instances()) {
            assert_eq!(a.model, b.model);
        }
        assert!(layer
            .foliage_instances()
            .iter()
            .zip(&foliage_before)
            .any(|(now, before)| now.model != *before));
    }

    #[test]
    fn wind_amplitude_orders_by_weather() {
        assert!(wind_amplitude(Weather::Rain) > wind_amplitude(Weather::Snow));
        assert!(wind_amplitude(Weather::Snow) > wind_amplitude(Weather::Clear));
    }

    #[test]
    fn empty_city_grows_open_field_only() {
        let city = CityData {
            name: String::new(),
            locations: Vec::new(),
            roads: Vec::new(),
        };
        let field = build_obstacle_field(&city);
        let layer = VegetationLayer::build(&city, &field, Weather::Clear, 1);
        // No parks, so only the open-field pass contributes; nothing fails.
        assert!(layer.total_count() > 0);
        assert_eq!(
            layer.total_count(),
            TREE_COUNTS.1 + GRASS_COUNTS.1 + BUSH_COUNTS.1 + FLOWER_COUNTS.1
        );
    }
}
