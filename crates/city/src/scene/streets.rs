//! Street furniture: lamps, benches, trash cans, and sign posts.
//!
//! Furniture is placed along roads (regular spacing, both sides, facing the
//! road) and around parks and civic buildings, then merged per type into one
//! static mesh. Street lamps additionally own an instanced emissive bulb
//! batch that lights up at night with a gentle flicker — the only per-frame
//! work in this module.

use engine_core::Transform;
use glam::Vec3;
use procgen::{id_tag, mix_seed, scatter_along_segment, ObstacleField, PlacedInstance};
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::{InstanceData, MeshData};

use crate::model::{hex_color, CityData, LocationKind};

const LAMP_SPACING: f32 = 12.0;
const LAMP_OFFSET: f32 = 2.5;
const BENCH_SPACING: f32 = 20.0;
const BENCH_OFFSET: f32 = 3.0;
const CAN_SPACING: f32 = 20.0;
const CAN_OFFSET: f32 = 2.5;
const SIGN_SPACING: f32 = 30.0;
const SIGN_OFFSET: f32 = 2.5;
const FURNITURE_CLEARANCE: f32 = 0.5;

/// Height of the bulb above the lamp base.
pub const BULB_HEIGHT: f32 = 3.2;

const POLE_COLOR: [f32; 4] = [0.4, 0.4, 0.4, 1.0];
const BULB_DAY_COLOR: [f32; 4] = [0.94, 0.94, 0.94, 1.0];
const BULB_NIGHT_COLOR: [f32; 4] = [1.0, 0.84, 0.0, 1.0];
const BENCH_COLOR: [f32; 4] = [0.55, 0.27, 0.07, 1.0];

/// The merged street-furniture meshes plus the animated bulb batch.
#[derive(Debug, Default)]
pub struct StreetLayer {
    pub lamps: MeshData,
    pub benches: MeshData,
    pub trash_cans: MeshData,
    pub signs: MeshData,
    bulb_placements: Vec<PlacedInstance>,
    bulb_instances: Vec<InstanceData>,
}

impl StreetLayer {
    pub fn build(city: &CityData, field: &ObstacleField, seed: u64) -> Self {
        let mut layer = StreetLayer::default();

        let lamp_spots = roadside_spots(city, field, seed, "lamps", LAMP_SPACING, LAMP_OFFSET);
        let bench_spots = roadside_spots(city, field, seed, "benches", BENCH_SPACING, BENCH_OFFSET);
        let can_spots = roadside_spots(city, field, seed, "cans", CAN_SPACING, CAN_OFFSET);
        let sign_spots = roadside_spots(city, field, seed, "signs", SIGN_SPACING, SIGN_OFFSET);

        // Civic frontage: lamps ring parks, libraries, and museums; benches
        // cluster there too.
        let mut plaza_lamps = Vec::new();
        let mut plaza_benches = Vec::new();
        for location in &city.locations {
            if !matches!(
                location.kind,
                LocationKind::Park | LocationKind::Library | LocationKind::Museum
            ) {
                continue;
            }
            let center = location.position();
            for i in 0..8 {
                let angle = i as f32 / 8.0 * std::f32::consts::TAU;
                let p = center + Vec3::new(angle.cos() * 6.0, 0.0, angle.sin() * 6.0);
                plaza_lamps.push(PlacedInstance {
                    position: p,
                    yaw: angle + std::f32::consts::PI,
                    scale: 1.0,
                });
                if i % 2 == 0 {
                    let bench = center + Vec3::new(angle.cos() * 4.0, 0.0, angle.sin() * 4.0);
                    plaza_benches.push(PlacedInstance {
                        position: bench,
                        yaw: angle + std::f32::consts::PI,
                        scale: 1.0,
                    });
                }
            }
        }

        let lamp_primitive = lamp_pole();
        for spot in lamp_spots.iter().chain(plaza_lamps.iter()) {
            layer.lamps.append_transformed(&lamp_primitive, &spot.transform());
            layer.bulb_placements.push(*spot);
        }

        let bench_primitive = bench();
        for spot in bench_spots.iter().chain(plaza_benches.iter()) {
            layer
                .benches
                .append_transformed(&bench_primitive, &spot.transform());
        }

        let can_primitive = trash_can();
        for spot in &can_spots {
            layer
                .trash_cans
                .append_transformed(&can_primitive, &spot.transform());
        }

        let sign_primitive = sign_post();
        for spot in &sign_spots {
            layer
                .signs
                .append_transformed(&sign_primitive, &spot.transform());
        }

        layer.bulb_instances = layer
            .bulb_placements
            .iter()
            .map(|p| {
                let t = bulb_transform(p, 1.0);
                InstanceData::new(t.to_matrix().to_cols_array_2d(), BULB_DAY_COLOR)
            })
            .collect();

        layer
    }

    /// Rewrite bulb instances for this frame: lit with gentle flicker at
    /// night, plain gray globes by day.
    pub fn update_bulbs(&mut self, time: f32, is_night: bool) {
        for (i, placement) in self.bulb_placements.iter().enumerate() {
            let pulse = if is_night {
                1.0 + (time * 3.0 + i as f32).sin() * 0.05
            } else {
                1.0
            };
            let t = bulb_transform(placement, pulse);
            let instance = &mut self.bulb_instances[i];
            instance.model = t.to_matrix().to_cols_array_2d();
            if is_night {
                instance.color = BULB_NIGHT_COLOR;
                instance.emissive = [1.0, 0.84, 0.0, 1.2 * pulse];
            } else {
                instance.color = BULB_DAY_COLOR;
                instance.emissive = [0.0; 4];
            }
        }
    }

    pub fn bulb_instances(&self) -> &[InstanceData] {
        &self.bulb_instances
    }

    pub fn lamp_count(&self) -> usize {
        self.bulb_placements.len()
    }
}

fn bulb_transform(placement: &PlacedInstance, pulse: f32) -> Transform {
    Transform::from_position_yaw_scale(
        placement.position + Vec3::new(0.0, BULB_HEIGHT * placement.scale, 0.0),
        placement.yaw,
        placement.scale * pulse,
    )
}

fn roadside_spots(
    city: &CityData,
    field: &ObstacleField,
    seed: u64,
    kind: &str,
    spacing: f32,
    offset: f32,
) -> Vec<PlacedInstance> {
    let mut spots = Vec::new();
    for (road, from, to) in city.active_roads() {
        let mut rng = StdRng::seed_from_u64(mix_seed(
            seed,
            id_tag(&road.id).wrapping_add(id_tag(kind)),
        ));
        spots.extend(scatter_along_segment(
            field,
            from.plan_position(),
            to.plan_position(),
            spacing,
            offset + road.class.obstacle_half_width(),
            FURNITURE_CLEARANCE,
            (0.9, 1.1),
            &mut rng,
        ));
    }
    spots
}

fn lamp_pole() -> MeshData {
    MeshData::cylinder(0.05, 0.05, 3.0, 8, POLE_COLOR)
}

fn bench() -> MeshData {
    let mut mesh = MeshData::new();
    mesh.push_box(
        Vec3::new(1.2, 0.1, 0.4),
        &Transform::from_position(Vec3::new(0.0, 0.4, 0.0)),
        BENCH_COLOR,
    );
    mesh.push_box(
        Vec3::new(1.2, 0.5, 0.1),
        &Transform::from_position(Vec3::new(0.0, 0.65, -0.15)),
        BENCH_COLOR,
    );
    mesh
}

fn trash_can() -> MeshData {
    MeshData::cylinder(0.25, 0.2, 0.8, 10, hex_color("#2d3748").unwrap_or([0.2; 4]))
}

fn sign_post() -> MeshData {
    let mut mesh = MeshData::cylinder(0.03, 0.03, 2.0, 6, POLE_COLOR);
    mesh.push_box(
        Vec3::new(0.8, 0.4, 0.05),
        &Transform::from_position(Vec3::new(0.0, 2.2, 0.0)),
        hex_color("#1a365d").unwrap_or([0.1, 0.21, 0.36, 1.0]),
    );
    mesh
}
