//! Traffic simulation: vehicle pools following road splines, and traffic
//! lights cycling at main-road junctions.
//!
//! Vehicles live in fixed-capacity pools per kind (car/bus/truck). Each
//! active vehicle advances its progress along an assigned road curve by
//! `speed · Δt · density(hour)` and wraps onto a new random road at the
//! end. Orientation comes from the curve tangent. Pools never grow: demand
//! beyond capacity is clamped in iteration order.

use engine_core::Transform;
use glam::Vec3;
use procgen::{mix_seed, point_at, tangent_at};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::InstanceData;

use crate::scene::roads::{RoadPath, Roundabout, ROUNDABOUT_RADIUS};

/// Cosmetic traffic volume by hour: rush-hour peaks, business-hours
/// baseline, late-night trickle.
pub fn traffic_density_factor(hour: f32) -> f32 {
    if (7.0..=9.0).contains(&hour) || (16.0..=18.0).contains(&hour) {
        1.5
    } else if (9.0..=16.0).contains(&hour) {
        1.0
    } else if hour >= 23.0 || hour <= 5.0 {
        0.3
    } else {
        0.7
    }
}

/// Vehicle archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleKind {
    Car,
    Bus,
    Truck,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 3] = [VehicleKind::Car, VehicleKind::Bus, VehicleKind::Truck];

    /// Body extents (length, height, width).
    pub fn extents(&self) -> Vec3 {
        match self {
            VehicleKind::Car => Vec3::new(0.8, 0.4, 0.4),
            VehicleKind::Bus => Vec3::new(1.2, 0.6, 0.4),
            VehicleKind::Truck => Vec3::new(1.0, 0.5, 0.4),
        }
    }

    /// Fixed pool capacity.
    pub fn capacity(&self) -> usize {
        match self {
            VehicleKind::Car => 60,
            VehicleKind::Bus => 15,
            VehicleKind::Truck => 25,
        }
    }

    pub fn speed_range(&self) -> (f32, f32) {
        match self {
            VehicleKind::Car => (0.08, 0.12),
            VehicleKind::Bus => (0.06, 0.08),
            VehicleKind::Truck => (0.05, 0.07),
        }
    }

    pub fn palette(&self) -> &'static [[f32; 4]] {
        const CAR: [[f32; 4]; 6] = [
            [1.0, 0.27, 0.27, 1.0],
            [0.27, 1.0, 0.27, 1.0],
            [0.27, 0.27, 1.0, 1.0],
            [1.0, 1.0, 0.27, 1.0],
            [1.0, 0.27, 1.0, 1.0],
            [0.27, 1.0, 1.0, 1.0],
        ];
        const BUS: [[f32; 4]; 3] = [
            [0.29, 0.56, 0.89, 1.0],
            [0.96, 0.65, 0.14, 1.0],
            [0.49, 0.83, 0.13, 1.0],
        ];
        const TRUCK: [[f32; 4]; 3] = [
            [0.55, 0.34, 0.16, 1.0],
            [0.56, 0.07, 1.0, 1.0],
            [0.25, 0.46, 0.02, 1.0],
        ];
        match self {
            VehicleKind::Car => &CAR,
            VehicleKind::Bus => &BUS,
            VehicleKind::Truck => &TRUCK,
        }
    }
}

/// One pooled vehicle.
#[derive(Debug, Clone)]
struct Vehicle {
    path_index: usize,
    progress: f32,
    speed: f32,
    color: [f32; 4],
    active: bool,
}

/// One kind's pool plus its in-place instance buffer.
#[derive(Debug)]
struct VehiclePool {
    kind: VehicleKind,
    vehicles: Vec<Vehicle>,
    instances: Vec<InstanceData>,
    active_count: usize,
}

impl VehiclePool {
    /// Roughly 70% of the pool drives at baseline density.
    const ACTIVE_SHARE: f32 = 0.7;

    fn new(kind: VehicleKind, path_count: usize, rng: &mut StdRng) -> Self {
        let capacity = kind.capacity();
        let (speed_min, speed_max) = kind.speed_range();
        let palette = kind.palette();
        let active_target = ((capacity as f32 * Self::ACTIVE_SHARE) as usize).min(capacity);

        let vehicles = (0..capacity)
            .map(|i| Vehicle {
                path_index: if path_count == 0 {
                    0
                } else {
                    rng.gen_range(0..path_count)
                },
                progress: rng.gen::<f32>(),
                speed: rng.gen_range(speed_min..=speed_max),
                color: palette[i % palette.len()],
                active: path_count > 0 && i < active_target,
            })
            .collect();

        Self {
            kind,
            vehicles,
            instances: Vec::with_capacity(capacity),
            active_count: 0,
        }
    }

    fn update(&mut self, paths: &[RoadPath], dt: f32, density: f32, rng: &mut StdRng) {
        self.instances.clear();
        self.active_count = 0;
        if paths.is_empty() {
            return;
        }
        let extents = self.kind.extents();

        for vehicle in &mut self.vehicles {
            if !vehicle.active {
                continue;
            }
            vehicle.progress += vehicle.speed * dt * density;
            if vehicle.progress > 1.0 {
                vehicle.progress = 0.0;
                vehicle.path_index = rng.gen_range(0..paths.len());
            }
            let path = &paths[vehicle.path_index.min(paths.len() - 1)];

            let mut transform = Transform::from_position(
                point_at(&path.curve, vehicle.progress) + Vec3::new(0.0, extents.y / 2.0, 0.0),
            );
            transform.face_direction(tangent_at(&path.curve, vehicle.progress));
            transform.scale = extents;

            self.instances.push(InstanceData::new(
                transform.to_matrix().to_cols_array_2d(),
                vehicle.color,
            ));
            self.active_count += 1;
        }
    }
}

/// Traffic light color phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPhase {
    Red,
    Green,
    Yellow,
}

impl LightPhase {
    /// 5 seconds per color, red → green → yellow, looping. Each
    /// intersection runs its own offset so junctions never sync up.
    pub fn at(time: f32) -> Self {
        const STEP: f32 = 5.0;
        match ((time / STEP).floor() as i64).rem_euclid(3) {
            0 => LightPhase::Red,
            1 => LightPhase::Green,
            _ => LightPhase::Yellow,
        }
    }

    pub fn color(&self) -> [f32; 4] {
        match self {
            LightPhase::Red => [1.0, 0.1, 0.1, 1.0],
            LightPhase::Green => [0.2, 1.0, 0.3, 1.0],
            LightPhase::Yellow => [1.0, 0.9, 0.2, 1.0],
        }
    }
}

/// One signal head at a junction approach.
#[derive(Debug, Clone)]
struct TrafficLight {
    position: Vec3,
    phase_offset: f32,
}

/// Height of the signal head above ground.
pub const LIGHT_HEAD_HEIGHT: f32 = 2.5;

/// The whole traffic layer: pools plus signals.
pub struct TrafficSystem {
    pools: Vec<VehiclePool>,
    lights: Vec<TrafficLight>,
    light_instances: Vec<InstanceData>,
    rng: StdRng,
}

impl TrafficSystem {
    /// Build pools and signal heads for the current road network. Signals
    /// stand at each roundabout approach (junctions with 2+ main roads).
    pub fn new(paths: &[RoadPath], roundabouts: &[Roundabout], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, 0xfeed));
        let pools = VehicleKind::ALL
            .iter()
            .map(|kind| VehiclePool::new(*kind, paths.len(), &mut rng))
            .collect();

        let mut lights = Vec::new();
        for (i, roundabout) in roundabouts.iter().enumerate() {
            // Every head at one junction shares a clock; junctions diverge.
            let phase_offset = i as f32 * 2.3;
            for approach in &roundabout.approaches {
                let position = roundabout.center
                    + Vec3::new(approach.x, 0.0, approach.y) * (ROUNDABOUT_RADIUS + 0.6);
                lights.push(TrafficLight {
                    position,
                    phase_offset,
                });
            }
        }

        Self {
            pools,
            lights,
            light_instances: Vec::new(),
            rng,
        }
    }

    /// Advance vehicles and signals by one frame.
    pub fn update(&mut self, paths: &[RoadPath], dt: f32, time: f32, hour: f32) {
        let density = traffic_density_factor(hour);
        for pool in &mut self.pools {
            pool.update(paths, dt, density, &mut self.rng);
        }

        self.light_instances.clear();
        for light in &self.lights {
            let phase = LightPhase::at(time + light.phase_offset);
            let color = phase.color();
            let transform = Transform::from_position_scale(
                light.position + Vec3::new(0.0, LIGHT_HEAD_HEIGHT, 0.0),
                Vec3::splat(0.25),
            );
            self.light_instances.push(InstanceData::with_emissive(
                transform.to_matrix().to_cols_array_2d(),
                color,
                [color[0], color[1], color[2], 1.0],
            ));
        }
    }

    fn pool(&self, kind: VehicleKind) -> &VehiclePool {
        // Pools are built in VehicleKind::ALL order.
        let index = match kind {
            VehicleKind::Car => 0,
            VehicleKind::Bus => 1,
            VehicleKind::Truck => 2,
        };
        &self.pools[index]
    }

    pub fn vehicle_instances(&self, kind: VehicleKind) -> &[InstanceData] {
        &self.pool(kind).instances
    }

    pub fn active_count(&self, kind: VehicleKind) -> usize {
        self.pool(kind).active_count
    }

    pub fn light_instances(&self) -> &[InstanceData] {
        &self.light_instances
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Static poles under the signal heads.
    pub fn light_pole_mesh(&self) -> renderer::MeshData {
        let mut mesh = renderer::MeshData::new();
        let pole = renderer::MeshData::cylinder(0.04, 0.04, LIGHT_HEAD_HEIGHT, 6, [0.3, 0.3, 0.3, 1.0]);
        for light in &self.lights {
            mesh.append_transformed(&pole, &Transform::from_position(light.position));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CityData, Weather};
    use crate::scene::roads::RoadNetwork;

    fn network() -> RoadNetwork {
        RoadNetwork::build(&CityData::demo(), Weather::Clear, 5)
    }

    /// Step-function boundaries from the traffic contract.
    #[test]
    fn density_factor_steps() {
        assert_eq!(traffic_density_factor(8.0), 1.5);
        assert_eq!(traffic_density_factor(12.0), 1.0);
        assert_eq!(traffic_density_factor(2.0), 0.3);
        assert_eq!(traffic_density_factor(20.0), 0.7);
        // Rush-hour edges win over the business-hours band.
        assert_eq!(traffic_density_factor(9.0), 1.5);
        assert_eq!(traffic_density_factor(16.0), 1.5);
    }

    #[test]
    fn pools_clamp_to_capacity() {
        let net = network();
        let mut traffic = TrafficSystem::new(&net.paths, &net.roundabouts, 9);
        traffic.update(&net.paths, 0.016, 0.0, 12.0);
        for kind in VehicleKind::ALL {
            assert!(traffic.active_count(kind) <= kind.capacity());
            assert!(traffic.active_count(kind) > 0);
            assert_eq!(
                traffic.vehicle_instances(kind).len(),
                traffic.active_count(kind)
            );
        }
    }

    #[test]
    fn vehicles_sit_on_their_curves() {
        let net = network();
        let mut traffic = TrafficSystem::new(&net.paths, &net.roundabouts, 9);
        traffic.update(&net.paths, 0.016, 0.0, 12.0);
        let height = VehicleKind::Car.extents().y / 2.0;
        for instance in traffic.vehicle_instances(VehicleKind::Car) {
            let y = instance.model[3][1];
            // On the road deck (curve elevation + half body height).
            assert!((y - (0.1 + height)).abs() < 0.05);
        }
    }

    #[test]
    fn progress_wraps_and_stays_in_range() {
        let net = network();
        let mut traffic = TrafficSystem::new(&net.paths, &net.roundabouts, 9);
        // Long steps at rush hour force wraps.
        for _ in 0..200 {
            traffic.update(&net.paths, 0.5, 0.0, 8.0);
        }
        for pool in &traffic.pools {
            for v in &pool.vehicles {
                assert!(v.progress >= 0.0 && v.progress <= 1.5);
                assert!(v.path_index < net.paths.len());
            }
        }
    }

    #[test]
    fn no_roads_means_idle_traffic() {
        let traffic_paths: Vec<RoadPath> = Vec::new();
        let mut traffic = TrafficSystem::new(&traffic_paths, &[], 9);
        traffic.update(&traffic_paths, 0.016, 0.0, 8.0);
        for kind in VehicleKind::ALL {
            assert_eq!(traffic.active_count(kind), 0);
        }
    }

    #[test]
    fn light_phases_cycle_every_five_seconds() {
        assert_eq!(LightPhase::at(0.0), LightPhase::Red);
        assert_eq!(LightPhase::at(5.5), LightPhase::Green);
        assert_eq!(LightPhase::at(10.5), LightPhase::Yellow);
        assert_eq!(LightPhase::at(15.2), LightPhase::Red);
        // Negative offsets (phase shifts) still resolve.
        assert_eq!(LightPhase::at(-4.0), LightPhase::Yellow);
    }

    #[test]
    fn signals_stand_at_main_junctions() {
        let net = network();
        let mut traffic = TrafficSystem::new(&net.paths, &net.roundabouts, 9);
        // Demo city has one plaza junction with two main approaches.
        assert_eq!(traffic.light_count(), 2);
        traffic.update(&net.paths, 0.016, 3.0, 12.0);
        assert_eq!(traffic.light_instances().len(), 2);
        assert!(traffic
            .light_instances()
            .iter()
            .all(|l| l.emissive[3] > 0.0));
    }
}
