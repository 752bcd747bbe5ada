//! Road network geometry.
//!
//! Each active road becomes a smooth spline polyline (class-dependent
//! control count, jitter, and mid-span bulge), then a set of flat ribbons:
//! a soft shadow stroke, the surface stroke, and class-dependent lane
//! markings, plus pedestrian sidewalks on both shoulders. Junctions where
//! two or more main roads meet get a roundabout of concentric disks instead
//! of a bare intersection. Everything merges per layer, so the whole
//! network costs a handful of draw calls.

use glam::{Vec2, Vec3};
use procgen::{control_points, id_tag, mix_seed, sample_curve, CurveStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::MeshData;

use crate::model::{hex_color, CityData, RoadClass, Weather};

/// Samples per road surface stroke.
const CURVE_SAMPLES: usize = 50;
/// Constant elevation of road geometry above ground.
const ROAD_ELEVATION: f32 = 0.1;

/// Spline shape per road class: arterials are direct, residential streets
/// wander.
pub fn spline_style(class: RoadClass) -> CurveStyle {
    match class {
        RoadClass::Main => CurveStyle {
            segments: 12,
            jitter: 0.0,
            bulge: 0.4,
            elevation: ROAD_ELEVATION,
        },
        RoadClass::Secondary => CurveStyle {
            segments: 8,
            jitter: 0.1,
            bulge: 0.4,
            elevation: ROAD_ELEVATION,
        },
        RoadClass::Residential => CurveStyle {
            segments: 6,
            jitter: 0.2,
            bulge: 0.8,
            elevation: ROAD_ELEVATION,
        },
    }
}

/// Surface color by class and weather: snow lightens the deck, rain cools
/// and darkens it for the wet look.
pub fn weather_surface_color(class: RoadClass, weather: Weather) -> [f32; 4] {
    let dry = class.surface_color();
    match weather {
        Weather::Clear => dry,
        Weather::Rain => [dry[0] * 0.7, dry[1] * 0.75, dry[2] * 0.9, 1.0],
        Weather::Snow => match class {
            RoadClass::Main => hex_color("#334155").unwrap_or(dry),
            _ => hex_color("#64748b").unwrap_or(dry),
        },
    }
}

/// One road's sampled spline, kept for traffic to follow.
#[derive(Debug, Clone)]
pub struct RoadPath {
    pub road_id: String,
    pub class: RoadClass,
    pub curve: Vec<Vec3>,
}

/// A roundabout replacing a plain junction.
#[derive(Debug, Clone)]
pub struct Roundabout {
    pub location_slot: usize,
    pub center: Vec3,
    /// Plan directions toward each approaching main road.
    pub approaches: Vec<Vec2>,
}

pub const ROUNDABOUT_RADIUS: f32 = 3.0;

/// The derived road network: traffic paths plus the merged render meshes.
#[derive(Debug, Default)]
pub struct RoadNetwork {
    pub paths: Vec<RoadPath>,
    pub roundabouts: Vec<Roundabout>,
    pub shadow: MeshData,
    pub surface: MeshData,
    pub markings: MeshData,
    /// Pedestrian lanes flanking every road.
    pub sidewalks: MeshData,
}

const SIDEWALK_WIDTH: f32 = 0.8;
const SIDEWALK_COLOR: [f32; 4] = [0.65, 0.65, 0.68, 1.0];

impl RoadNetwork {
    pub fn build(city: &CityData, weather: Weather, seed: u64) -> Self {
        let mut network = RoadNetwork::default();

        for (road, from, to) in city.active_roads() {
            let start = from.position();
            let end = to.position();
            if !start.is_finite() || !end.is_finite() {
                continue;
            }

            let mut rng = StdRng::seed_from_u64(mix_seed(seed, id_tag(&road.id)));
            let control = control_points(start, end, spline_style(road.class), &mut rng);
            let curve = sample_curve(&control, CURVE_SAMPLES);

            let width = road.class.draw_width();
            let surface_color = weather_surface_color(road.class, weather);

            // Soft shadow stroke under the deck for contrast. The renderer
            // draws opaque, so the softness is baked into the color.
            network.shadow.merge(&MeshData::ribbon(
                &curve,
                width + 0.3,
                -0.06,
                [0.09, 0.1, 0.12, 1.0],
            ));
            network
                .surface
                .merge(&MeshData::ribbon(&curve, width, -0.05, surface_color));

            match road.class {
                RoadClass::Main => {
                    // Dashed center line plus solid edge lines.
                    network.markings.merge(&MeshData::dashed_ribbon(
                        &curve,
                        0.2,
                        -0.04,
                        3,
                        2,
                        [1.0; 4],
                    ));
                    for side in [-1.0, 1.0] {
                        let edge = offset_polyline(&curve, side * (width / 2.0 - 0.15));
                        network
                            .markings
                            .merge(&MeshData::ribbon(&edge, 0.1, -0.04, [1.0; 4]));
                    }
                }
                RoadClass::Secondary => {
                    network.markings.merge(&MeshData::dashed_ribbon(
                        &curve,
                        0.1,
                        -0.04,
                        2,
                        4,
                        [1.0; 4],
                    ));
                }
                RoadClass::Residential => {}
            }

            // Pedestrian lanes on both shoulders.
            for side in [-1.0, 1.0] {
                let lane = offset_polyline(&curve, side * (width / 2.0 + SIDEWALK_WIDTH / 2.0 + 0.2));
                network.sidewalks.merge(&MeshData::ribbon(
                    &lane,
                    SIDEWALK_WIDTH,
                    -0.07,
                    SIDEWALK_COLOR,
                ));
            }

            network.paths.push(RoadPath {
                road_id: road.id.clone(),
                class: road.class,
                curve,
            });
        }

        network.roundabouts = detect_roundabouts(city);
        for roundabout in &network.roundabouts {
            network
                .surface
                .merge(&roundabout_geometry(roundabout.center));
            network.markings.merge(&roundabout_marking(roundabout.center));
        }

        network
    }
}

/// A junction qualifies as a roundabout when two or more main roads share
/// its location.
pub fn detect_roundabouts(city: &CityData) -> Vec<Roundabout> {
    let active = city.active_roads();
    let mut roundabouts = Vec::new();
    for (slot, location) in city.locations.iter().enumerate() {
        let mut approaches = Vec::new();
        for (road, from, to) in &active {
            if road.class != RoadClass::Main {
                continue;
            }
            let other = if from.id == location.id {
                Some(to)
            } else if to.id == location.id {
                Some(from)
            } else {
                None
            };
            if let Some(other) = other {
                let dir = other.plan_position() - location.plan_position();
                approaches.push(dir.normalize_or(Vec2::X));
            }
        }
        if approaches.len() >= 2 {
            roundabouts.push(Roundabout {
                location_slot: slot,
                center: location.position(),
                approaches,
            });
        }
    }
    roundabouts
}

/// Concentric flat disks: outer ring, inner lane, landscaped center island.
fn roundabout_geometry(center: Vec3) -> MeshData {
    let mut mesh = MeshData::new();
    let deck = hex_color("#1e293b").unwrap_or([0.12, 0.16, 0.23, 1.0]);
    let lane = hex_color("#475569").unwrap_or([0.28, 0.33, 0.41, 1.0]);
    let island = hex_color("#4ade80").unwrap_or([0.29, 0.87, 0.5, 1.0]);
    let island_core = hex_color("#22c55e").unwrap_or([0.13, 0.77, 0.37, 1.0]);

    mesh.merge(&MeshData::disk(ROUNDABOUT_RADIUS, 32, 0.05, deck));
    mesh.merge(&MeshData::disk(ROUNDABOUT_RADIUS - 0.8, 32, 0.06, lane));
    mesh.merge(&MeshData::disk(ROUNDABOUT_RADIUS - 1.6, 32, 0.07, island));
    mesh.merge(&MeshData::disk(ROUNDABOUT_RADIUS - 2.0, 32, 0.08, island_core));
    translate(&mut mesh, center + Vec3::new(0.0, ROAD_ELEVATION, 0.0));
    mesh
}

/// White lane-marking ring around the outer edge.
fn roundabout_marking(center: Vec3) -> MeshData {
    let mut ring = MeshData::ring(
        ROUNDABOUT_RADIUS - 0.1,
        ROUNDABOUT_RADIUS + 0.1,
        32,
        0.09,
        [1.0; 4],
    );
    translate(&mut ring, center + Vec3::new(0.0, ROAD_ELEVATION, 0.0));
    ring
}

fn translate(mesh: &mut MeshData, offset: Vec3) {
    for v in &mut mesh.vertices {
        v.position[0] += offset.x;
        v.position[1] += offset.y;
        v.position[2] += offset.z;
    }
}

/// Shift a polyline sideways by `offset` (positive = left of travel).
fn offset_polyline(polyline: &[Vec3], offset: f32) -> Vec<Vec3> {
    polyline
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let prev = polyline[i.saturating_sub(1)];
            let next = polyline[(i + 1).min(polyline.len() - 1)];
            let tangent = Vec3::new(next.x - prev.x, 0.0, next.z - prev.z).normalize_or(Vec3::X);
            *p + Vec3::new(-tangent.z, 0.0, tangent.x) * offset
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, LocationKind, Road};

    fn city_with_roads(classes: &[RoadClass]) -> CityData {
        let mut city = CityData {
            name: String::new(),
            locations: vec![Location {
                id: "hub".to_string(),
                name: String::new(),
                description: String::new(),
                kind: LocationKind::Building,
                position: [0.0, 0.0, 0.0],
                color: None,
                zone: None,
            }],
            roads: Vec::new(),
        };
        for (i, class) in classes.iter().enumerate() {
            let id = format!("spoke-{}", i);
            city.locations.push(Location {
                id: id.clone(),
                name: String::new(),
                description: String::new(),
                kind: LocationKind::Building,
                position: [20.0 * (i as f32 + 1.0), 0.0, 10.0 * i as f32],
                color: None,
                zone: None,
            });
            city.roads.push(Road {
                id: format!("road-{}", i),
                from: "hub".to_string(),
                to: id,
                class: *class,
                distance: 0.0,
            });
        }
        city
    }

    /// Spline endpoints equal the endpoint locations for every class.
    #[test]
    fn road_curves_pin_endpoint_locations() {
        let city = city_with_roads(&[
            RoadClass::Main,
            RoadClass::Secondary,
            RoadClass::Residential,
        ]);
        let network = RoadNetwork::build(&city, Weather::Clear, 7);
        assert_eq!(network.paths.len(), 3);
        for (path, (_, from, to)) in network.paths.iter().zip(city.active_roads()) {
            let first = path.curve.first().unwrap();
            let last = path.curve.last().unwrap();
            assert!((first.x - from.position[0]).abs() < 1e-4);
            assert!((first.z - from.position[2]).abs() < 1e-4);
            assert!((last.x - to.position[0]).abs() < 1e-4);
            assert!((last.z - to.position[2]).abs() < 1e-4);
            assert!((first.y - ROAD_ELEVATION).abs() < 1e-4);
        }
    }

    /// Two main roads plus a secondary at one location form a roundabout;
    /// a single main road does not.
    #[test]
    fn roundabout_detection_needs_two_main_roads() {
        let with = city_with_roads(&[
            RoadClass::Main,
            RoadClass::Main,
            RoadClass::Secondary,
        ]);
        let hubs: Vec<usize> = detect_roundabouts(&with)
            .iter()
            .map(|r| r.location_slot)
            .collect();
        assert_eq!(hubs, vec![0]);
        assert_eq!(detect_roundabouts(&with)[0].approaches.len(), 2);

        let without = city_with_roads(&[RoadClass::Main, RoadClass::Secondary]);
        assert!(detect_roundabouts(&without).is_empty());
    }

    /// Roads referencing missing endpoints produce no derived output.
    #[test]
    fn dropped_roads_leave_no_trace() {
        let mut city = city_with_roads(&[RoadClass::Main]);
        city.roads.push(Road {
            id: "ghost".to_string(),
            from: "hub".to_string(),
            to: "missing".to_string(),
            class: RoadClass::Main,
            distance: 5.0,
        });
        let network = RoadNetwork::build(&city, Weather::Clear, 7);
        assert_eq!(network.paths.len(), 1);
        assert!(network.paths.iter().all(|p| p.road_id != "ghost"));
        // Only one incident main road resolved, so no roundabout either.
        assert!(network.roundabouts.is_empty());
    }

    #[test]
    fn sidewalks_flank_every_road() {
        let city = city_with_roads(&[RoadClass::Residential]);
        let network = RoadNetwork::build(&city, Weather::Clear, 7);
        assert!(!network.sidewalks.is_empty());
        // Two lanes per road, each a full-length ribbon.
        assert_eq!(
            network.sidewalks.vertices.len(),
            2 * network.surface.vertices.len()
        );
    }

    #[test]
    fn markings_exist_for_arterials_not_residential() {
        let main_only = city_with_roads(&[RoadClass::Main]);
        let residential_only = city_with_roads(&[RoadClass::Residential]);
        let with_markings = RoadNetwork::build(&main_only, Weather::Clear, 7);
        let without = RoadNetwork::build(&residential_only, Weather::Clear, 7);
        assert!(!with_markings.markings.is_empty());
        assert!(without.markings.is_empty());
    }

    #[test]
    fn weather_shifts_surface_color() {
        let dry = weather_surface_color(RoadClass::Main, Weather::Clear);
        let wet = weather_surface_color(RoadClass::Main, Weather::Rain);
        let snow = weather_surface_color(RoadClass::Main, Weather::Snow);
        assert!(wet[0] < dry[0]);
        assert!(snow[0] > dry[0]);
    }

    #[test]
    fn zero_length_road_builds_finite_geometry() {
        let mut city = city_with_roads(&[]);
        city.locations.push(Location {
            id: "twin".to_string(),
            name: String::new(),
            description: String::new(),
            kind: LocationKind::Building,
            position: [0.0, 0.0, 0.0],
            color: None,
            zone: None,
        });
        city.roads.push(Road {
            id: "null-road".to_string(),
            from: "hub".to_string(),
            to: "twin".to_string(),
            class: RoadClass::Residential,
            distance: 0.0,
        });
        let network = RoadNetwork::build(&city, Weather::Clear, 3);
        assert_eq!(network.paths.len(), 1);
        for p in &network.paths[0].curve {
            assert!(p.is_finite());
        }
        for v in &network.surface.vertices {
            assert!(v.position.iter().all(|c| c.is_finite()));
        }
    }
}
