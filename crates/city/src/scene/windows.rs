//! Window instancing.
//!
//! Every structural building face is tiled with a grid of window quads.
//! Lit and dark windows are two disjoint instance batches with different
//! emissive settings, so the whole city's windows cost two draw calls.
//! The selected building's lit windows get a slow sinusoidal scale pulse,
//! which is the only per-frame work in this module.

use engine_core::Transform;
use glam::Vec3;
use procgen::{id_tag, mix_seed};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::InstanceData;

use crate::model::{CityData, LocationKind};

const ROW_PITCH: f32 = 0.4;
const COL_PITCH: f32 = 0.3;
const FACE_SCALE: Vec3 = Vec3::new(0.2, 0.3, 0.05);
const SIDE_SCALE: Vec3 = Vec3::new(0.05, 0.3, 0.2);

const LIT_COLOR: [f32; 4] = [1.0, 0.84, 0.0, 1.0];
const LIT_EMISSIVE: [f32; 4] = [1.0, 0.84, 0.0, 0.8];
const DARK_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// Probability that a window is lit, by building kind and hour.
pub fn lit_probability(kind: LocationKind, hour: f32) -> f32 {
    let night = hour < 6.0 || hour > 18.0;
    let business = hour >= 9.0 && hour <= 17.0;
    if night {
        match kind {
            LocationKind::Hospital => 0.8,
            LocationKind::Hotel => 0.7,
            LocationKind::School => 0.2,
            _ => 0.5,
        }
    } else if business {
        match kind {
            LocationKind::Building => 0.9,
            LocationKind::Hospital => 0.8,
            LocationKind::School => 0.9,
            _ => 0.6,
        }
    } else {
        0.3
    }
}

/// Bucket of the lighting regime; lit/dark draws re-roll only when the hour
/// crosses one of these boundaries, not on every scrub of the clock.
pub fn lighting_bucket(hour: f32) -> u8 {
    if hour < 6.0 || hour > 18.0 {
        0 // night
    } else if hour >= 9.0 && hour <= 17.0 {
        1 // business hours
    } else {
        2 // shoulder hours
    }
}

/// One window quad, tagged with its owning location slot for the
/// selection pulse.
#[derive(Debug, Clone)]
pub struct WindowInstance {
    pub transform: Transform,
    pub location_slot: usize,
}

/// The two disjoint window batches plus their baked GPU instance data.
#[derive(Debug, Default)]
pub struct WindowBatches {
    pub lit: Vec<WindowInstance>,
    pub dark: Vec<WindowInstance>,
    lit_baked: Vec<InstanceData>,
    dark_baked: Vec<InstanceData>,
}

impl WindowBatches {
    /// Tile every structural building's faces and roll lit states.
    /// Deterministic for a given `(seed, hour bucket)`.
    pub fn build(city: &CityData, hour: f32, seed: u64) -> Self {
        let bucket = lighting_bucket(hour) as u64;
        let mut batches = WindowBatches::default();

        for (slot, location) in city.locations.iter().enumerate() {
            if !location.kind.has_structure() {
                continue;
            }
            let dims = location.kind.footprint();
            let center = location.position();
            if !center.is_finite() {
                continue;
            }
            let rows = (dims.y / ROW_PITCH).floor() as i32;
            let cols = (dims.x / COL_PITCH).floor() as i32;
            let probability = lit_probability(location.kind, hour);
            let mut rng =
                StdRng::seed_from_u64(mix_seed(seed.wrapping_add(bucket), id_tag(&location.id)));

            for row in 0..rows {
                for col in 0..cols {
                    let lateral = (col as f32 - (cols - 1) as f32 / 2.0) * COL_PITCH;
                    let height = center.y + row as f32 * ROW_PITCH + 0.2;

                    // Front and back faces
                    for sign in [1.0, -1.0] {
                        let position = Vec3::new(
                            center.x + lateral,
                            height,
                            center.z + sign * (dims.z / 2.0 + 0.01),
                        );
                        batches.push(slot, position, FACE_SCALE, rng.gen::<f32>() < probability);
                    }

                    // Side faces only on deep buildings
                    if dims.z > 1.5 {
                        for sign in [1.0, -1.0] {
                            let position = Vec3::new(
                                center.x + sign * (dims.x / 2.0 + 0.01),
                                height,
                                center.z + lateral,
                            );
                            batches.push(
                                slot,
                                position,
                                SIDE_SCALE,
                                rng.gen::<f32>() < probability,
                            );
                        }
                    }
                }
            }
        }

        batches.bake();
        batches
    }

    fn push(&mut self, slot: usize, position: Vec3, scale: Vec3, lit: bool) {
        let instance = WindowInstance {
            transform: Transform::from_position_scale(position, scale),
            location_slot: slot,
        };
        if lit {
            self.lit.push(instance);
        } else {
            self.dark.push(instance);
        }
    }

    fn bake(&mut self) {
        self.lit_baked = self
            .lit
            .iter()
            .map(|w| {
                InstanceData::with_emissive(
                    w.transform.to_matrix().to_cols_array_2d(),
                    LIT_COLOR,
                    LIT_EMISSIVE,
                )
            })
            .collect();
        self.dark_baked = self
            .dark
            .iter()
            .map(|w| InstanceData::new(w.transform.to_matrix().to_cols_array_2d(), DARK_COLOR))
            .collect();
    }

    /// Static dark batch.
    pub fn dark_instances(&self) -> &[InstanceData] {
        &self.dark_baked
    }

    /// Lit batch for this frame. When a building is selected, its windows
    /// are rewritten in `scratch` with the pulse scale; everything else is
    /// the baked data untouched.
    pub fn lit_instances<'a>(
        &'a self,
        selected_slot: Option<usize>,
        time: f32,
        scratch: &'a mut Vec<InstanceData>,
    ) -> &'a [InstanceData] {
        let Some(selected) = selected_slot else {
            return &self.lit_baked;
        };
        if !self.lit.iter().any(|w| w.location_slot == selected) {
            return &self.lit_baked;
        }

        scratch.clear();
        scratch.extend_from_slice(&self.lit_baked);
        let pulse = 1.0 + (time * 4.0).sin() * 0.1;
        for (window, baked) in self.lit.iter().zip(scratch.iter_mut()) {
            if window.location_slot == selected {
                let mut t = window.transform;
                t.scale *= pulse;
                baked.model = t.to_matrix().to_cols_array_2d();
            }
        }
        scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Business-hours and night probabilities for the office kind, per the
    /// lighting contract (independent of any random outcome).
    #[test]
    fn lit_probability_boundaries() {
        assert_eq!(lit_probability(LocationKind::Building, 12.0), 0.9);
        assert_eq!(lit_probability(LocationKind::Building, 2.0), 0.5);
        assert_eq!(lit_probability(LocationKind::Hospital, 2.0), 0.8);
        assert_eq!(lit_probability(LocationKind::Hotel, 23.0), 0.7);
        assert_eq!(lit_probability(LocationKind::School, 3.0), 0.2);
        assert_eq!(lit_probability(LocationKind::Cafe, 7.0), 0.3);
    }

    #[test]
    fn batches_are_deterministic_per_seed_and_bucket() {
        let city = CityData::demo();
        let a = WindowBatches::build(&city, 12.0, 42);
        let b = WindowBatches::build(&city, 12.0, 42);
        assert_eq!(a.lit.len(), b.lit.len());
        assert_eq!(a.dark.len(), b.dark.len());
        // Same bucket, different hour: identical lit pattern.
        let c = WindowBatches::build(&city, 15.0, 42);
        assert_eq!(a.lit.len(), c.lit.len());
    }

    #[test]
    fn parks_get_no_windows() {
        let mut city = CityData::demo();
        city.locations.retain(|l| l.kind == LocationKind::Park);
        let batches = WindowBatches::build(&city, 12.0, 1);
        assert!(batches.lit.is_empty() && batches.dark.is_empty());
    }

    #[test]
    fn deep_buildings_tile_four_faces() {
        let mut city = CityData::demo();
        // Hospital is 3x3x3, deep enough for side windows too.
        city.locations.retain(|l| l.id == "hospital");
        let batches = WindowBatches::build(&city, 12.0, 1);
        let all: Vec<&WindowInstance> = batches.lit.iter().chain(batches.dark.iter()).collect();
        assert!(!all.is_empty());
        // Every row/col cell emits front+back+two sides.
        assert_eq!(all.len() % 4, 0);
        assert!(all.iter().any(|w| w.transform.scale.x == SIDE_SCALE.x));
        assert!(all.iter().any(|w| w.transform.scale.z == FACE_SCALE.z));
    }

    #[test]
    fn selection_pulse_rescales_only_selected_windows() {
        let city = CityData::demo();
        let batches = WindowBatches::build(&city, 12.0, 42);
        let selected = city
            .locations
            .iter()
            .position(|l| l.kind.has_structure())
            .unwrap();
        let mut scratch = Vec::new();
        // At sin peak the pulse is 1.1.
        let time = std::f32::consts::FRAC_PI_2 / 4.0;
        let animated = batches.lit_instances(Some(selected), time, &mut scratch);
        assert_eq!(animated.len(), batches.lit_baked.len());
        let mut changed = 0;
        for (i, window) in batches.lit.iter().enumerate() {
            let same = animated[i].model == batches.lit_baked[i].model;
            if window.location_slot == selected {
                assert!(!same);
                changed += 1;
            } else {
                assert!(same);
            }
        }
        assert!(changed > 0);
    }

    #[test]
    fn no_selection_returns_baked_slice() {
        let city = CityData::demo();
        let batches = WindowBatches::build(&city, 12.0, 42);
        let mut scratch = Vec::new();
        let instances = batches.lit_instances(None, 1.0, &mut scratch);
        assert_eq!(instances.len(), batches.lit_baked.len());
        assert!(scratch.is_empty());
    }
}
