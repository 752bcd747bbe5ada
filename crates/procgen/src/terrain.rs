//! Terrain height-field generation.
//!
//! Elevation is a four-octave noise stack multiplied by `(1 - flattening)`,
//! where flattening is the strongest falloff among all nearby structures.
//! Terrain looks natural in the open and is driven exactly to ground level
//! under buildings and roads, with a smooth blend at the boundary.
//!
//! **Seed-based determinism:** all noise derives from `config.seed`, so the
//! same seed produces the same terrain at every `(x, z)`.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use noise::{NoiseFn, Perlin, Simplex};

use crate::mix_seed;

/// Circular flattening region around a building footprint.
#[derive(Debug, Clone, Copy)]
pub struct FlattenDisc {
    pub center: Vec2,
    pub radius: f32,
}

/// Road-shaped flattening region: a segment with a half-width.
#[derive(Debug, Clone, Copy)]
pub struct FlattenStrip {
    pub start: Vec2,
    pub end: Vec2,
    pub half_width: f32,
}

/// Configuration for terrain generation.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Side length of the terrain in world units.
    pub size: f32,
    /// Number of vertices per side.
    pub resolution: u32,
    /// Amplitude of each octave, coarse to fine.
    pub octave_amplitudes: [f32; 4],
    /// Frequency of the first octave; each further octave doubles it.
    pub base_frequency: f64,
    /// Seed for the noise stack.
    pub seed: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 200.0,
            resolution: 256,
            octave_amplitudes: [3.0, 1.5, 0.75, 0.35],
            base_frequency: 0.02,
            seed: 0,
        }
    }
}

/// Vertex for the terrain mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Terrain generator: noise stack plus the flattening regions it blends against.
pub struct TerrainGenerator {
    config: TerrainConfig,
    perlin: Perlin,
    simplex: Simplex,
    discs: Vec<FlattenDisc>,
    strips: Vec<FlattenStrip>,
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig, discs: Vec<FlattenDisc>, strips: Vec<FlattenStrip>) -> Self {
        let perlin = Perlin::new(mix_seed(config.seed, 0) as u32);
        let simplex = Simplex::new(mix_seed(config.seed, 1) as u32);
        Self {
            config,
            perlin,
            simplex,
            discs,
            strips,
        }
    }

    /// Raw band-limited elevation before any flattening.
    pub fn raw_elevation(&self, x: f32, z: f32) -> f32 {
        let mut value = 0.0;
        let mut frequency = self.config.base_frequency;
        for amplitude in self.config.octave_amplitudes {
            let p = self.perlin.get([x as f64 * frequency, z as f64 * frequency]);
            let s = self
                .simplex
                .get([x as f64 * frequency + 1000.0, z as f64 * frequency + 1000.0]);
            value += (p * 0.7 + s * 0.3) as f32 * amplitude;
            frequency *= 2.0;
        }
        value
    }

    /// Flattening factor in `[0, 1]`: 0 in the open, 1 at a structure center
    /// or on a road centerline. The maximum over all regions wins so
    /// overlapping influences never fight each other.
    pub fn flattening(&self, x: f32, z: f32) -> f32 {
        if !x.is_finite() || !z.is_finite() {
            return 0.0;
        }
        let p = Vec2::new(x, z);
        let mut factor: f32 = 0.0;

        for disc in &self.discs {
            let d = p.distance(disc.center);
            factor = factor.max((1.0 - d / disc.radius).max(0.0));
        }

        for strip in &self.strips {
            let seg = strip.end - strip.start;
            let len_sq = seg.length_squared();
            if len_sq < 1e-6 {
                continue;
            }
            let t = ((p - strip.start).dot(seg) / len_sq).clamp(0.0, 1.0);
            let d = p.distance(strip.start + seg * t);
            factor = factor.max((1.0 - d / strip.half_width).max(0.0));
        }

        factor.min(1.0)
    }

    /// Final elevation at a plan position.
    pub fn elevation(&self, x: f32, z: f32) -> f32 {
        self.raw_elevation(x, z) * (1.0 - self.flattening(x, z))
    }

    /// Generate the full terrain mesh.
    pub fn generate(&self) -> TerrainData {
        let res = self.config.resolution as usize;
        let step = self.config.size / (self.config.resolution - 1) as f32;
        let half = self.config.size / 2.0;

        let mut vertices = Vec::with_capacity(res * res);
        let mut heightmap = Vec::with_capacity(res * res);

        for z in 0..res {
            for x in 0..res {
                let world_x = x as f32 * step - half;
                let world_z = z as f32 * step - half;
                let world_y = self.elevation(world_x, world_z);
                heightmap.push(world_y);
                vertices.push(TerrainVertex {
                    position: [world_x, world_y, world_z],
                    normal: [0.0, 1.0, 0.0],
                    uv: [
                        x as f32 / (res - 1) as f32,
                        z as f32 / (res - 1) as f32,
                    ],
                });
            }
        }

        let mut indices = Vec::with_capacity((res - 1) * (res - 1) * 6);
        for z in 0..(res - 1) {
            for x in 0..(res - 1) {
                let top_left = (z * res + x) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((z + 1) * res + x) as u32;
                let bottom_right = bottom_left + 1;

                indices.push(top_left);
                indices.push(bottom_left);
                indices.push(top_right);

                indices.push(top_right);
                indices.push(bottom_left);
                indices.push(bottom_right);
            }
        }

        let mut data = TerrainData {
            vertices,
            indices,
            heightmap,
            resolution: res,
            size: self.config.size,
        };
        data.recalculate_normals();
        data
    }
}

/// Generated terrain data.
#[derive(Debug)]
pub struct TerrainData {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    pub heightmap: Vec<f32>,
    pub resolution: usize,
    pub size: f32,
}

impl TerrainData {
    /// Sample height at a world position, interpolating the grid cell's
    /// actual triangulation (diagonal from bottom-left to top-right).
    pub fn sample_height(&self, x: f32, z: f32) -> f32 {
        let res = self.resolution;
        let half = self.size / 2.0;
        let step = self.size / (res - 1) as f32;

        let gx = (x + half) / step;
        let gz = (z + half) / step;

        let x0 = (gx.floor() as isize).clamp(0, res as isize - 2) as usize;
        let z0 = (gz.floor() as isize).clamp(0, res as isize - 2) as usize;

        let fx = (gx - x0 as f32).clamp(0.0, 1.0);
        let fz = (gz - z0 as f32).clamp(0.0, 1.0);

        let h00 = self.heightmap[z0 * res + x0];
        let h10 = self.heightmap[z0 * res + x0 + 1];
        let h01 = self.heightmap[(z0 + 1) * res + x0];
        let h11 = self.heightmap[(z0 + 1) * res + x0 + 1];

        if fx + fz <= 1.0 {
            h00 + fx * (h10 - h00) + fz * (h01 - h00)
        } else {
            h11 + (1.0 - fx) * (h01 - h11) + (1.0 - fz) * (h10 - h11)
        }
    }

    /// Recalculate vertex normals from positions.
    pub fn recalculate_normals(&mut self) {
        let res = self.resolution;
        let mut normals: Vec<Vec3> = vec![Vec3::ZERO; self.vertices.len()];

        for z in 0..(res - 1) {
            for x in 0..(res - 1) {
                let i0 = z * res + x;
                let i1 = i0 + 1;
                let i2 = (z + 1) * res + x;
                let i3 = i2 + 1;

                let v0: Vec3 = self.vertices[i0].position.into();
                let v1: Vec3 = self.vertices[i1].position.into();
                let v2: Vec3 = self.vertices[i2].position.into();
                let v3: Vec3 = self.vertices[i3].position.into();

                let n1 = (v2 - v0).cross(v1 - v0).normalize_or_zero();
                normals[i0] += n1;
                normals[i2] += n1;
                normals[i1] += n1;

                let n2 = (v3 - v1).cross(v2 - v1).normalize_or_zero();
                normals[i1] += n2;
                normals[i2] += n2;
                normals[i3] += n2;
            }
        }

        for (vertex, n) in self.vertices.iter_mut().zip(normals) {
            let n = n.normalize_or(Vec3::Y);
            vertex.normal = [n.x, n.y, n.z];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator_with_disc() -> TerrainGenerator {
        TerrainGenerator::new(
            TerrainConfig {
                size: 64.0,
                resolution: 33,
                seed: 1234,
                ..Default::default()
            },
            vec![FlattenDisc {
                center: Vec2::new(10.0, -4.0),
                radius: 8.0,
            }],
            vec![FlattenStrip {
                start: Vec2::new(-20.0, 0.0),
                end: Vec2::new(-20.0, 30.0),
                half_width: 6.0,
            }],
        )
    }

    /// Elevation at a structure center is exactly zero regardless of noise.
    #[test]
    fn elevation_zero_at_disc_center() {
        let gen = generator_with_disc();
        assert_eq!(gen.flattening(10.0, -4.0), 1.0);
        assert_eq!(gen.elevation(10.0, -4.0), 0.0);
    }

    /// Within the flattening radius, elevation magnitude never exceeds the
    /// raw noise damped by the falloff at that distance.
    #[test]
    fn elevation_bounded_by_falloff_inside_radius() {
        let gen = generator_with_disc();
        for (x, z) in [(12.0, -4.0), (10.0, 1.0), (6.0, -2.0)] {
            let falloff = gen.flattening(x, z);
            assert!(falloff > 0.0, "sample should be inside the radius");
            let raw = gen.raw_elevation(x, z).abs();
            assert!(gen.elevation(x, z).abs() <= raw * (1.0 - falloff) + 1e-5);
        }
    }

    /// Road centerline flattens to zero, and points past the segment ends
    /// are unaffected by the strip.
    #[test]
    fn strip_flattens_centerline_only_within_span() {
        let gen = generator_with_disc();
        assert_eq!(gen.flattening(-20.0, 15.0), 1.0);
        let past_end = gen.flattening(-20.0, 45.0);
        assert!(past_end < 1.0);
    }

    #[test]
    fn same_seed_same_heightmap() {
        let a = generator_with_disc().generate();
        let b = generator_with_disc().generate();
        assert_eq!(a.heightmap, b.heightmap);
    }

    #[test]
    fn no_obstacles_leaves_noise_untouched() {
        let gen = TerrainGenerator::new(
            TerrainConfig {
                size: 32.0,
                resolution: 9,
                seed: 7,
                ..Default::default()
            },
            Vec::new(),
            Vec::new(),
        );
        let (x, z) = (3.0, -5.0);
        assert_eq!(gen.elevation(x, z), gen.raw_elevation(x, z));
    }

    #[test]
    fn sample_height_matches_grid_vertices() {
        let gen = generator_with_disc();
        let data = gen.generate();
        // A grid vertex position should sample to its own height.
        let v = &data.vertices[5 * data.resolution + 7];
        let sampled = data.sample_height(v.position[0], v.position[2]);
        assert!((sampled - v.position[1]).abs() < 1e-4);
    }
}
