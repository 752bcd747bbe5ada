//! Mesh data structures, primitive generation, and static-geometry merging.
//!
//! `MeshData` is the CPU-side staging type: scene builders push many
//! pre-transformed primitives into one `MeshData` and upload it once, so a
//! whole district of walls or roofs costs a single draw call.

use crate::vertex::Vertex;
use engine_core::Transform;
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from vertex and index data.
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// Mesh data before GPU upload. Primitives can be appended with a transform
/// so many static objects merge into one buffer.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device) -> Mesh {
        Mesh::new(device, &self.vertices, &self.indices)
    }

    /// Append another mesh's data, transforming every vertex. Normals get
    /// the rotation but not the scale (fine for the uniform/axis scales used
    /// here).
    pub fn append_transformed(&mut self, other: &MeshData, transform: &Transform) {
        let matrix = transform.to_matrix();
        let normal_matrix = Mat4::from_quat(transform.rotation);
        let base = self.vertices.len() as u32;
        for v in &other.vertices {
            let p = matrix.transform_point3(Vec3::from(v.position));
            let n = normal_matrix.transform_vector3(Vec3::from(v.normal));
            self.vertices.push(Vertex::new(p.into(), n.into(), v.color));
        }
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    /// Append a box with the given full extents, centered at the transform.
    pub fn push_box(&mut self, extents: Vec3, transform: &Transform, color: [f32; 4]) {
        self.append_transformed(&Self::unit_box(extents, color), transform);
    }

    /// Axis-aligned box centered at the origin.
    pub fn unit_box(extents: Vec3, color: [f32; 4]) -> Self {
        let (hx, hy, hz) = (extents.x / 2.0, extents.y / 2.0, extents.z / 2.0);
        let faces: [([f32; 3], [Vec3; 4]); 6] = [
            // Front (+Z)
            (
                [0.0, 0.0, 1.0],
                [
                    Vec3::new(-hx, -hy, hz),
                    Vec3::new(hx, -hy, hz),
                    Vec3::new(hx, hy, hz),
                    Vec3::new(-hx, hy, hz),
                ],
            ),
            // Back (-Z)
            (
                [0.0, 0.0, -1.0],
                [
                    Vec3::new(hx, -hy, -hz),
                    Vec3::new(-hx, -hy, -hz),
                    Vec3::new(-hx, hy, -hz),
                    Vec3::new(hx, hy, -hz),
                ],
            ),
            // Top (+Y)
            (
                [0.0, 1.0, 0.0],
                [
                    Vec3::new(-hx, hy, hz),
                    Vec3::new(hx, hy, hz),
                    Vec3::new(hx, hy, -hz),
                    Vec3::new(-hx, hy, -hz),
                ],
            ),
            // Bottom (-Y)
            (
                [0.0, -1.0, 0.0],
                [
                    Vec3::new(-hx, -hy, -hz),
                    Vec3::new(hx, -hy, -hz),
                    Vec3::new(hx, -hy, hz),
                    Vec3::new(-hx, -hy, hz),
                ],
            ),
            // Right (+X)
            (
                [1.0, 0.0, 0.0],
                [
                    Vec3::new(hx, -hy, hz),
                    Vec3::new(hx, -hy, -hz),
                    Vec3::new(hx, hy, -hz),
                    Vec3::new(hx, hy, hz),
                ],
            ),
            // Left (-X)
            (
                [-1.0, 0.0, 0.0],
                [
                    Vec3::new(-hx, -hy, -hz),
                    Vec3::new(-hx, -hy, hz),
                    Vec3::new(-hx, hy, hz),
                    Vec3::new(-hx, hy, -hz),
                ],
            ),
        ];

        let mut data = Self::new();
        for (normal, corners) in faces {
            let base = data.vertices.len() as u32;
            for c in corners {
                data.vertices.push(Vertex::new(c.into(), normal, color));
            }
            data.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        data
    }

    /// Open cylinder (with caps) along +Y, base at y=0.
    pub fn cylinder(
        radius_bottom: f32,
        radius_top: f32,
        height: f32,
        segments: u32,
        color: [f32; 4],
    ) -> Self {
        let mut data = Self::new();
        let segments = segments.max(3);

        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = angle.sin_cos();
            let normal = [cos, 0.0, sin];
            data.vertices.push(Vertex::new(
                [cos * radius_bottom, 0.0, sin * radius_bottom],
                normal,
                color,
            ));
            data.vertices.push(Vertex::new(
                [cos * radius_top, height, sin * radius_top],
                normal,
                color,
            ));
        }
        for i in 0..segments {
            let b = i * 2;
            data.indices
                .extend_from_slice(&[b, b + 2, b + 1, b + 1, b + 2, b + 3]);
        }

        // Top cap
        let center = data.vertices.len() as u32;
        data.vertices
            .push(Vertex::new([0.0, height, 0.0], [0.0, 1.0, 0.0], color));
        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = angle.sin_cos();
            data.vertices.push(Vertex::new(
                [cos * radius_top, height, sin * radius_top],
                [0.0, 1.0, 0.0],
                color,
            ));
        }
        for i in 0..segments {
            data.indices
                .extend_from_slice(&[center, center + 2 + i, center + 1 + i]);
        }

        data
    }

    /// UV sphere centered at the origin.
    pub fn sphere(radius: f32, segments: u32, rings: u32, color: [f32; 4]) -> Self {
        let mut data = Self::new();
        let (segments, rings) = (segments.max(3), rings.max(2));

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = radius * phi.cos();
            let ring_radius = radius * phi.sin();
            for segment in 0..=segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();
                let normal = Vec3::new(x, y, z).normalize_or(Vec3::Y);
                data.vertices
                    .push(Vertex::new([x, y, z], normal.into(), color));
            }
        }
        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;
                data.indices
                    .extend_from_slice(&[current, next, current + 1, current + 1, next, next + 1]);
            }
        }

        data
    }

    /// Flat disk in the XZ plane at height `y`, facing up.
    pub fn disk(radius: f32, segments: u32, y: f32, color: [f32; 4]) -> Self {
        Self::ring(0.0, radius, segments, y, color)
    }

    /// Flat ring (annulus) in the XZ plane at height `y`, facing up.
    /// `inner == 0` degenerates into a disk.
    pub fn ring(inner: f32, outer: f32, segments: u32, y: f32, color: [f32; 4]) -> Self {
        let mut data = Self::new();
        let segments = segments.max(3);
        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = angle.sin_cos();
            data.vertices.push(Vertex::new(
                [cos * inner, y, sin * inner],
                [0.0, 1.0, 0.0],
                color,
            ));
            data.vertices.push(Vertex::new(
                [cos * outer, y, sin * outer],
                [0.0, 1.0, 0.0],
                color,
            ));
        }
        for i in 0..segments {
            let b = i * 2;
            data.indices
                .extend_from_slice(&[b, b + 3, b + 1, b, b + 2, b + 3]);
        }
        data
    }

    /// Flat ribbon following a polyline, `width` across, facing up. Used for
    /// road surfaces, lane markings, and the soft shadow stroke beneath them.
    pub fn ribbon(polyline: &[Vec3], width: f32, y_offset: f32, color: [f32; 4]) -> Self {
        let mut data = Self::new();
        if polyline.len() < 2 {
            return data;
        }
        let half = width / 2.0;

        for (i, p) in polyline.iter().enumerate() {
            // Tangent from neighbours (one-sided at the ends)
            let prev = polyline[i.saturating_sub(1)];
            let next = polyline[(i + 1).min(polyline.len() - 1)];
            let tangent = Vec3::new(next.x - prev.x, 0.0, next.z - prev.z).normalize_or(Vec3::X);
            let side = Vec3::new(-tangent.z, 0.0, tangent.x) * half;

            let left = *p - side;
            let right = *p + side;
            data.vertices.push(Vertex::new(
                [left.x, p.y + y_offset, left.z],
                [0.0, 1.0, 0.0],
                color,
            ));
            data.vertices.push(Vertex::new(
                [right.x, p.y + y_offset, right.z],
                [0.0, 1.0, 0.0],
                color,
            ));
        }
        for i in 0..(polyline.len() as u32 - 1) {
            let b = i * 2;
            data.indices
                .extend_from_slice(&[b, b + 2, b + 1, b + 1, b + 2, b + 3]);
        }
        data
    }

    /// Dashed variant of `ribbon`: alternating drawn/skipped runs of points.
    pub fn dashed_ribbon(
        polyline: &[Vec3],
        width: f32,
        y_offset: f32,
        dash_points: usize,
        gap_points: usize,
        color: [f32; 4],
    ) -> Self {
        let mut data = Self::new();
        let period = (dash_points + gap_points).max(1);
        let mut i = 0;
        while i + 1 < polyline.len() {
            if (i % period) < dash_points {
                let end = (i + dash_points.max(2)).min(polyline.len());
                let dash = Self::ribbon(&polyline[i..end], width, y_offset, color);
                data.merge(&dash);
                i = end;
            } else {
                i += gap_points.max(1);
            }
        }
        data
    }

    /// Append another mesh's data without transforming it.
    pub fn merge(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_24_vertices_and_36_indices() {
        let b = MeshData::unit_box(Vec3::new(2.0, 4.0, 2.0), [1.0; 4]);
        assert_eq!(b.vertices.len(), 24);
        assert_eq!(b.indices.len(), 36);
    }

    /// Merging N boxes produces one buffer with correctly rebased indices.
    #[test]
    fn append_transformed_rebases_indices() {
        let unit = MeshData::unit_box(Vec3::ONE, [1.0; 4]);
        let mut merged = MeshData::new();
        for i in 0..3 {
            let t = Transform::from_position(Vec3::new(i as f32 * 5.0, 0.0, 0.0));
            merged.append_transformed(&unit, &t);
        }
        assert_eq!(merged.vertices.len(), 72);
        assert_eq!(merged.indices.len(), 108);
        let max_index = *merged.indices.iter().max().unwrap();
        assert_eq!(max_index, 71);
        // Third box actually sits at x = 10
        let x_max = merged
            .vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        assert!((x_max - 10.5).abs() < 1e-5);
    }

    #[test]
    fn ribbon_spans_width_either_side() {
        let line = vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)];
        let r = MeshData::ribbon(&line, 2.0, 0.05, [1.0; 4]);
        assert_eq!(r.vertices.len(), 4);
        let zs: Vec<f32> = r.vertices.iter().map(|v| v.position[2]).collect();
        assert!(zs.iter().any(|&z| (z - 1.0).abs() < 1e-5));
        assert!(zs.iter().any(|&z| (z + 1.0).abs() < 1e-5));
        assert!(r.vertices.iter().all(|v| (v.position[1] - 0.05).abs() < 1e-5));
    }

    #[test]
    fn ribbon_needs_two_points() {
        assert!(MeshData::ribbon(&[Vec3::ZERO], 2.0, 0.0, [1.0; 4]).is_empty());
    }

    #[test]
    fn dashed_ribbon_leaves_gaps() {
        let line: Vec<Vec3> = (0..50)
            .map(|i| Vec3::new(i as f32, 0.0, 0.0))
            .collect();
        let solid = MeshData::ribbon(&line, 1.0, 0.0, [1.0; 4]);
        let dashed = MeshData::dashed_ribbon(&line, 1.0, 0.0, 4, 4, [1.0; 4]);
        assert!(!dashed.is_empty());
        assert!(dashed.vertices.len() < solid.vertices.len() * 2);
        assert!(dashed.indices.len() < solid.indices.len());
    }
}
