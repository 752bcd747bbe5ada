//! Spline synthesis for roads and traffic paths.
//!
//! Control points interpolate between two endpoints with deterministic
//! jitter and a perpendicular bulge that peaks mid-span (`sin(t·π)`), then a
//! Catmull-Rom pass smooths them into a dense polyline. Endpoints are always
//! exact: jitter and bulge apply to interior points only.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

/// Shape parameters for one curve class.
#[derive(Debug, Clone, Copy)]
pub struct CurveStyle {
    /// Number of spans between control points (control count = segments + 1).
    pub segments: usize,
    /// Max random lateral/longitudinal jitter per interior point.
    pub jitter: f32,
    /// Peak perpendicular offset at mid-span.
    pub bulge: f32,
    /// Constant height above ground for every point.
    pub elevation: f32,
}

/// Build the control polygon for a curve between `start` and `end`.
pub fn control_points(start: Vec3, end: Vec3, style: CurveStyle, rng: &mut StdRng) -> Vec<Vec3> {
    let segments = style.segments.max(1);
    let mut points = Vec::with_capacity(segments + 1);

    let delta = Vec2::new(end.x - start.x, end.z - start.z);
    let length = delta.length();
    let perpendicular = if length > 1e-4 {
        Vec2::new(-delta.y, delta.x) / length
    } else {
        Vec2::ZERO
    };

    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let x = start.x + (end.x - start.x) * t;
        let z = start.z + (end.z - start.z) * t;

        if i == 0 {
            points.push(Vec3::new(start.x, style.elevation, start.z));
            continue;
        }
        if i == segments {
            points.push(Vec3::new(end.x, style.elevation, end.z));
            continue;
        }

        let jitter_x = (rng.gen::<f32>() - 0.5) * style.jitter;
        let jitter_z = (rng.gen::<f32>() - 0.5) * style.jitter;
        let swell = (t * std::f32::consts::PI).sin() * style.bulge;

        points.push(Vec3::new(
            x + jitter_x + perpendicular.x * swell,
            style.elevation,
            z + jitter_z + perpendicular.y * swell,
        ));
    }

    points
}

/// Catmull-Rom interpolation between `p1` and `p2` with neighbours `p0`/`p3`.
pub fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - 3.0 * p2 + p0 - p3) * t3)
}

/// Sample a Catmull-Rom curve through the control points into a polyline of
/// `samples + 1` points. End tangents are clamped by duplicating the ends,
/// so the polyline passes exactly through the first and last control points.
pub fn sample_curve(control: &[Vec3], samples: usize) -> Vec<Vec3> {
    match control.len() {
        0 => return Vec::new(),
        1 => return vec![control[0]],
        2 => {
            // Straight segment: plain lerp
            return (0..=samples)
                .map(|i| control[0].lerp(control[1], i as f32 / samples.max(1) as f32))
                .collect();
        }
        _ => {}
    }

    let n = control.len();
    let spans = n - 1;
    let mut out = Vec::with_capacity(samples + 1);

    for i in 0..=samples {
        let u = i as f32 / samples as f32 * spans as f32;
        let span = (u.floor() as usize).min(spans - 1);
        let t = u - span as f32;

        let p0 = control[span.saturating_sub(1)];
        let p1 = control[span];
        let p2 = control[span + 1];
        let p3 = control[(span + 2).min(n - 1)];
        out.push(catmull_rom(p0, p1, p2, p3, t));
    }

    out
}

/// Point on a polyline at normalized parameter `t ∈ [0, 1]` (clamped),
/// parameterized uniformly over the samples.
pub fn point_at(polyline: &[Vec3], t: f32) -> Vec3 {
    match polyline.len() {
        0 => Vec3::ZERO,
        1 => polyline[0],
        n => {
            let u = t.clamp(0.0, 1.0) * (n - 1) as f32;
            let i = (u.floor() as usize).min(n - 2);
            polyline[i].lerp(polyline[i + 1], u - i as f32)
        }
    }
}

/// Travel direction at `t`, from a small forward difference.
pub fn tangent_at(polyline: &[Vec3], t: f32) -> Vec3 {
    let here = point_at(polyline, t);
    let ahead = point_at(polyline, (t + 0.01).min(1.0));
    let d = ahead - here;
    if d.length_squared() > 1e-10 {
        d.normalize()
    } else {
        // At the very end, look backwards instead.
        let behind = point_at(polyline, (t - 0.01).max(0.0));
        (here - behind).normalize_or(Vec3::Z)
    }
}

/// Total length of a polyline.
pub fn polyline_length(polyline: &[Vec3]) -> f32 {
    polyline.windows(2).map(|w| w[0].distance(w[1])).sum()
}
