//! Time-stepped environment drivers: weather particles, the light rig, and
//! fog. Everything here advances from elapsed time and the shared
//! hour/weather parameters; nothing re-derives scene geometry.

use glam::Vec3;
use procgen::mix_seed;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::{EnvironmentUniform, InstanceData};

use crate::model::{hex_color, lerp_color, Weather};

/// Direction toward the sun for an hour of day. The elevation angle is
/// measured from the zenith: overhead at noon, on the horizon at 06:00 and
/// 18:00, below it at night.
pub fn sun_direction(hour: f32) -> Vec3 {
    let angle = (hour - 12.0) * (std::f32::consts::PI / 12.0);
    Vec3::new(angle.sin(), angle.cos(), 0.0).normalize()
}

fn is_night(hour: f32) -> bool {
    hour < 6.0 || hour > 18.0
}

/// Flat ambient intensity, damped by weather.
pub fn ambient_intensity(hour: f32, weather: Weather) -> f32 {
    let base = if is_night(hour) { 0.15 } else { 0.6 };
    match weather {
        Weather::Rain => base * 0.7,
        Weather::Snow => base * 0.9,
        Weather::Clear => base,
    }
}

/// Directional sun intensity, damped by weather.
pub fn directional_intensity(hour: f32, weather: Weather) -> f32 {
    let base = if is_night(hour) { 0.2 } else { 1.2 };
    match weather {
        Weather::Rain => base * 0.6,
        Weather::Snow => base * 0.8,
        Weather::Clear => base,
    }
}

/// Fog color and density for the current weather; nights dim the fog color
/// so the horizon doesn't glow.
pub fn fog_params(weather: Weather, night: bool) -> [f32; 4] {
    let (color, density) = match weather {
        Weather::Rain => (hex_color("#8ca9c0").unwrap_or([0.55, 0.66, 0.75, 1.0]), 0.010),
        Weather::Snow => (hex_color("#e5e7eb").unwrap_or([0.9, 0.91, 0.92, 1.0]), 0.008),
        Weather::Clear => (hex_color("#e0f2fe").unwrap_or([0.88, 0.95, 1.0, 1.0]), 0.003),
    };
    let dim = if night { 0.25 } else { 1.0 };
    [color[0] * dim, color[1] * dim, color[2] * dim, density]
}

/// Build the full GPU environment uniform for an hour/weather pair.
pub fn environment_uniform(hour: f32, weather: Weather) -> EnvironmentUniform {
    let night = is_night(hour);
    let sun = sun_direction(hour);
    // Day-night blend follows how high the sun actually stands.
    let daylight = sun.y.clamp(0.0, 1.0);

    let sun_color = if night {
        hex_color("#6366f1").unwrap_or([0.39, 0.4, 0.95, 1.0])
    } else {
        [1.0, 1.0, 1.0, 1.0]
    };
    let ambient_color = if night {
        hex_color("#4a5568").unwrap_or([0.29, 0.33, 0.41, 1.0])
    } else {
        [1.0, 1.0, 1.0, 1.0]
    };

    let hemisphere_sky = if night {
        hex_color("#1a202c").unwrap_or([0.1, 0.13, 0.17, 1.0])
    } else {
        hex_color("#87ceeb").unwrap_or([0.53, 0.81, 0.92, 1.0])
    };
    let hemisphere_ground = if night {
        hex_color("#2d3748").unwrap_or([0.18, 0.22, 0.28, 1.0])
    } else {
        hex_color("#8fbc8f").unwrap_or([0.56, 0.74, 0.56, 1.0])
    };

    let (zenith_day, horizon_day) = match weather {
        Weather::Clear => ([0.35, 0.6, 0.9, 1.0], [0.8, 0.88, 0.95, 1.0]),
        Weather::Rain => ([0.35, 0.42, 0.52, 1.0], [0.55, 0.62, 0.7, 1.0]),
        Weather::Snow => ([0.62, 0.68, 0.76, 1.0], [0.85, 0.87, 0.9, 1.0]),
    };
    let zenith_night = [0.02, 0.03, 0.08, 1.0];
    let horizon_night = [0.05, 0.08, 0.15, 1.0];

    let ambient = ambient_intensity(hour, weather);
    EnvironmentUniform {
        sun_direction: [sun.x, sun.y, sun.z, 0.0],
        sun_color: [
            sun_color[0],
            sun_color[1],
            sun_color[2],
            directional_intensity(hour, weather),
        ],
        ambient_color: [ambient_color[0], ambient_color[1], ambient_color[2], ambient],
        hemisphere_sky: [
            hemisphere_sky[0],
            hemisphere_sky[1],
            hemisphere_sky[2],
            ambient * 0.6,
        ],
        hemisphere_ground,
        fog: fog_params(weather, night),
        sky_zenith: lerp_color(zenith_night, zenith_day, daylight),
        sky_horizon: lerp_color(horizon_night, horizon_day, daylight),
    }
}

/// Pool sizes per weather kind.
const RAIN_COUNT: usize = 500;
const SNOW_COUNT: usize = 300;

const SPAWN_SPREAD: f32 = 80.0;
const SPAWN_HEIGHT: f32 = 30.0;

const RAIN_COLOR: [f32; 4] = [0.66, 0.78, 1.0, 1.0];
const SNOW_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone)]
struct Particle {
    position: Vec3,
    velocity: Vec3,
}

/// Fixed pool of falling rain/snow particles. Particles loop: when one
/// drops below ground it respawns at the top with fresh drift.
pub struct WeatherParticles {
    weather: Weather,
    particles: Vec<Particle>,
    instances: Vec<InstanceData>,
    rng: StdRng,
}

impl WeatherParticles {
    pub fn new(weather: Weather, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, 0xa17));
        let count = match weather {
            Weather::Rain => RAIN_COUNT,
            Weather::Snow => SNOW_COUNT,
            Weather::Clear => 0,
        };
        let particles = (0..count)
            .map(|_| Self::spawn(weather, &mut rng, true))
            .collect();
        Self {
            weather,
            particles,
            instances: Vec::with_capacity(count),
            rng,
        }
    }

    fn spawn(weather: Weather, rng: &mut StdRng, anywhere: bool) -> Particle {
        let y = if anywhere {
            // Initial fill staggers particles through the whole column.
            rng.gen::<f32>() * (SPAWN_HEIGHT + 10.0)
        } else {
            SPAWN_HEIGHT + rng.gen::<f32>() * 10.0
        };
        let fall = match weather {
            Weather::Rain => 12.0 + rng.gen::<f32>() * 12.0,
            _ => 1.8 + rng.gen::<f32>() * 3.0,
        };
        let drift = match weather {
            Weather::Rain => 0.6,
            _ => 1.2,
        };
        Particle {
            position: Vec3::new(
                (rng.gen::<f32>() - 0.5) * SPAWN_SPREAD,
                y,
                (rng.gen::<f32>() - 0.5) * SPAWN_SPREAD,
            ),
            velocity: Vec3::new(
                (rng.gen::<f32>() - 0.5) * drift,
                -fall,
                (rng.gen::<f32>() - 0.5) * drift,
            ),
        }
    }

    /// Advance the fall. Rewrites the instance buffer in place.
    pub fn update(&mut self, dt: f32) {
        self.instances.clear();
        let (scale, color) = match self.weather {
            Weather::Rain => (Vec3::new(0.01, 0.12, 0.01), RAIN_COLOR),
            _ => (Vec3::splat(0.06), SNOW_COLOR),
        };

        for particle in &mut self.particles {
            particle.position += particle.velocity * dt;
            if particle.position.y < 0.0 {
                *particle = Self::spawn(self.weather, &mut self.rng, false);
            }
            let transform =
                engine_core::Transform::from_position_scale(particle.position, scale);
            self.instances.push(InstanceData::with_emissive(
                transform.to_matrix().to_cols_array_2d(),
                color,
                [color[0], color[1], color[2], 0.3],
            ));
        }
    }

    pub fn instances(&self) -> &[InstanceData] {
        &self.instances
    }

    pub fn count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sun_overhead_at_noon_horizon_at_six() {
        let noon = sun_direction(12.0);
        assert!(noon.y > 0.999);
        let morning = sun_direction(6.0);
        assert!(morning.y.abs() < 1e-4);
        let midnight = sun_direction(0.0);
        assert!(midnight.y < 0.0);
    }

    #[test]
    fn light_intensities_follow_day_and_weather() {
        assert_eq!(ambient_intensity(12.0, Weather::Clear), 0.6);
        assert_eq!(ambient_intensity(2.0, Weather::Clear), 0.15);
        assert!((ambient_intensity(12.0, Weather::Rain) - 0.42).abs() < 1e-5);
        assert_eq!(directional_intensity(12.0, Weather::Clear), 1.2);
        assert!((directional_intensity(12.0, Weather::Snow) - 0.96).abs() < 1e-5);
    }

    #[test]
    fn fog_varies_by_weather_class() {
        let rain = fog_params(Weather::Rain, false);
        let snow = fog_params(Weather::Snow, false);
        let clear = fog_params(Weather::Clear, false);
        assert!(rain[3] > snow[3] && snow[3] > clear[3]);
        // Blue-ish rain fog, light snow fog.
        assert!(rain[2] > rain[0]);
        assert!(snow[0] > 0.8);
        // Night dims the color, never the density.
        let night = fog_params(Weather::Rain, true);
        assert!(night[0] < rain[0]);
        assert_eq!(night[3], rain[3]);
    }

    #[test]
    fn particle_pools_match_weather() {
        assert_eq!(WeatherParticles::new(Weather::Rain, 1).count(), 500);
        assert_eq!(WeatherParticles::new(Weather::Snow, 1).count(), 300);
        assert_eq!(WeatherParticles::new(Weather::Clear, 1).count(), 0);
    }

    #[test]
    fn particles_fall_and_respawn_above_ground() {
        let mut particles = WeatherParticles::new(Weather::Rain, 7);
        for _ in 0..600 {
            particles.update(0.1);
        }
        assert_eq!(particles.count(), 500);
        for p in &particles.particles {
            assert!(p.position.y >= -3.0, "particles respawn instead of sinking");
            assert!(p.velocity.y < 0.0);
        }
        assert_eq!(particles.instances().len(), 500);
    }

    #[test]
    fn uniform_blends_day_to_night() {
        let day = environment_uniform(12.0, Weather::Clear);
        let night = environment_uniform(0.0, Weather::Clear);
        assert!(day.sky_zenith[2] > night.sky_zenith[2]);
        assert!(day.sun_color[3] > night.sun_color[3]);
    }
}
