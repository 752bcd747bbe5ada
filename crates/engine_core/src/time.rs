//! Frame timing and the simulated time-of-day clock.

use std::time::{Duration, Instant};

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct FrameClock {
    /// Time when the viewer started.
    start_time: Instant,
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_frame: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.elapsed = now - self.start_time;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

/// Simulated wall-clock driving lighting, window lights, and traffic volume.
///
/// Holds an hour value in `[0, 24)`. The hour can be set directly (scrubbed
/// from the UI) or advanced continuously when the day cycle is running.
#[derive(Debug, Clone)]
pub struct DayClock {
    hour: f32,
    /// Whether the hour advances on its own each frame.
    pub running: bool,
    /// Simulated hours per real second while running.
    pub hours_per_second: f32,
}

impl Default for DayClock {
    fn default() -> Self {
        Self {
            hour: 12.0,
            running: false,
            hours_per_second: 0.25,
        }
    }
}

impl DayClock {
    pub fn new(hour: f32) -> Self {
        Self {
            hour: hour.rem_euclid(24.0),
            ..Default::default()
        }
    }

    /// Current hour in `[0, 24)`.
    pub fn hour(&self) -> f32 {
        self.hour
    }

    /// Set the hour directly, wrapping into `[0, 24)`.
    pub fn set_hour(&mut self, hour: f32) {
        self.hour = hour.rem_euclid(24.0);
    }

    /// Advance the clock if the day cycle is running.
    pub fn update(&mut self, dt: f32) {
        if self.running {
            self.hour = (self.hour + dt * self.hours_per_second).rem_euclid(24.0);
        }
    }

    /// Night spans 18:00–06:00.
    pub fn is_night(&self) -> bool {
        self.hour < 6.0 || self.hour > 18.0
    }

    /// Business hours span 09:00–17:00.
    pub fn is_business_hours(&self) -> bool {
        self.hour >= 9.0 && self.hour <= 17.0
    }

    /// Sun elevation angle in radians: 0 at noon, ±π/2 at 06:00/18:00.
    pub fn sun_angle(&self) -> f32 {
        (self.hour - 12.0) * (std::f32::consts::PI / 12.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_clock_wraps_hour() {
        let mut clock = DayClock::new(23.5);
        clock.running = true;
        clock.hours_per_second = 1.0;
        clock.update(1.0);
        assert!((clock.hour() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn day_clock_night_and_business_windows() {
        assert!(DayClock::new(2.0).is_night());
        assert!(DayClock::new(22.0).is_night());
        assert!(!DayClock::new(12.0).is_night());
        assert!(DayClock::new(12.0).is_business_hours());
        assert!(!DayClock::new(8.0).is_business_hours());
    }

    #[test]
    fn sun_angle_zero_at_noon() {
        assert!(DayClock::new(12.0).sun_angle().abs() < 1e-6);
        let morning = DayClock::new(6.0).sun_angle();
        assert!((morning + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn paused_clock_holds_hour() {
        let mut clock = DayClock::new(9.0);
        clock.update(100.0);
        assert_eq!(clock.hour(), 9.0);
    }
}
