//! Camera transition rig.
//!
//! A small state machine (Idle / Transitioning) that owns every scripted
//! camera move. UI code talks to it only through `request_preset`,
//! `request_fly_to`, and `is_transitioning` — there is no ambient camera
//! handle. While a transition runs, free orbit input is suppressed so user
//! input and the animation never fight over the camera in the same frame.

use glam::Vec3;
use renderer::{CameraPose, OrbitCamera};
use std::collections::VecDeque;

/// Easing functions mapping linear progress to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    /// Default for preset moves; symmetric, 0.5 ↦ 0.5.
    CubicInOut,
    /// Fast start, soft landing; used for fly-to.
    QuartOut,
    QuintInOut,
    ElasticOut,
}

impl Easing {
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::QuartOut => 1.0 - (1.0 - t).powi(4),
            Easing::QuintInOut => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    let c4 = std::f32::consts::TAU / 3.0;
                    2.0_f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
                }
            }
        }
    }
}

/// Named destination poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPreset {
    Isometric,
    Aerial,
    Walkthrough,
    Cinematic,
    Free,
}

impl CameraPreset {
    pub fn pose(&self) -> CameraPose {
        match self {
            CameraPreset::Isometric => {
                CameraPose::new(Vec3::new(30.0, 30.0, 30.0), Vec3::ZERO, 50.0)
            }
            CameraPreset::Aerial => CameraPose::new(Vec3::new(0.0, 80.0, 0.0), Vec3::ZERO, 60.0),
            CameraPreset::Walkthrough => {
                CameraPose::new(Vec3::new(0.0, 2.0, 10.0), Vec3::new(0.0, 2.0, 0.0), 75.0)
            }
            CameraPreset::Cinematic => {
                CameraPose::new(Vec3::new(50.0, 25.0, 50.0), Vec3::ZERO, 45.0)
            }
            CameraPreset::Free => CameraPose::new(Vec3::new(20.0, 20.0, 20.0), Vec3::ZERO, 75.0),
        }
    }
}

/// What to do when a transition lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnComplete {
    None,
    /// Cinematic preset turns slow auto-rotate on.
    EnableAutoRotate,
}

/// One scripted camera move. `from` is captured from the live camera when
/// the transition actually starts, never when it is queued.
#[derive(Debug, Clone)]
struct Transition {
    to: CameraPose,
    duration: f32,
    easing: Easing,
    on_complete: OnComplete,
}

/// An in-flight transition with its captured start pose and clock.
#[derive(Debug, Clone)]
struct ActiveTransition {
    from: CameraPose,
    to: CameraPose,
    duration: f32,
    easing: Easing,
    on_complete: OnComplete,
    elapsed: f32,
}

impl ActiveTransition {
    /// Pose at the current clock. Exact endpoints at t=0 and t=duration.
    fn pose(&self) -> CameraPose {
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        };
        self.from.lerp(&self.to, self.easing.apply(t))
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// The camera transition controller.
pub struct CameraRig {
    active: Option<ActiveTransition>,
    queue: VecDeque<Transition>,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraRig {
    pub fn new() -> Self {
        Self {
            active: None,
            queue: VecDeque::new(),
        }
    }

    /// Whether a scripted move currently owns the camera.
    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    /// Queue a move to a named preset.
    pub fn request_preset(&mut self, preset: CameraPreset, camera: &OrbitCamera) {
        let to = preset.pose();
        // A request that would go nowhere is ignored, not queued.
        if !self.is_transitioning() && self.queue.is_empty() && poses_match(&camera.pose(), &to) {
            return;
        }
        let on_complete = if preset == CameraPreset::Cinematic {
            OnComplete::EnableAutoRotate
        } else {
            OnComplete::None
        };
        self.queue.push_back(Transition {
            to,
            duration: 2.5,
            easing: Easing::CubicInOut,
            on_complete,
        });
    }

    /// Queue a fly-to: land beside the point, looking at it.
    pub fn request_fly_to(&mut self, point: Vec3) {
        self.queue.push_back(Transition {
            to: CameraPose::new(point + Vec3::new(10.0, 10.0, 10.0), point, 60.0),
            duration: 1.8,
            easing: Easing::QuartOut,
            on_complete: OnComplete::None,
        });
    }

    /// Drop every queued move and stop the active one where it stands.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.active = None;
    }

    /// Advance the rig by one frame. Applies the interpolated pose to the
    /// camera while a transition runs; starts the next queued transition
    /// from the live pose otherwise.
    pub fn update(&mut self, camera: &mut OrbitCamera, dt: f32) {
        if self.active.is_none() {
            if let Some(next) = self.queue.pop_front() {
                camera.auto_rotate = false;
                self.active = Some(ActiveTransition {
                    from: camera.pose(),
                    to: next.to,
                    duration: next.duration,
                    easing: next.easing,
                    on_complete: next.on_complete,
                    elapsed: 0.0,
                });
            }
        }

        if let Some(active) = &mut self.active {
            active.elapsed += dt;
            let finished = active.finished();
            let pose = if finished { active.to } else { active.pose() };
            camera.set_pose(&pose);
            if finished {
                if active.on_complete == OnComplete::EnableAutoRotate {
                    camera.auto_rotate = true;
                }
                self.active = None;
            }
        }
    }

    /// Evaluate the in-flight pose at an explicit clock value without
    /// mutating anything. Test/debug hook.
    pub fn pose_at(&self, elapsed: f32) -> Option<CameraPose> {
        self.active.as_ref().map(|a| {
            let mut probe = a.clone();
            probe.elapsed = elapsed;
            probe.pose()
        })
    }
}

fn poses_match(a: &CameraPose, b: &CameraPose) -> bool {
    (a.position - b.position).length() < 0.05
        && (a.target - b.target).length() < 0.05
        && (a.fov_degrees - b.fov_degrees).abs() < 0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(pose: CameraPose) -> OrbitCamera {
        let mut c = OrbitCamera::default();
        c.set_pose(&pose);
        c
    }

    #[test]
    fn cubic_in_out_is_exact_at_ends_and_midpoint() {
        assert_eq!(Easing::CubicInOut.apply(0.0), 0.0);
        assert_eq!(Easing::CubicInOut.apply(1.0), 1.0);
        assert!((Easing::CubicInOut.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn other_easings_hit_both_ends() {
        for e in [Easing::QuartOut, Easing::QuintInOut, Easing::ElasticOut] {
            assert!(e.apply(0.0).abs() < 1e-6);
            assert!((e.apply(1.0) - 1.0).abs() < 1e-6);
        }
    }

    /// Pose at t=0 is the start pose, t=d the destination, and the
    /// cubic-in-out midpoint is the exact pose midpoint.
    #[test]
    fn transition_is_deterministic() {
        let start = CameraPose::new(Vec3::new(40.0, 20.0, 0.0), Vec3::ZERO, 75.0);
        let mut camera = camera_at(start);
        let live = camera.pose();

        let mut rig = CameraRig::new();
        rig.request_preset(CameraPreset::Isometric, &camera);
        rig.update(&mut camera, 0.0);
        assert!(rig.is_transitioning());

        let p0 = rig.pose_at(0.0).unwrap();
        assert!((p0.position - live.position).length() < 1e-4);

        let end = rig.pose_at(2.5).unwrap();
        let dest = CameraPreset::Isometric.pose();
        assert!((end.position - dest.position).length() < 1e-4);
        assert_eq!(end.fov_degrees, dest.fov_degrees);

        let mid = rig.pose_at(1.25).unwrap();
        let expected = live.lerp(&dest, 0.5);
        assert!((mid.position - expected.position).length() < 1e-3);
    }

    #[test]
    fn requests_queue_fifo_and_complete_in_order() {
        let mut camera = camera_at(CameraPose::new(
            Vec3::new(5.0, 30.0, 5.0),
            Vec3::ZERO,
            75.0,
        ));
        let mut rig = CameraRig::new();
        rig.request_preset(CameraPreset::Aerial, &camera);
        rig.request_fly_to(Vec3::new(10.0, 0.0, 10.0));

        // First transition runs to completion...
        for _ in 0..26 {
            rig.update(&mut camera, 0.1);
        }
        // ...then the queued fly-to starts.
        assert!(rig.is_transitioning());
        for _ in 0..19 {
            rig.update(&mut camera, 0.1);
        }
        assert!(!rig.is_transitioning());
        assert!((camera.target - Vec3::new(10.0, 0.0, 10.0)).length() < 0.5);
    }

    #[test]
    fn noop_request_is_ignored_not_queued() {
        let mut camera = camera_at(CameraPreset::Isometric.pose());
        let mut rig = CameraRig::new();
        rig.request_preset(CameraPreset::Isometric, &camera);
        rig.update(&mut camera, 0.016);
        assert!(!rig.is_transitioning());
    }

    #[test]
    fn clear_drops_queue_and_active() {
        let mut camera = camera_at(CameraPose::new(
            Vec3::new(60.0, 40.0, 0.0),
            Vec3::ZERO,
            75.0,
        ));
        let mut rig = CameraRig::new();
        rig.request_preset(CameraPreset::Aerial, &camera);
        rig.request_preset(CameraPreset::Cinematic, &camera);
        rig.update(&mut camera, 0.1);
        assert!(rig.is_transitioning());
        rig.clear();
        assert!(!rig.is_transitioning());
        let before = camera.pose();
        rig.update(&mut camera, 0.1);
        assert!(poses_match(&before, &camera.pose()));
    }

    #[test]
    fn cinematic_enables_auto_rotate_on_completion() {
        let mut camera = camera_at(CameraPose::new(
            Vec3::new(5.0, 30.0, 5.0),
            Vec3::ZERO,
            75.0,
        ));
        let mut rig = CameraRig::new();
        rig.request_preset(CameraPreset::Cinematic, &camera);
        for _ in 0..30 {
            rig.update(&mut camera, 0.1);
        }
        assert!(!rig.is_transitioning());
        assert!(camera.auto_rotate);
    }
}
