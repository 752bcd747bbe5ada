//! Viewer state and the per-frame loop.
//!
//! Frame order follows the scene contract: advance the environment and
//! animation drivers, advance the camera transition, recompute visibility
//! for the now-current pose, then draw with whatever derived buffers are
//! valid. A city/weather/lighting change rebuilds the derived scene
//! synchronously before the next draw.

use anyhow::Result;
use engine_core::{DayClock, FrameClock};
use glam::Vec3;
use input::{InputState, KeyCode};
use renderer::{OrbitCamera, Renderer};
use std::sync::Arc;
use winit::event::{DeviceEvent, WindowEvent};
use winit::window::Window;

use crate::camera_rig::{CameraPreset, CameraRig};
use crate::config::ViewerConfig;
use crate::environment::environment_uniform;
use crate::model::{CityData, Location, LocationKind, Weather};
use crate::picking::PickRay;
use crate::scene::{CityScene, PrimitiveMeshes, SceneKey};
use crate::traffic::VehicleKind;
use crate::visibility::VisibleLocation;

/// Events the core reports to the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// The user clicked a renderable location.
    LocationPicked(String),
    /// The user clicked open terrain while building placement is active.
    GroundPicked(Vec3),
}

pub struct ViewerState {
    pub running: bool,
    config: ViewerConfig,
    renderer: Renderer,
    camera: OrbitCamera,
    rig: CameraRig,
    input: InputState,
    clock: FrameClock,
    day: DayClock,
    weather: Weather,

    city: CityData,
    city_revision: u64,
    scene: CityScene,
    primitives: PrimitiveMeshes,

    selected_id: Option<String>,
    placing_building: bool,
    /// Cursor travel since the left button went down, to tell clicks from
    /// orbit drags.
    press_travel: f32,

    events: Vec<SceneEvent>,
}

impl ViewerState {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let config = ViewerConfig::load();
        let renderer = Renderer::new(window).await?;

        let city = CityData::load_or_demo(&config.city_path());
        log::info!(
            "loaded city '{}': {} locations, {} roads",
            city.name,
            city.locations.len(),
            city.roads.len()
        );

        let mut camera = OrbitCamera::default();
        camera.set_aspect(renderer.size.width, renderer.size.height);

        let day = DayClock::new(12.0);
        let weather = Weather::Clear;
        let key = SceneKey::new(0, weather, day.hour());
        let scene = CityScene::build(&renderer, &city, key, day.hour(), config.seed);
        let primitives = PrimitiveMeshes::upload(&renderer.device);

        Ok(Self {
            running: true,
            config,
            renderer,
            camera,
            rig: CameraRig::new(),
            input: InputState::new(),
            clock: FrameClock::new(),
            day,
            weather,
            city,
            city_revision: 0,
            scene,
            primitives,
            selected_id: None,
            placing_building: false,
            press_travel: 0.0,
            events: Vec::new(),
        })
    }

    /// Queryable camera state for external collaborators.
    pub fn is_transitioning(&self) -> bool {
        self.rig.is_transitioning()
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Handle a window event. Returns true when the app should exit.
    pub fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.config.save();
                return true;
            }
            WindowEvent::Resized(size) => {
                self.renderer.resize(size);
                self.camera.set_aspect(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(code) = event.physical_key {
                    self.input.process_keyboard(code, event.state);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.process_cursor_position((position.x, position.y));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.process_mouse_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                self.input.process_scroll(amount);
            }
            WindowEvent::RedrawRequested => {
                self.frame();
                self.renderer.window.request_redraw();
            }
            _ => {}
        }
        false
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    /// One full frame: drivers, camera, visibility, draw.
    fn frame(&mut self) {
        self.clock.update();
        let dt = self.clock.delta_seconds().min(0.1);
        let time = self.clock.elapsed_seconds();

        self.handle_hotkeys();
        self.day.update(dt);

        // Structural/weather/lighting changes rebuild the derived scene
        // before anything draws.
        self.sync_scene();
        self.sync_selection();

        // 1. Environment and animation drivers.
        self.scene
            .update_animation(dt, time, self.day.hour(), self.day.is_night());

        // 2. Camera: scripted transition first; free input only when idle.
        self.rig.update(&mut self.camera, dt);
        if !self.is_transitioning() {
            self.apply_camera_input(dt);
        }
        self.camera.update(dt);

        // 3. Visibility for the now-current pose.
        let frustum =
            renderer::Frustum::from_view_projection(&self.camera.view_projection_matrix());
        let visible = self.scene.visibility.visible_set(&frustum, self.camera.eye());

        // 4. Draw.
        self.resolve_click();
        self.render(&visible, time);

        // The demo shell is its own collaborator: it just logs the events
        // a host application would consume.
        for event in self.take_events() {
            log::debug!("scene event: {:?}", event);
        }

        self.input.begin_frame();
    }

    fn handle_hotkeys(&mut self) {
        let presets = [
            (KeyCode::Digit1, CameraPreset::Isometric),
            (KeyCode::Digit2, CameraPreset::Aerial),
            (KeyCode::Digit3, CameraPreset::Walkthrough),
            (KeyCode::Digit4, CameraPreset::Cinematic),
            (KeyCode::Digit5, CameraPreset::Free),
        ];
        for (key, preset) in presets {
            if self.input.is_key_pressed(key) {
                self.rig.request_preset(preset, &self.camera);
            }
        }

        if self.input.is_key_pressed(KeyCode::KeyC) {
            self.weather = Weather::Clear;
        }
        if self.input.is_key_pressed(KeyCode::KeyR) {
            self.weather = Weather::Rain;
        }
        if self.input.is_key_pressed(KeyCode::KeyN) {
            self.weather = Weather::Snow;
        }

        if self.input.is_key_pressed(KeyCode::KeyT) {
            self.day.running = !self.day.running;
            log::info!("day cycle {}", if self.day.running { "on" } else { "off" });
        }
        if self.input.is_key_pressed(KeyCode::Comma) {
            let hour = self.day.hour();
            self.day.set_hour(hour - 1.0);
        }
        if self.input.is_key_pressed(KeyCode::Period) {
            let hour = self.day.hour();
            self.day.set_hour(hour + 1.0);
        }

        if self.input.is_key_pressed(KeyCode::KeyB) {
            self.placing_building = !self.placing_building;
            log::info!(
                "building placement {}",
                if self.placing_building { "on" } else { "off" }
            );
        }
        if self.input.is_key_pressed(KeyCode::KeyM) {
            // Plan-view dump, the same data a minimap collaborator reads.
            let snapshot = self.city.map_snapshot();
            log::info!(
                "map snapshot: {} entries, bounds {:?} .. {:?}",
                snapshot.entries.len(),
                snapshot.bounds.0,
                snapshot.bounds.1
            );
            for entry in &snapshot.entries {
                log::info!(
                    "  {} ({:?}) at ({:.1}, {:.1}) tint {:.2},{:.2},{:.2}",
                    entry.id,
                    entry.kind,
                    entry.plan_position.x,
                    entry.plan_position.y,
                    entry.color[0],
                    entry.color[1],
                    entry.color[2]
                );
            }
        }
        if self.input.is_key_pressed(KeyCode::Escape) {
            self.selected_id = None;
            self.rig.clear();
        }
    }

    fn apply_camera_input(&mut self, _dt: f32) {
        let delta = self.input.mouse_delta() * self.config.sensitivity;
        if self.input.is_orbiting() {
            self.camera.orbit(delta.x * 0.005, delta.y * 0.005);
            self.camera.auto_rotate = false;
        } else if self.input.is_panning() {
            self.camera.pan(-delta.x, delta.y);
        }
        let scroll = self.input.scroll_delta();
        if scroll != 0.0 {
            self.camera.zoom(scroll);
        }
    }

    /// Turn a short left-click into a pick: a location first, else (in
    /// placement mode) a ground point.
    fn resolve_click(&mut self) {
        if self.input.is_orbiting() {
            self.press_travel += self.input.mouse_delta().length();
        }
        if self.input.is_mouse_pressed(input::MouseButton::Left) {
            self.press_travel = 0.0;
        }
        if !self.input.is_mouse_released(input::MouseButton::Left) || self.press_travel > 5.0 {
            return;
        }

        let ray = PickRay::from_screen(
            &self.camera,
            self.input.mouse_position(),
            self.renderer.dimensions(),
        );

        if let Some(hit) = self.scene.hit_tester.pick(&ray) {
            log::info!("picked location {}", hit.location_id);
            if let Some(location) = self.city.locations.iter().find(|l| l.id == hit.location_id)
            {
                self.rig.request_fly_to(location.position());
            }
            self.selected_id = Some(hit.location_id.clone());
            self.events.push(SceneEvent::LocationPicked(hit.location_id));
        } else if self.placing_building {
            if let Some(point) = ray.ground_hit() {
                self.events.push(SceneEvent::GroundPicked(point));
                self.add_building(point);
            }
        }
    }

    /// The demo binary doubles as the location-data owner: a ground pick in
    /// placement mode appends a building, bumping the city revision.
    fn add_building(&mut self, point: Vec3) {
        let id = format!("placed-{}", self.city.locations.len());
        log::info!("placing building {} at ({:.1}, {:.1})", id, point.x, point.z);
        self.city.locations.push(Location {
            id,
            name: format!("New Building at ({:.1}, {:.1})", point.x, point.z),
            description: String::new(),
            kind: LocationKind::Building,
            position: [point.x, 0.0, point.z],
            color: None,
            zone: None,
        });
        self.city_revision += 1;
        self.placing_building = false;
    }

    /// Rebuild the derived scene when (and only when) its inputs changed.
    fn sync_scene(&mut self) {
        let key = SceneKey::new(self.city_revision, self.weather, self.day.hour());
        if key != self.scene.key() {
            self.scene = CityScene::build(
                &self.renderer,
                &self.city,
                key,
                self.day.hour(),
                self.config.seed,
            );
        }
    }

    fn sync_selection(&mut self) {
        let slot = self
            .selected_id
            .as_ref()
            .and_then(|id| self.city.locations.iter().position(|l| &l.id == id));
        self.scene.sync_selection(&self.renderer, &self.city, slot);
    }

    fn render(&mut self, visible: &[VisibleLocation], time: f32) {
        self.renderer.update_camera(&self.camera);
        self.renderer
            .update_environment(&environment_uniform(self.day.hour(), self.weather));

        let (output, mut encoder) = match self.renderer.begin_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("skipping frame: {}", e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render_sky(&mut encoder, &view);

        // Merged static meshes: one draw call each.
        let meshes = &self.scene.meshes;
        self.renderer.render_merged(&mut encoder, &view, &meshes.terrain);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.park_pads);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.road_shadow);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.road_surface);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.road_markings);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.sidewalks);
        self.renderer.render_merged(&mut encoder, &view, &meshes.walls);
        self.renderer.render_merged(&mut encoder, &view, &meshes.roofs);
        self.renderer.render_merged(&mut encoder, &view, &meshes.lamps);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.benches);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.trash_cans);
        self.renderer.render_merged(&mut encoder, &view, &meshes.signs);
        self.renderer
            .render_merged(&mut encoder, &view, &meshes.light_poles);
        if let Some(ring) = self.scene.selection_mesh() {
            self.renderer.render_merged(&mut encoder, &view, ring);
        }

        // Windows, LOD-gated per building: only high-tier buildings show
        // windows; the bare merged box is the cheap far representation.
        let (lit, dark) = self.scene.window_instances(visible, time);
        self.renderer
            .render_instanced(&mut encoder, &view, &self.primitives.unit_cube, lit);
        self.renderer
            .render_instanced(&mut encoder, &view, &self.primitives.unit_cube, dark);

        // Vegetation batches.
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.trunk,
            self.scene.vegetation.trunk_instances(),
        );
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.foliage,
            self.scene.vegetation.foliage_instances(),
        );
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.grass_blade,
            self.scene.vegetation.grass_instances(),
        );
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.bush,
            self.scene.vegetation.bush_instances(),
        );
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.flower,
            self.scene.vegetation.flower_instances(),
        );

        // Lamp bulbs and traffic lights.
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.bulb,
            self.scene.streets.bulb_instances(),
        );
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            &self.primitives.unit_sphere,
            self.scene.traffic.light_instances(),
        );

        // Vehicles: one instanced draw per kind.
        for kind in VehicleKind::ALL {
            self.renderer.render_instanced(
                &mut encoder,
                &view,
                &self.primitives.unit_cube,
                self.scene.traffic.vehicle_instances(kind),
            );
        }

        // Weather particles.
        let particle_mesh = match self.weather {
            Weather::Rain => &self.primitives.unit_cube,
            _ => &self.primitives.unit_sphere,
        };
        self.renderer.render_instanced(
            &mut encoder,
            &view,
            particle_mesh,
            self.scene.particles.instances(),
        );

        self.renderer.end_frame(output, encoder);
    }
}
