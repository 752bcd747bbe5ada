//! cityscape - interactive procedural 3D city viewer

mod app;
mod camera_rig;
mod config;
mod environment;
mod model;
mod picking;
mod scene;
mod traffic;
mod visibility;

use anyhow::Result;
use app::ViewerState;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

/// Application handler for winit.
struct App {
    state: Option<ViewerState>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let config = config::ViewerConfig::load();
            let window_attrs = Window::default_attributes()
                .with_title("cityscape")
                .with_inner_size(winit::dpi::LogicalSize::new(
                    config.window_width,
                    config.window_height,
                ));

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let state = pollster::block_on(ViewerState::new(window.clone()));
            match state {
                Ok(s) => {
                    self.state = Some(s);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to initialize viewer: {}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║                         cityscape                        ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  CONTROLS:                                               ║");
    println!("║    Drag       - Orbit          │  Right-drag - Pan       ║");
    println!("║    Scroll     - Zoom           │  Click      - Select    ║");
    println!("║    1-5        - Camera presets │  Escape     - Deselect  ║");
    println!("║    C / R / N  - Clear/Rain/Snow│  T          - Day cycle ║");
    println!("║    , / .      - Scrub the hour │  B          - Place mode║");
    println!("╚══════════════════════════════════════════════════════════╝");

    log::info!("Starting cityscape");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
