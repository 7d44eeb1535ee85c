//! Window shell shared by the native binary and the web entry point.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use parking_lot::RwLock;
use winit::dpi::PhysicalPosition;
use winit::event::{
    ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent,
};
use winit::event_loop::EventLoopWindowTarget;
use winit::keyboard::{Key, NamedKey};

use crate::config::GalleryOptions;
use crate::device::DeviceProfile;
use crate::gallery::{Container, GalleryFacade, GalleryScene};
use crate::render::Renderer;

/// Bend values cycled with the `b` key.
pub const BEND_PRESETS: [f32; 3] = [-2.0, 0.0, 2.0];
/// Pixels scrolled per wheel line, matching common browser defaults.
const WHEEL_LINE_PX: f32 = 100.0;

/// Container backed by a window; reports its logical size.
#[derive(Debug)]
pub struct WindowContainer {
    size: RwLock<(u32, u32)>,
    user_agent: Option<String>,
}

impl WindowContainer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width, height)),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width, height);
    }
}

impl Container for WindowContainer {
    fn size(&self) -> (u32, u32) {
        *self.size.read()
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }
}

/// Monotonic milliseconds for input timing and settle timers.
pub struct Clock {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    performance: Option<web_sys::Performance>,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            performance: web_sys::window().and_then(|window| window.performance()),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    #[cfg(target_arch = "wasm32")]
    pub fn now_ms(&self) -> f64 {
        self.performance
            .as_ref()
            .map(|performance| performance.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Cycles through [`BEND_PRESETS`], starting over from the first preset for
/// custom values.
pub fn next_bend(bend: f32) -> f32 {
    BEND_PRESETS
        .iter()
        .position(|preset| (preset - bend).abs() < f32::EPSILON)
        .map(|index| BEND_PRESETS[(index + 1) % BEND_PRESETS.len()])
        .unwrap_or(BEND_PRESETS[0])
}

/// Converts a wheel event into a DOM-style `deltaY` in pixels, positive when
/// scrolling down.
pub fn wheel_delta_px(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, lines) => -lines * WHEEL_LINE_PX,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

pub struct GalleryApp {
    renderer: Renderer,
    facade: GalleryFacade,
    container: Arc<WindowContainer>,
    clock: Clock,
    mounted_generation: u64,
    cursor_x: f32,
    active_touch: Option<u64>,
}

impl GalleryApp {
    pub fn new(renderer: Renderer, facade: GalleryFacade, container: Arc<WindowContainer>) -> Self {
        let mut app = Self {
            renderer,
            facade,
            container,
            clock: Clock::new(),
            mounted_generation: 0,
            cursor_x: 0.0,
            active_touch: None,
        };
        app.sync_generation();
        app
    }

    pub fn facade(&self) -> &GalleryFacade {
        &self.facade
    }

    pub fn shutdown(&mut self) {
        self.facade.unmount();
        self.renderer.reset_textures();
    }

    pub fn process_event(
        &mut self,
        event: &Event<()>,
        target: &EventLoopWindowTarget<()>,
    ) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        self.handle_resize();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        self.handle_keyboard(event, target)?;
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        self.cursor_x = self.logical_x(*position);
                        let now = self.clock.now_ms();
                        self.facade.on_pointer_move(self.cursor_x, now);
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        let now = self.clock.now_ms();
                        match state {
                            ElementState::Pressed => {
                                self.facade.on_pointer_down(self.cursor_x, now)
                            }
                            ElementState::Released => self.facade.on_pointer_up(now),
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let now = self.clock.now_ms();
                        self.facade.on_wheel(wheel_delta_px(*delta), now);
                    }
                    WindowEvent::Touch(touch) => self.handle_touch(touch),
                    WindowEvent::RedrawRequested => self.redraw()?,
                    _ => {}
                }
            }
            Event::AboutToWait => {
                self.renderer.window().request_redraw();
            }
            Event::LoopExiting => self.shutdown(),
            _ => {}
        }
        Ok(())
    }

    fn logical_x(&self, position: PhysicalPosition<f64>) -> f32 {
        position
            .to_logical::<f32>(self.renderer.window().scale_factor())
            .x
    }

    fn handle_resize(&mut self) {
        let window = self.renderer.window();
        let size = window.inner_size();
        let logical = size.to_logical::<u32>(window.scale_factor());
        self.renderer.resize(size);
        self.container.update(logical.width, logical.height);
        self.facade.on_resize();
    }

    fn handle_touch(&mut self, touch: &winit::event::Touch) {
        let x = self.logical_x(touch.location);
        let now = self.clock.now_ms();
        match touch.phase {
            TouchPhase::Started if self.active_touch.is_none() => {
                self.active_touch = Some(touch.id);
                self.facade.on_pointer_down(x, now);
            }
            TouchPhase::Moved if self.active_touch == Some(touch.id) => {
                self.facade.on_pointer_move(x, now);
            }
            TouchPhase::Ended | TouchPhase::Cancelled if self.active_touch == Some(touch.id) => {
                self.active_touch = None;
                self.facade.on_pointer_up(now);
            }
            _ => {}
        }
    }

    fn handle_keyboard(
        &mut self,
        event: &KeyEvent,
        target: &EventLoopWindowTarget<()>,
    ) -> Result<()> {
        if event.state != ElementState::Pressed || event.repeat {
            return Ok(());
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => target.exit(),
            Key::Character(key) if key.eq_ignore_ascii_case("b") => {
                let mut options = self.facade.options().clone();
                options.config.bend = next_bend(options.config.bend);
                info!("bend set to {}", options.config.bend);
                self.facade.set_options(options)?;
            }
            Key::Character(key) if key.eq_ignore_ascii_case("c") => {
                let mut options = self.facade.options().clone();
                options.config.card_size = options.config.card_size.next();
                info!("card size set to {}", options.config.card_size);
                self.facade.set_options(options)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Picks up a remount: textures of the previous mount are dropped and
    /// the plane mesh follows the new device profile.
    fn sync_generation(&mut self) {
        let generation = self.facade.generation();
        if generation == self.mounted_generation {
            return;
        }
        debug!("renderer switching to mount #{generation}");
        self.mounted_generation = generation;
        self.renderer.reset_textures();
        if let Some(scene) = self.facade.scene() {
            self.renderer.set_segments(scene.profile().segments);
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let now = self.clock.now_ms();
        let frame = self.facade.tick(now);
        self.sync_generation();
        self.renderer.apply_uploads(self.facade.take_uploads());
        if let Err(err) = self.renderer.render(frame.as_ref()) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    self.renderer.reconfigure();
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    warn!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }
}

/// Prints the laid-out planes of `options` for a `width`x`height` container
/// without opening a window.
pub fn print_summary(
    options: &GalleryOptions,
    (width, height): (u32, u32),
    user_agent: Option<&str>,
) {
    let profile = DeviceProfile::detect(width, user_agent);
    let config = &options.config;
    println!(
        "Gallery with {} items ({} planes), {} profile at {}x{}",
        options.items.len(),
        options.items.len() * 2,
        profile.class.name(),
        width,
        height
    );
    println!(
        "card size {}, bend {:.2}, border radius {:.2}, text color {}",
        config.card_size, config.bend, config.border_radius, config.text_color
    );
    if options.items.is_empty() {
        println!("Gallery has no items");
        return;
    }

    let mut scene = GalleryScene::initialize((width, height), &options.items, config, profile);
    scene.update();
    println!(
        "track width {:.2}, slot width {:.2}",
        scene.track_width(),
        scene.snap_unit().unwrap_or(0.0)
    );
    for media in scene.medias() {
        let position = media.position();
        println!(
            " - [{}] {} ({}) x={:.2} y={:.2} rot={:.3}",
            media.index(),
            media.text(),
            media.image(),
            position.x,
            position.y,
            media.rotation_z()
        );
    }
}
