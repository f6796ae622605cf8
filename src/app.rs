use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::event::{MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::renderer::{FrameInputs, Renderer};
use crate::shader::ShaderSource;
use crate::timer::{FpsCounter, fps_title};

/// Built-in forest-fire automaton, used when no simulation shader path is given.
pub const DEFAULT_SIMULATION_SHADER: &str = include_str!("shaders/fire.wgsl");
/// Built-in pass-through, used when no present shader path is given.
pub const DEFAULT_PRESENT_SHADER: &str = include_str!("shaders/present.wgsl");

/// Largest window or feedback texture side accepted up front; the default
/// `max_texture_dimension_2d`. The device's own limit is checked once it exists.
const MAX_GRID_DIMENSION: u32 = 8192;

/// Check that a `width` x `height` feedback grid fits in textures of at most
/// `max` pixels per side.
pub fn check_grid(grid: (u32, u32), max: u32) -> Result<()> {
    let (w, h) = grid;
    if w == 0 || h == 0 || w > max || h > max {
        return Err(Error::Config(format!(
            "grid must be between 1x1 and {max}x{max}, got {w}x{h}"
        )));
    }
    Ok(())
}

/// Configuration for the window and the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the window, in logical pixels.
    pub position: Option<(i32, i32)>,
    pub vsync: bool,
    /// Feedback texture size. `None` uses the window's framebuffer size.
    pub grid: Option<(u32, u32)>,
    /// WGSL file for the simulation step. `None` uses the built-in automaton.
    pub simulation_shader: Option<PathBuf>,
    /// WGSL file for the pass-through. `None` uses the built-in one.
    pub present_shader: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Forest Fire".to_string(),
            width: 1920,
            height: 1000,
            position: Some((0, 28)),
            vsync: true,
            grid: None,
            simulation_shader: None,
            present_shader: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn position(mut self, position: Option<(i32, i32)>) -> Self {
        self.position = position;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn grid(mut self, grid: Option<(u32, u32)>) -> Self {
        self.grid = grid;
        self
    }

    pub fn simulation_shader(mut self, path: Option<PathBuf>) -> Self {
        self.simulation_shader = path;
        self
    }

    pub fn present_shader(mut self, path: Option<PathBuf>) -> Self {
        self.present_shader = path;
        self
    }

    /// Reject sizes wgpu would refuse later with a less useful message.
    ///
    /// Without an explicit grid the feedback textures take the window's size,
    /// so the window is held to the same bound.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.width, self.height);
        if w == 0 || h == 0 || w > MAX_GRID_DIMENSION || h > MAX_GRID_DIMENSION {
            return Err(Error::Config(format!(
                "window size must be between 1x1 and {MAX_GRID_DIMENSION}x{MAX_GRID_DIMENSION}, got {w}x{h}"
            )));
        }
        if let Some(grid) = self.grid {
            check_grid(grid, MAX_GRID_DIMENSION)?;
        }
        Ok(())
    }
}

/// Open the window and run until it is closed or Escape is pressed.
///
/// Returns the first fatal error: window or GPU setup, a shader that fails
/// to load or compile, or a surface that can no longer be drawn to.
pub fn run() -> Result<()> {
    run_with_config(AppConfig::default())
}

/// Run with a custom configuration.
///
/// # Example
/// ```no_run
/// forest_fire::run_with_config(
///     forest_fire::AppConfig::new().title("Wildfire").size(1280, 720),
/// )?;
/// # Ok::<(), forest_fire::Error>(())
/// ```
pub fn run_with_config(config: AppConfig) -> Result<()> {
    config.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = FireApp {
        config,
        state: AppState::Pending,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct FireApp {
    config: AppConfig,
    state: AppState,
    /// First fatal error, returned from `run_with_config` once the loop ends.
    error: Option<Error>,
}

enum AppState {
    Pending,
    Running(Box<Running>),
    Exited,
}

/// Live state. Fields drop in declaration order: GPU objects first, then the
/// device, then the window.
struct Running {
    renderer: Renderer,
    gpu: GpuContext,
    window: Arc<Window>,
    input: Input,
    fps: FpsCounter,
    start_time: Instant,
    paused: bool,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self> {
        let mut window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        if let Some((x, y)) = config.position {
            window_attrs = window_attrs.with_position(winit::dpi::LogicalPosition::new(x, y));
        }

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone(), config.vsync)?;

        let simulation_source = ShaderSource::from_file_or(
            config.simulation_shader.as_deref(),
            DEFAULT_SIMULATION_SHADER,
        )?;
        let present_source = ShaderSource::from_file_or(
            config.present_shader.as_deref(),
            DEFAULT_PRESENT_SHADER,
        )?;

        // HiDPI scaling can make the framebuffer bigger than the logical size.
        let grid = config.grid.unwrap_or((gpu.width(), gpu.height()));
        check_grid(grid, gpu.device.limits().max_texture_dimension_2d)?;
        let renderer = Renderer::new(&gpu, simulation_source, present_source, grid)?;

        let now = Instant::now();
        Ok(Self {
            renderer,
            gpu,
            window,
            input: Input::new(),
            fps: FpsCounter::new(now),
            start_time: now,
            paused: false,
        })
    }

    /// Handle per-frame key bindings. Returns `false` when the app should exit.
    fn apply_controls(&mut self) -> bool {
        if self.input.key_pressed(KeyCode::Escape) {
            return false;
        }
        if self.input.key_pressed(KeyCode::KeyR) {
            self.renderer.reset(&self.gpu);
            self.start_time = Instant::now();
        }
        if self.input.key_pressed(KeyCode::Space) {
            self.paused = !self.paused;
            info!(paused = self.paused, "toggled pause");
        }
        true
    }

    fn frame_inputs(&self) -> FrameInputs {
        let (grid_w, grid_h) = self.renderer.grid();
        let mouse = self.input.mouse_in_grid(
            Vec2::new(self.gpu.width() as f32, self.gpu.height() as f32),
            Vec2::new(grid_w as f32, grid_h as f32),
        );
        FrameInputs {
            time: self.start_time.elapsed().as_secs_f32(),
            mouse: mouse.to_array(),
            mouse_down: self.input.mouse_down(MouseButton::Left),
        }
    }

    fn redraw(&mut self, title: &str) -> Result<()> {
        self.renderer.check_reload(&self.gpu);

        let inputs = self.frame_inputs();
        if !self.renderer.render_frame(&self.gpu, &inputs, !self.paused)? {
            return Ok(());
        }

        if let Some(fps) = self.fps.tick(Instant::now()) {
            debug!(fps, frame = self.renderer.frame_count(), "frame rate");
            self.window.set_title(&fps_title(title, fps));
        }
        Ok(())
    }
}

impl FireApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: Error) {
        self.error.get_or_insert(e);
        event_loop.exit();
    }
}

impl ApplicationHandler for FireApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Pending) {
            return;
        }

        match Running::start(event_loop, &self.config) {
            Ok(running) => {
                info!(title = %self.config.title, "window opened");
                running.window.request_redraw();
                self.state = AppState::Running(Box::new(running));
            }
            Err(e) => {
                self.state = AppState::Exited;
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if !running.apply_controls() {
                    event_loop.exit();
                    return;
                }

                let result = running.redraw(&self.config.title);
                running.input.end_frame();
                match result {
                    Ok(()) => running.window.request_redraw(),
                    Err(e) => self.fail(event_loop, e),
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let AppState::Running(running) = &self.state {
            info!(frames = running.renderer.frame_count(), "releasing GPU resources");
        }
        self.state = AppState::Exited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_window() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Forest Fire");
        assert_eq!((config.width, config.height), (1920, 1000));
        assert_eq!(config.position, Some((0, 28)));
        assert!(config.vsync);
        assert!(config.grid.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_chains() {
        let config = AppConfig::new()
            .title("Wildfire")
            .size(640, 480)
            .position(None)
            .vsync(false)
            .grid(Some((256, 256)));
        assert_eq!(config.title, "Wildfire");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.position, None);
        assert!(!config.vsync);
        assert_eq!(config.grid, Some((256, 256)));
    }

    #[test]
    fn rejects_empty_window() {
        let err = AppConfig::new().size(0, 100).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_oversized_grid() {
        assert!(AppConfig::new().grid(Some((8192, 8192))).validate().is_ok());
        assert!(AppConfig::new().grid(Some((8193, 10))).validate().is_err());
        assert!(AppConfig::new().grid(Some((10, 0))).validate().is_err());
    }

    #[test]
    fn rejects_window_too_big_for_a_texture() {
        let err = AppConfig::new().size(9000, 9000).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(AppConfig::new().size(8192, 1000).validate().is_ok());
        // An explicit grid does not excuse an oversized window.
        assert!(
            AppConfig::new()
                .size(9000, 1000)
                .grid(Some((256, 256)))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn resolved_grid_is_held_to_the_device_limit() {
        assert!(check_grid((4096, 4096), 4096).is_ok());
        assert!(check_grid((4097, 100), 4096).is_err());
        assert!(check_grid((100, 4097), 4096).is_err());
        assert!(check_grid((0, 100), 4096).is_err());
    }

    #[test]
    fn built_in_shaders_define_entry_points() {
        for source in [DEFAULT_SIMULATION_SHADER, DEFAULT_PRESENT_SHADER] {
            assert!(source.contains("fn vs("));
            assert!(source.contains("fn fs("));
        }
    }

    #[test]
    fn built_in_automaton_reads_the_reset_seed() {
        // The last word of the 32-byte uniform block.
        assert!(DEFAULT_SIMULATION_SHADER.contains("    seed: u32,\n}"));
        assert!(DEFAULT_SIMULATION_SHADER.contains("u.seed"));
    }
}
