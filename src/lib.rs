//! # Forest Fire
//!
//! A real-time harness for simulations that live entirely in fragment
//! shaders. Two floating-point textures take turns as source and destination:
//! each frame the simulation shader reads last frame's state and writes the
//! next, then a pass-through shader puts the result on screen.
//!
//! The built-in simulation is a forest-fire cellular automaton. Any WGSL
//! program with `vs`/`fs` entry points can replace it, as long as it takes
//! [`SimulationUniforms`] at binding 0, the previous state texture at
//! binding 1 and a non-filtering sampler at binding 2. File-backed programs
//! reload when they change on disk.
//!
//! ```no_run
//! use forest_fire::AppConfig;
//!
//! forest_fire::run_with_config(
//!     AppConfig::new()
//!         .size(1280, 720)
//!         .simulation_shader(Some("my_automaton.wgsl".into())),
//! )?;
//! # Ok::<(), forest_fire::Error>(())
//! ```
//!
//! Escape or closing the window quits. Space pauses, R clears both textures
//! and restarts the frame counter.

mod app;
pub mod cli;
mod error;
mod feedback;
mod gpu;
mod input;
mod present_pass;
mod renderer;
mod shader;
mod simulation_pass;
mod timer;

pub use app::{
    AppConfig, DEFAULT_PRESENT_SHADER, DEFAULT_SIMULATION_SHADER, check_grid, run, run_with_config,
};
pub use error::{Error, Result};
pub use feedback::{
    FEEDBACK_FORMAT, FeedbackTargets, FeedbackTexture, FrameStep, advance, read_index, write_index,
};
pub use gpu::{GpuContext, skips_frame, surface_size};
pub use input::Input;
pub use present_pass::{PresentPass, PresentUniforms};
pub use renderer::{FrameInputs, Renderer};
pub use shader::{ShaderSource, compile};
pub use simulation_pass::{SimulationPass, SimulationUniforms};
pub use timer::{FpsCounter, fps_title};
