//! Ties the feedback pair, both passes and their sources together.

use tracing::{error, info};

use crate::error::Result;
use crate::feedback::{FeedbackTargets, advance};
use crate::gpu::GpuContext;
use crate::present_pass::PresentPass;
use crate::shader::ShaderSource;
use crate::simulation_pass::{SimulationPass, SimulationUniforms};

/// Host-side values the simulation sees on one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInputs {
    /// Seconds since start (or since the last reset).
    pub time: f32,
    /// Cursor in grid pixels.
    pub mouse: [f32; 2],
    /// Left button held.
    pub mouse_down: bool,
}

/// Everything the render loop owns on the GPU side.
pub struct Renderer {
    simulation_source: ShaderSource,
    present_source: ShaderSource,
    targets: FeedbackTargets,
    simulation: SimulationPass,
    present: PresentPass,
    /// Simulation steps taken so far; the next step runs with this value.
    frame_count: u32,
    /// Bumped on every reset so the shader seeds a different forest.
    seed: u32,
}

impl Renderer {
    /// Compile both programs and allocate a `grid` sized feedback pair.
    ///
    /// Fails if either program fails to compile or link.
    pub fn new(
        gpu: &GpuContext,
        simulation_source: ShaderSource,
        present_source: ShaderSource,
        grid: (u32, u32),
    ) -> Result<Self> {
        let (width, height) = grid;
        let targets = FeedbackTargets::new(gpu, width, height);
        info!(width, height, "allocated feedback textures");

        let simulation = SimulationPass::new(gpu, simulation_source.source(), &targets)?;
        let present = PresentPass::new(gpu, present_source.source(), &targets)?;

        Ok(Self {
            simulation_source,
            present_source,
            targets,
            simulation,
            present,
            frame_count: 0,
            seed: 0,
        })
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Feedback texture size in pixels.
    pub fn grid(&self) -> (u32, u32) {
        (self.targets.width(), self.targets.height())
    }

    /// Recompile any file-backed program whose file changed.
    ///
    /// A program that no longer compiles is reported and the previous
    /// pipeline keeps running.
    pub fn check_reload(&mut self, gpu: &GpuContext) {
        if self.simulation_source.check_reload() {
            info!(path = ?self.simulation_source.path(), "reloading simulation shader");
            match self.simulation.rebuild(gpu, self.simulation_source.source()) {
                Ok(()) => info!("simulation shader reloaded"),
                Err(e) => error!("{e}; keeping previous version"),
            }
        }

        if self.present_source.check_reload() {
            info!(path = ?self.present_source.path(), "reloading present shader");
            match self.present.rebuild(gpu, self.present_source.source()) {
                Ok(()) => info!("present shader reloaded"),
                Err(e) => error!("{e}; keeping previous version"),
            }
        }
    }

    /// Wipe both textures and restart the frame counter so the shader
    /// re-seeds on the next step.
    pub fn reset(&mut self, gpu: &GpuContext) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Feedback Reset Encoder"),
            });
        self.targets.clear(&mut encoder);
        gpu.queue.submit(std::iter::once(encoder.finish()));
        self.frame_count = 0;
        self.seed = self.seed.wrapping_add(1);
        info!(seed = self.seed, "simulation reset");
    }

    /// Render one frame: optionally step the simulation, then show the
    /// newest state.
    ///
    /// With `step` false the counter holds and the last written texture is
    /// presented again. Returns `false` when no frame was presented: the
    /// window is minimized or the surface could not hand out an image. Such
    /// a frame does not step either.
    pub fn render_frame(
        &mut self,
        gpu: &GpuContext,
        inputs: &FrameInputs,
        step: bool,
    ) -> Result<bool> {
        if gpu.is_minimized() {
            return Ok(false);
        }
        let Some(output) = gpu.acquire_frame()? else {
            return Ok(false);
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let plan = advance(self.frame_count, step);
        if plan.write.is_some() {
            let uniforms = SimulationUniforms {
                resolution: self.targets.resolution(),
                time: inputs.time,
                frame_count: self.frame_count,
                mouse: inputs.mouse,
                mouse_down: u32::from(inputs.mouse_down),
                seed: self.seed,
            };
            self.simulation
                .render(gpu, &mut encoder, &self.targets, &uniforms);
        }
        self.frame_count = plan.next;

        self.present
            .render(gpu, &mut encoder, &view, &self.targets, plan.present);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(true)
    }
}
