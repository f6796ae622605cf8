//! The pass-through pass that puts the latest feedback texture on screen.
//!
//! ```wgsl
//! struct Uniforms {
//!     resolution: vec2f,  // surface size in pixels
//!     grid: vec2f,        // feedback grid size in pixels
//! }
//! @group(0) @binding(0) var<uniform> u: Uniforms;
//! @group(0) @binding(1) var state: texture_2d<f32>;
//! @group(0) @binding(2) var state_sampler: sampler;
//! ```

use crate::error::Result;
use crate::feedback::FeedbackTargets;
use crate::gpu::GpuContext;
use crate::simulation_pass::{fullscreen_pipeline, state_bind_group_layout, state_bind_groups};

/// Values uploaded to the present shader at `@binding(0)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PresentUniforms {
    /// Surface size in pixels.
    pub resolution: [f32; 2],
    /// Feedback grid size in pixels.
    pub grid: [f32; 2],
}

/// Draws one feedback texture to the surface, stretched to fill it.
pub struct PresentPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_groups: [wgpu::BindGroup; 2],
}

impl PresentPass {
    const LABEL: &'static str = "present";

    pub fn new(gpu: &GpuContext, source: &str, targets: &FeedbackTargets) -> Result<Self> {
        let device = &gpu.device;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Present Uniforms"),
            size: std::mem::size_of::<PresentUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = state_bind_group_layout(device, "Present Bind Group Layout");
        let bind_groups = state_bind_groups(
            device,
            &bind_group_layout,
            &uniform_buffer,
            targets,
            "Present Bind Group",
        );

        let pipeline = fullscreen_pipeline(
            gpu,
            Self::LABEL,
            source,
            &bind_group_layout,
            gpu.config.format,
            Some(wgpu::BlendState::REPLACE),
        )?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            bind_groups,
        })
    }

    /// Replace the program. On error the previous pipeline stays in place.
    pub fn rebuild(&mut self, gpu: &GpuContext, source: &str) -> Result<()> {
        self.pipeline = fullscreen_pipeline(
            gpu,
            Self::LABEL,
            source,
            &self.bind_group_layout,
            gpu.config.format,
            Some(wgpu::BlendState::REPLACE),
        )?;
        Ok(())
    }

    /// Draw feedback texture `latest` into `view`.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        targets: &FeedbackTargets,
        latest: usize,
    ) {
        let uniforms = PresentUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            grid: targets.resolution(),
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_groups[latest], &[]);
        render_pass.draw(0..3, 0..1);
    }
}
