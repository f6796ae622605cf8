//! The feedback pass: runs the simulation shader over the previous state.
//!
//! # Shader interface
//!
//! ```wgsl
//! struct Uniforms {
//!     resolution: vec2f,  // feedback grid size in pixels
//!     time: f32,          // seconds since start
//!     frame_count: u32,   // frames simulated so far
//!     mouse: vec2f,       // cursor in grid pixels
//!     mouse_down: u32,    // 1 while the left button is held
//!     seed: u32,          // changes on every reset
//! }
//! @group(0) @binding(0) var<uniform> u: Uniforms;
//! @group(0) @binding(1) var state: texture_2d<f32>;
//! @group(0) @binding(2) var state_sampler: sampler;
//! ```
//!
//! The program must define `vs` and `fs` entry points. `vs` draws a single
//! fullscreen triangle from `@builtin(vertex_index)`.

use crate::error::{Error, Result};
use crate::feedback::{FEEDBACK_FORMAT, FeedbackTargets, read_index, write_index};
use crate::gpu::GpuContext;
use crate::shader;

/// Per-frame values uploaded to the simulation shader at `@binding(0)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimulationUniforms {
    /// Feedback grid size in pixels `[width, height]`.
    pub resolution: [f32; 2],
    /// Elapsed time in seconds since the simulation started.
    pub time: f32,
    /// Frame counter; also selects which texture is read.
    pub frame_count: u32,
    /// Cursor position in grid pixels.
    pub mouse: [f32; 2],
    /// Nonzero while the left mouse button is held.
    pub mouse_down: u32,
    /// Reset counter, mixed into the shader's random seed.
    pub seed: u32,
}

/// Bind group layout shared by both passes: uniforms, one unfilterable float
/// texture, one non-filtering sampler.
pub(crate) fn state_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            // Uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // State texture
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            // Sampler
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                count: None,
            },
        ],
    })
}

/// One bind group per feedback texture, indexed the same way as the pair.
pub(crate) fn state_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    targets: &FeedbackTargets,
    label: &str,
) -> [wgpu::BindGroup; 2] {
    [0, 1].map(|index| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.target(index).view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(targets.sampler()),
                },
            ],
        })
    })
}

/// Compile `source` and link it into a fullscreen-triangle pipeline writing
/// `format`.
pub(crate) fn fullscreen_pipeline(
    gpu: &GpuContext,
    label: &str,
    source: &str,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> Result<wgpu::RenderPipeline> {
    let device = &gpu.device;
    let module = shader::compile(device, label, source)?;

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    shader::validated(device, || {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    })
    .map_err(|message| Error::PipelineLink {
        label: label.to_owned(),
        message,
    })
}

/// The simulation step: reads one feedback texture, writes the other.
pub struct SimulationPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Indexed by the texture being read.
    bind_groups: [wgpu::BindGroup; 2],
}

impl SimulationPass {
    const LABEL: &'static str = "simulation";

    /// Build the pass around `targets` from WGSL source.
    pub fn new(gpu: &GpuContext, source: &str, targets: &FeedbackTargets) -> Result<Self> {
        let device = &gpu.device;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Simulation Uniforms"),
            size: std::mem::size_of::<SimulationUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = state_bind_group_layout(device, "Simulation Bind Group Layout");
        let bind_groups = state_bind_groups(
            device,
            &bind_group_layout,
            &uniform_buffer,
            targets,
            "Simulation Bind Group",
        );

        // Float targets are not blendable.
        let pipeline = fullscreen_pipeline(
            gpu,
            Self::LABEL,
            source,
            &bind_group_layout,
            FEEDBACK_FORMAT,
            None,
        )?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            bind_groups,
        })
    }

    /// Replace the program, keeping buffers and bind groups.
    ///
    /// On error the previous pipeline stays in place.
    pub fn rebuild(&mut self, gpu: &GpuContext, source: &str) -> Result<()> {
        self.pipeline = fullscreen_pipeline(
            gpu,
            Self::LABEL,
            source,
            &self.bind_group_layout,
            FEEDBACK_FORMAT,
            None,
        )?;
        Ok(())
    }

    /// Record one simulation step for `uniforms.frame_count`.
    ///
    /// The destination is cleared first so the shader sees nothing but the
    /// source texture.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FeedbackTargets,
        uniforms: &SimulationUniforms,
    ) {
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let frame = uniforms.frame_count;
        let destination = &targets.target(write_index(frame)).view;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Simulation Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_groups[read_index(frame)], &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_match_wgsl_layout() {
        // vec2f, f32, u32, vec2f, u32, u32: 32 bytes in WGSL.
        assert_eq!(std::mem::size_of::<SimulationUniforms>(), 32);
        assert_eq!(std::mem::offset_of!(SimulationUniforms, frame_count), 12);
        assert_eq!(std::mem::offset_of!(SimulationUniforms, mouse), 16);
        assert_eq!(std::mem::offset_of!(SimulationUniforms, mouse_down), 24);
        assert_eq!(std::mem::offset_of!(SimulationUniforms, seed), 28);
    }

    #[test]
    fn uniforms_serialize_in_field_order() {
        let uniforms = SimulationUniforms {
            resolution: [1920.0, 1000.0],
            frame_count: 7,
            ..Default::default()
        };
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(&bytes[0..4], &1920.0f32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &7u32.to_ne_bytes());
    }
}
