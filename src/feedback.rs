//! The pair of off-screen textures the simulation ping-pongs between.
//!
//! Each frame reads the texture written on the previous frame and writes the
//! other one. Which is which depends only on the frame counter's parity:
//!
//! ```text
//! frame 0: read A -> write B -> present B
//! frame 1: read B -> write A -> present A
//! frame 2: read A -> write B -> present B
//! ```

use crate::gpu::GpuContext;

/// Texel format of both feedback textures.
///
/// 32-bit float is not filterable, so everything sampling these textures
/// uses a non-filtering sampler.
pub const FEEDBACK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Index of the texture the simulation reads on `frame`.
pub fn read_index(frame: u32) -> usize {
    (frame & 1) as usize
}

/// Index of the texture the simulation writes (and the screen shows) on `frame`.
pub fn write_index(frame: u32) -> usize {
    1 - read_index(frame)
}

/// What one frame does with the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStep {
    /// Texture the simulation writes, or `None` when the frame does not step.
    pub write: Option<usize>,
    /// Frame counter after this frame.
    pub next: u32,
    /// Texture shown on screen: the newest state.
    pub present: usize,
}

/// Plan a frame at counter `frame`.
///
/// A step writes `write_index(frame)` and shows it. Without a step the
/// counter holds and the texture written by the last step stays on screen.
pub fn advance(frame: u32, step: bool) -> FrameStep {
    let (write, next) = if step {
        (Some(write_index(frame)), frame.wrapping_add(1))
    } else {
        (None, frame)
    };
    // What step N wrote is what step N + 1 will read.
    FrameStep {
        write,
        next,
        present: read_index(next),
    }
}

/// One half of the pair: a texture plus the view used both as a color
/// attachment and as a shader binding.
pub struct FeedbackTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl FeedbackTexture {
    fn new(gpu: &GpuContext, width: u32, height: u32, label: &str) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FEEDBACK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Two equally sized float textures and the sampler both passes read them with.
///
/// The size is fixed at creation. Window resizes only change how the present
/// pass stretches the result, so simulation state survives them.
pub struct FeedbackTargets {
    targets: [FeedbackTexture; 2],
    sampler: wgpu::Sampler,
}

impl FeedbackTargets {
    /// Allocate both textures at `width` x `height`.
    ///
    /// wgpu zero-initializes new textures, so frame 0 reads transparent black.
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let targets = [
            FeedbackTexture::new(gpu, width, height, "Feedback Texture A"),
            FeedbackTexture::new(gpu, width, height, "Feedback Texture B"),
        ];

        // Nearest + repeat: neighbour lookups across an edge wrap to the far side.
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Feedback Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self { targets, sampler }
    }

    /// Texture `index` (0 = A, 1 = B).
    pub fn target(&self, index: usize) -> &FeedbackTexture {
        &self.targets[index]
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn width(&self) -> u32 {
        self.targets[0].texture.width()
    }

    pub fn height(&self) -> u32 {
        self.targets[0].texture.height()
    }

    /// Size in pixels as floats, the way shaders receive it.
    pub fn resolution(&self) -> [f32; 2] {
        [self.width() as f32, self.height() as f32]
    }

    /// Clear both textures back to transparent black.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        for target in &self.targets {
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Feedback Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
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
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_frames_read_a_and_write_b() {
        assert_eq!(read_index(0), 0);
        assert_eq!(write_index(0), 1);
        assert_eq!(read_index(42), 0);
        assert_eq!(write_index(42), 1);
    }

    #[test]
    fn odd_frames_read_b_and_write_a() {
        assert_eq!(read_index(1), 1);
        assert_eq!(write_index(1), 0);
        assert_eq!(read_index(u32::MAX), 1);
        assert_eq!(write_index(u32::MAX), 0);
    }

    #[test]
    fn each_frame_reads_what_the_previous_one_wrote() {
        for frame in 1..16u32 {
            assert_eq!(read_index(frame), write_index(frame - 1));
        }
        // The counter wraps without breaking the alternation.
        assert_eq!(read_index(0), write_index(u32::MAX));
    }

    #[test]
    fn stepping_presents_what_was_just_written() {
        let first = advance(0, true);
        assert_eq!(
            first,
            FrameStep {
                write: Some(1),
                next: 1,
                present: 1,
            }
        );

        let second = advance(first.next, true);
        assert_eq!(second.write, Some(0));
        assert_eq!(second.next, 2);
        assert_eq!(second.present, 0);
    }

    #[test]
    fn pause_holds_counter_and_picture() {
        let mut frame = 0;
        let mut shown = Vec::new();
        let mut written = Vec::new();
        for step in [true, true, false, false, true] {
            let plan = advance(frame, step);
            if let Some(w) = plan.write {
                assert_eq!(plan.present, w);
                written.push(w);
            }
            shown.push(plan.present);
            frame = plan.next;
        }
        assert_eq!(written, vec![1, 0, 1]);
        // Paused frames keep showing texture 0, written by the second step.
        assert_eq!(shown, vec![1, 0, 0, 0, 1]);
        assert_eq!(frame, 3);

        // A reset restarts the counter; the next step reads A again.
        let after_reset = advance(0, true);
        assert_eq!(after_reset.write, Some(1));
        assert_eq!(after_reset.present, 1);

        // Paused straight after a reset shows the cleared texture the first step reads.
        assert_eq!(advance(0, false).present, read_index(0));
    }

    #[test]
    fn counter_wraps_while_stepping() {
        let plan = advance(u32::MAX, true);
        assert_eq!(plan.next, 0);
        assert_eq!(plan.write, Some(0));
        assert_eq!(plan.present, 0);
    }
}
