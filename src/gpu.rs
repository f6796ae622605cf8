//! Core GPU context and device management.
//!
//! [`GpuContext`] owns the wgpu objects every pass needs: the surface that
//! presents to the window, the device, the queue and the surface
//! configuration. It is created once after the window opens and dropped when
//! the event loop exits, which releases the swapchain before the window goes
//! away.

use std::sync::Arc;

use tracing::{info, warn};
use winit::window::Window;

use crate::error::{Error, Result};
use crate::feedback::FEEDBACK_FORMAT;

/// Core GPU context holding wgpu resources.
///
/// All fields are public so passes can reach the raw wgpu API.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    /// The window reported a zero size; nothing can be presented.
    minimized: bool,
}

/// Surface size for a window of `width` x `height`, or `None` while the
/// window has no area.
///
/// Each side is clamped to `max`, the device's 2D texture limit. The present
/// pass stretches whatever it draws, so an oversized window only loses
/// resolution.
pub fn surface_size(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    Some((width.min(max), height.min(max)))
}

/// Whether `error` only costs the current frame.
///
/// Lost and outdated surfaces are reconfigured on the next acquire; a timeout
/// clears up by itself. Out of memory and unknown errors are fatal.
pub fn skips_frame(error: &wgpu::SurfaceError) -> bool {
    matches!(
        error,
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Timeout
    )
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// Picks an sRGB surface format when one is offered. `vsync` selects
    /// `Fifo`; without it the surface asks for `AutoNoVsync`.
    ///
    /// Fails when the adapter cannot use [`FEEDBACK_FORMAT`] as a render
    /// attachment, since the feedback loop depends on it.
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let adapter_info = adapter.get_info();
        info!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "selected GPU adapter"
        );

        let feedback_usage = adapter.get_texture_format_features(FEEDBACK_FORMAT).allowed_usages;
        if !feedback_usage
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
        {
            return Err(Error::UnsupportedFormat {
                format: FEEDBACK_FORMAT,
            });
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Forest Fire Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let max = device.limits().max_texture_dimension_2d;
        let minimized = size.width == 0 || size.height == 0;
        let (width, height) =
            surface_size(size.width.max(1), size.height.max(1), max).unwrap_or((1, 1));
        if width != size.width.max(1) || height != size.height.max(1) {
            warn!(
                window_width = size.width,
                window_height = size.height,
                max,
                "window larger than the device allows, clamping surface"
            );
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        info!(
            format = ?surface_format,
            ?present_mode,
            width = config.width,
            height = config.height,
            "configured surface"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            minimized,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// A zero-sized window (minimized) leaves the surface alone and marks the
    /// context minimized until a real size arrives. Sizes past the device
    /// limit are clamped.
    pub fn resize(&mut self, width: u32, height: u32) {
        let max = self.device.limits().max_texture_dimension_2d;
        let Some((w, h)) = surface_size(width, height, max) else {
            self.minimized = true;
            return;
        };
        if (w, h) != (width, height) {
            warn!(width, height, max, "window larger than the device allows, clamping surface");
        }
        self.minimized = false;
        self.config.width = w;
        self.config.height = h;
        self.surface.configure(&self.device, &self.config);
    }

    /// True while the window has no area to present to.
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Fetch the next swapchain image.
    ///
    /// A lost or outdated surface is reconfigured and retried once. If the
    /// retry also fails with an error that [`skips_frame`], or the first
    /// attempt times out, this returns `Ok(None)` and the caller skips the
    /// frame. Anything else is fatal.
    pub fn acquire_frame(&self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                match self.surface.get_current_texture() {
                    Ok(frame) => Ok(Some(frame)),
                    Err(e) if skips_frame(&e) => {
                        warn!("surface still unavailable after reconfigure ({e}), skipping frame");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out waiting for surface texture, skipping frame");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_surface_errors_skip_the_frame() {
        assert!(skips_frame(&wgpu::SurfaceError::Lost));
        assert!(skips_frame(&wgpu::SurfaceError::Outdated));
        assert!(skips_frame(&wgpu::SurfaceError::Timeout));
    }

    #[test]
    fn out_of_memory_is_fatal() {
        assert!(!skips_frame(&wgpu::SurfaceError::OutOfMemory));
    }

    #[test]
    fn zero_sized_window_has_no_surface() {
        assert_eq!(surface_size(0, 1000, 8192), None);
        assert_eq!(surface_size(1920, 0, 8192), None);
    }

    #[test]
    fn surface_is_clamped_to_device_limit() {
        assert_eq!(surface_size(1920, 1000, 8192), Some((1920, 1000)));
        assert_eq!(surface_size(9000, 1000, 8192), Some((8192, 1000)));
        assert_eq!(surface_size(20000, 20000, 8192), Some((8192, 8192)));
    }
}
