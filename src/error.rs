//! Error type shared by every fallible operation in the crate.

use std::path::PathBuf;

/// Everything that can stop the harness from starting or keep it from drawing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform event loop could not be created or failed while running.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The OS refused to open a window.
    #[error("failed to open window: {0}")]
    Window(#[from] winit::error::OsError),

    /// wgpu could not build a surface for the window.
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    /// No adapter is compatible with the surface.
    #[error("failed to find a suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to hand out a device.
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// The adapter cannot render to or sample from 32-bit float textures.
    #[error("adapter does not support {format:?} as a render target")]
    UnsupportedFormat { format: wgpu::TextureFormat },

    /// Acquiring the next swapchain image failed in a way a reconfigure does not fix.
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// A shader file could not be read.
    #[error("could not open shader file '{}': {source}", .path.display())]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shader failed WGSL parsing or validation.
    #[error("failed to compile {label} shader:\n{message}")]
    ShaderCompile { label: String, message: String },

    /// A render pipeline failed validation against its layout.
    #[error("failed to link {label} pipeline:\n{message}")]
    PipelineLink { label: String, message: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Shorthand used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_read_names_the_file() {
        let err = Error::ShaderRead {
            path: PathBuf::from("shaders/fire.wgsl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let text = err.to_string();
        assert!(text.contains("shaders/fire.wgsl"));
        assert!(text.contains("gone"));
    }

    #[test]
    fn compile_error_carries_the_log() {
        let err = Error::ShaderCompile {
            label: "simulation".into(),
            message: "error: expected ';'".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to compile simulation shader:\nerror: expected ';'"
        );
    }
}
