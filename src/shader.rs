//! WGSL sources that can come from disk and be hot-reloaded, plus checked
//! compilation.
//!
//! wgpu reports shader and pipeline validation failures through the device's
//! error callback, which panics by default. [`validated`] wraps creation in an
//! error scope so a bad program surfaces as an [`Error`] with the compiler
//! log instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{Error, Result};

/// Where a [`ShaderSource`] came from.
#[derive(Debug)]
enum Origin {
    /// Compiled into the binary; never reloads.
    Embedded,
    /// Read from disk; reloads when the file's mtime moves forward.
    File {
        path: PathBuf,
        last_modified: SystemTime,
    },
}

/// A WGSL program source.
#[derive(Debug)]
pub struct ShaderSource {
    origin: Origin,
    source: String,
}

impl ShaderSource {
    /// Wrap a source compiled into the binary.
    pub fn embedded(source: &str) -> Self {
        Self {
            origin: Origin::Embedded,
            source: source.to_owned(),
        }
    }

    /// Load a shader from the given file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let read_err = |source| Error::ShaderRead {
            path: path.clone(),
            source,
        };

        let source = fs::read_to_string(&path).map_err(read_err)?;
        let last_modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(read_err)?;

        debug!(path = %path.display(), bytes = source.len(), "loaded shader");

        Ok(Self {
            origin: Origin::File {
                path,
                last_modified,
            },
            source,
        })
    }

    /// Use `path` when given, otherwise the embedded fallback.
    pub fn from_file_or(path: Option<&Path>, fallback: &str) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::embedded(fallback)),
        }
    }

    /// Check if the shader file has been modified and reload if so.
    /// Returns `true` if the source changed.
    pub fn check_reload(&mut self) -> bool {
        let Origin::File {
            path,
            last_modified,
        } = &mut self.origin
        else {
            return false;
        };

        let Ok(modified) = fs::metadata(&*path).and_then(|m| m.modified()) else {
            return false;
        };

        if modified > *last_modified {
            if let Ok(source) = fs::read_to_string(&*path) {
                self.source = source;
                *last_modified = modified;
                return true;
            }
        }

        false
    }

    /// Get the current shader source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Embedded => None,
            Origin::File { path, .. } => Some(path),
        }
    }
}

/// Run `create` inside a validation error scope and return the first error
/// message it raised.
pub(crate) fn validated<T>(
    device: &wgpu::Device,
    create: impl FnOnce() -> T,
) -> std::result::Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

/// Compile WGSL into a shader module, turning validation failures into
/// [`Error::ShaderCompile`].
pub fn compile(device: &wgpu::Device, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
    validated(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    })
    .map_err(|message| Error::ShaderCompile {
        label: label.to_owned(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "forest-fire-{}-{}.wgsl",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("forest-fire-definitely-missing.wgsl");
        let err = ShaderSource::from_file(&path).unwrap_err();
        match err {
            Error::ShaderRead { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn embedded_never_reloads() {
        let mut shader = ShaderSource::embedded("@fragment fn fs() {}");
        assert!(!shader.check_reload());
        assert!(shader.path().is_none());
        assert_eq!(shader.source(), "@fragment fn fs() {}");
    }

    #[test]
    fn fallback_used_without_path() {
        let shader = ShaderSource::from_file_or(None, "fallback").unwrap();
        assert_eq!(shader.source(), "fallback");
    }

    #[test]
    fn reloads_after_mtime_advances() {
        let path = scratch_file("reload", "first");
        let mut shader = ShaderSource::from_file(&path).unwrap();
        assert_eq!(shader.source(), "first");
        assert!(!shader.check_reload());

        fs::write(&path, "second").unwrap();
        let later = fs::metadata(&path).unwrap().modified().unwrap() + Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert!(shader.check_reload());
        assert_eq!(shader.source(), "second");
        assert!(!shader.check_reload());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn deleted_file_keeps_last_source() {
        let path = scratch_file("deleted", "kept");
        let mut shader = ShaderSource::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(!shader.check_reload());
        assert_eq!(shader.source(), "kept");
        assert_eq!(shader.path(), Some(path.as_path()));
    }
}
