//! Command-line options for the `forest-fire` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::app::AppConfig;

/// Forest-fire cellular automaton running in a GPU feedback loop.
///
/// Escape quits, Space pauses, R re-seeds the forest, and holding the left
/// mouse button sets fires.
#[derive(Debug, Parser)]
#[command(name = "forest-fire", version, about)]
pub struct Cli {
    /// Window title (the frame rate is appended once per second).
    #[arg(long, default_value = "Forest Fire")]
    pub title: String,

    /// Window width in logical pixels.
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 1000)]
    pub height: u32,

    /// Simulation grid as WIDTHxHEIGHT. Defaults to the framebuffer size.
    #[arg(long, value_parser = parse_grid, value_name = "WxH")]
    pub grid: Option<(u32, u32)>,

    /// WGSL file for the simulation step; reloaded when it changes.
    #[arg(long, value_name = "PATH")]
    pub simulation_shader: Option<PathBuf>,

    /// WGSL file for the screen pass; reloaded when it changes.
    #[arg(long, value_name = "PATH")]
    pub present_shader: Option<PathBuf>,

    /// Render as fast as possible instead of syncing to the display.
    #[arg(long)]
    pub no_vsync: bool,

    /// Let the window manager place the window.
    #[arg(long)]
    pub no_position: bool,

    /// More output per occurrence (-v debug, -vv trace). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn into_config(self) -> AppConfig {
        let defaults = AppConfig::default();
        AppConfig::new()
            .title(self.title)
            .size(self.width, self.height)
            .position(if self.no_position {
                None
            } else {
                defaults.position
            })
            .vsync(!self.no_vsync)
            .grid(self.grid)
            .simulation_shader(self.simulation_shader)
            .present_shader(self.present_shader)
    }

    /// Default log filter for the verbosity flag.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Parse `WIDTHxHEIGHT`, e.g. `512x256`.
pub fn parse_grid(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension '{part}': {e}"))
    };
    let size = (parse(w)?, parse(h)?);
    if size.0 == 0 || size.1 == 0 {
        return Err(format!("grid dimensions must be nonzero, got '{s}'"));
    }
    Ok(size)
}
